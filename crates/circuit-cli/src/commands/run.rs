use std::path::PathBuf;
use std::time::Duration;

use circuit_core::{
    run_session, AlertNotifier, Command, CompletionNotifier, Config, PlaybackController,
    SequenceDefinition, SessionEnd, Snapshot,
};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

#[derive(Args)]
pub struct RunArgs {
    /// Sequence file (.toml or .json)
    pub file: PathBuf,
    /// Print snapshots as JSON lines
    #[arg(long)]
    pub json: bool,
    /// Disable countdown alerts
    #[arg(long)]
    pub no_alerts: bool,
    /// Wall-clock milliseconds per tick (overrides clock.tick_ms)
    #[arg(long)]
    pub tick_ms: Option<u64>,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let sequence = SequenceDefinition::load(&args.file)?;
    let json = args.json || config.display.json;
    let period = args
        .tick_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.tick_period());

    let mut alerts = AlertNotifier::new(crate::sink::alert_sink()).with_tone(config.tone());
    alerts.set_enabled(config.alerts.enabled && !args.no_alerts);

    let mut controller = PlaybackController::new(sequence)
        .with_alerts(alerts)
        .with_tick_period(period);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(play(&mut controller, json));
    // The stdin reader blocks on a thread that cannot be cancelled.
    runtime.shutdown_background();

    match result? {
        SessionEnd::Completed => eprintln!("workout complete"),
        SessionEnd::Stopped | SessionEnd::Disconnected => eprintln!("workout stopped"),
    }
    Ok(())
}

async fn play(
    controller: &mut PlaybackController,
    json: bool,
) -> Result<SessionEnd, Box<dyn std::error::Error>> {
    let (notifier, done) = CompletionNotifier::channel();
    controller.start(notifier)?;

    let (snap_tx, snap_rx) = watch::channel(controller.snapshot());
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    tokio::spawn(read_commands(cmd_tx));
    let printer = tokio::spawn(print_snapshots(snap_rx, json));

    let end = run_session(controller, cmd_rx, &snap_tx, |event| {
        debug!(?event, "session event");
    })
    .await;

    drop(snap_tx);
    printer.await??;
    if done.await.is_ok() {
        debug!("completion notifier fired");
    }
    Ok(end)
}

async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = match line.trim() {
            "p" | "pause" => Command::PauseToggle,
            "s" | "skip" => Command::Skip,
            "x" | "stop" | "q" | "quit" => Command::Stop,
            other => {
                warn!(input = other, "unknown command (p = pause, s = skip, x = stop)");
                continue;
            }
        };
        if tx.send(command).await.is_err() {
            return;
        }
    }
    // Stdin is gone; keep the channel open so playback runs to the end.
    tx.closed().await;
}

/// Prints the latest snapshot whenever it changes. A `watch` channel keeps
/// only the newest value, so snapshots published back to back may print as one line.
async fn print_snapshots(
    mut rx: watch::Receiver<Snapshot>,
    json: bool,
) -> Result<(), serde_json::Error> {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if json {
            println!("{}", serde_json::to_string(&snapshot)?);
        } else {
            println!("{}", render_line(&snapshot));
        }
    }
    Ok(())
}

fn render_line(s: &Snapshot) -> String {
    let state = if s.is_paused { " (paused)" } else { "" };
    format!(
        "round {}/{} | timer {}/{} rep {}/{} | {:<12} {}{} | {:>3.0}%",
        s.current_round,
        s.total_rounds,
        s.current_timer_index + 1,
        s.total_timers,
        s.current_repetition,
        s.total_repetitions,
        s.label,
        s.clock,
        state,
        s.overall_progress * 100.0,
    )
}
