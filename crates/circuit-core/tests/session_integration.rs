//! Integration tests for the async session runner under virtual time.

use std::time::Duration;

use circuit_core::{
    run_session, Command, CompletionNotifier, Event, Phase, PlaybackController, SequenceDefinition,
    SessionEnd, TimerDefinition,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant};

fn controller(seq: SequenceDefinition) -> PlaybackController {
    let mut c = PlaybackController::new(seq);
    c.start(CompletionNotifier::none()).unwrap();
    c
}

/// Send `script` at the given offsets, then keep the channel open.
fn spawn_script(script: Vec<(Duration, Command)>) -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        for (delay, command) in script {
            sleep(delay).await;
            if tx.send(command).await.is_err() {
                return;
            }
        }
        tx.closed().await;
    });
    rx
}

#[tokio::test(start_paused = true)]
async fn plays_for_total_duration() {
    let seq = SequenceDefinition::new(vec![
        TimerDefinition::new("Squats", 3).with_repetitions(2).with_rest(2),
        TimerDefinition::new("Plank", 4),
    ])
    .with_rounds(2)
    .with_global_rest(3);
    let total = seq.total_seconds();
    let mut c = controller(seq);
    let (snap_tx, _snap_rx) = watch::channel(c.snapshot());
    let rx = spawn_script(Vec::new());

    let started = Instant::now();
    let end = run_session(&mut c, rx, &snap_tx, |_| {}).await;

    assert_eq!(end, SessionEnd::Completed);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(total));
    assert!(elapsed < Duration::from_secs(total + 1));
}

#[tokio::test(start_paused = true)]
async fn pause_suspends_the_clock_without_catch_up() {
    let seq = SequenceDefinition::new(vec![TimerDefinition::new("Hold", 5)]);
    let mut c = controller(seq);
    let (snap_tx, snap_rx) = watch::channel(c.snapshot());
    let rx = spawn_script(vec![
        (Duration::from_millis(2_500), Command::PauseToggle),
        (Duration::from_secs(10), Command::PauseToggle),
    ]);

    let started = Instant::now();
    let end = run_session(&mut c, rx, &snap_tx, |_| {}).await;

    assert_eq!(end, SessionEnd::Completed);
    // 2 ticks, 10 s paused, then a full period before each of the last 3.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(15_500));
    assert!(elapsed < Duration::from_millis(16_500));
    assert_eq!(snap_rx.borrow().phase, Phase::Complete);
}

#[tokio::test(start_paused = true)]
async fn skip_commands_fast_forward() {
    let seq = SequenceDefinition::new(vec![
        TimerDefinition::new("Long", 600),
        TimerDefinition::new("Short", 2),
    ]);
    let mut c = controller(seq);
    let (snap_tx, _snap_rx) = watch::channel(c.snapshot());
    let rx = spawn_script(vec![(Duration::from_millis(500), Command::Skip)]);
    let mut events = Vec::new();

    let started = Instant::now();
    let end = run_session(&mut c, rx, &snap_tx, |e| events.push(e.clone())).await;

    assert_eq!(end, SessionEnd::Completed);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(events.first(), Some(Event::PhaseSkipped { .. })));
    assert!(matches!(events.last(), Some(Event::SessionCompleted { .. })));
}

#[tokio::test(start_paused = true)]
async fn snapshots_track_every_tick() {
    let seq = SequenceDefinition::new(vec![TimerDefinition::new("Hold", 3)]);
    let mut c = controller(seq);
    let (snap_tx, mut snap_rx) = watch::channel(c.snapshot());
    let rx = spawn_script(Vec::new());

    let reader = tokio::spawn(async move {
        let mut seen = Vec::new();
        while snap_rx.changed().await.is_ok() {
            seen.push(snap_rx.borrow_and_update().time_remaining);
        }
        seen
    });

    run_session(&mut c, rx, &snap_tx, |_| {}).await;
    drop(snap_tx);
    let seen = reader.await.unwrap();

    assert_eq!(seen.last(), Some(&0));
    assert!(seen.contains(&2));
    assert!(seen.contains(&1));
}
