//! Async session runner.
//!
//! Drives one started [`PlaybackController`] on the current task: waits on
//! the controller's clock and a command channel at the same time, applies
//! whichever comes first, and publishes a fresh [`Snapshot`] after every tick
//! and every command. Everything runs on one task, so the controller is never
//! touched concurrently.

use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::engine::PlaybackController;
use super::snapshot::Snapshot;
use crate::events::Event;

/// Control operations a host can send to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PauseToggle,
    Skip,
    Stop,
}

/// Why [`run_session`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Completed,
    Stopped,
    /// Every command sender was dropped; the session was stopped.
    Disconnected,
}

/// Run until the session completes, is stopped, or loses its command channel.
///
/// `on_event` sees every event the controller emits, in order.
pub async fn run_session(
    controller: &mut PlaybackController,
    mut commands: mpsc::Receiver<Command>,
    snapshots: &watch::Sender<Snapshot>,
    mut on_event: impl FnMut(&Event),
) -> SessionEnd {
    snapshots.send_replace(controller.snapshot());

    loop {
        tokio::select! {
            event = controller.next_tick() => {
                if let Some(event) = &event {
                    on_event(event);
                }
                snapshots.send_replace(controller.snapshot());
                if controller.state().is_complete() {
                    return SessionEnd::Completed;
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("command channel closed, stopping session");
                    if let Some(event) = controller.stop() {
                        on_event(&event);
                    }
                    snapshots.send_replace(controller.snapshot());
                    return SessionEnd::Disconnected;
                };
                let event = match command {
                    Command::PauseToggle => controller.pause_toggle(),
                    Command::Skip => controller.skip(),
                    Command::Stop => controller.stop(),
                };
                if let Some(event) = &event {
                    on_event(event);
                }
                snapshots.send_replace(controller.snapshot());
                if command == Command::Stop {
                    return SessionEnd::Stopped;
                }
                if controller.state().is_complete() {
                    return SessionEnd::Completed;
                }
            }
        }
    }
}
