//! Playback controller.
//!
//! [`PlaybackController`] owns the engine state and the countdown clock of a
//! single playback session. It is the only writer of [`EngineState`]; hosts
//! read it through [`PlaybackController::snapshot`] and drive it through
//! `start`, `pause_toggle`, `stop` and `skip`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |  \-> stop() -> Idle
//!           \-> Complete
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = PlaybackController::new(sequence);
//! let (notifier, done) = CompletionNotifier::channel();
//! controller.start(notifier)?;
//! // In a loop:
//! controller.next_tick().await; // Returns Some(Event) on phase changes
//! ```
//!
//! Dropping the controller drops its clock, so no tick can outlive it.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::alert::AlertNotifier;
use super::clock::{countdown, CountdownClock};
use super::scheduler::{advance, EngineState, Transition};
use super::snapshot::Snapshot;
use crate::error::EngineError;
use crate::events::Event;
use crate::sequence::SequenceDefinition;

/// Observer registered at `start()`, invoked once when the session completes.
#[derive(Default)]
pub struct CompletionNotifier(Option<Box<dyn FnOnce() + Send>>);

impl CompletionNotifier {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn callback(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// Notifier paired with a receiver that resolves on completion.
    pub fn channel() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let notifier = Self::callback(move || {
            let _ = tx.send(());
        });
        (notifier, rx)
    }

    fn fire(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl fmt::Debug for CompletionNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompletionNotifier")
            .field(&self.0.as_ref().map(|_| "FnOnce"))
            .finish()
    }
}

/// Core playback controller.
///
/// Single-session, single-threaded: every operation runs to completion
/// synchronously, and ticks only arrive through [`tick`](Self::tick) or
/// [`next_tick`](Self::next_tick).
#[derive(Debug)]
pub struct PlaybackController {
    sequence: SequenceDefinition,
    state: EngineState,
    clock: CountdownClock,
    alerts: AlertNotifier,
    notifier: CompletionNotifier,
    session_id: Option<Uuid>,
}

impl PlaybackController {
    /// Create an idle controller. Round and repetition counts below 1 are
    /// clamped here, before anything reaches the scheduler.
    pub fn new(sequence: SequenceDefinition) -> Self {
        let sequence = sequence.normalized();
        let state = EngineState::initial(&sequence);
        Self {
            sequence,
            state,
            clock: CountdownClock::default(),
            alerts: AlertNotifier::disabled(),
            notifier: CompletionNotifier::none(),
            session_id: None,
        }
    }

    pub fn with_alerts(mut self, alerts: AlertNotifier) -> Self {
        self.alerts = alerts;
        self
    }

    /// Pace ticks at `period` instead of one second. Each tick still counts
    /// as one second of workout time.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.clock = CountdownClock::new(period);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn sequence(&self) -> &SequenceDefinition {
        &self.sequence
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn is_clock_armed(&self) -> bool {
        self.clock.is_armed()
    }

    pub fn tick_period(&self) -> Duration {
        self.clock.period()
    }

    pub fn alerts_mut(&mut self) -> &mut AlertNotifier {
        &mut self.alerts
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::project(&self.state, &self.sequence)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session from the first repetition of the first timer.
    ///
    /// Starting while a session is active restarts it; the previous
    /// notifier is dropped without firing.
    pub fn start(&mut self, notifier: CompletionNotifier) -> Result<Event, EngineError> {
        if self.sequence.is_empty() {
            warn!("start rejected: sequence has no timers");
            return Err(EngineError::EmptySequence);
        }

        let session_id = Uuid::new_v4();
        self.state = EngineState {
            is_running: true,
            ..EngineState::initial(&self.sequence)
        };
        self.notifier = notifier;
        self.session_id = Some(session_id);
        self.alerts.reset();
        self.clock.acquire();
        // A phase shorter than the alert window starts inside it.
        self.alerts.evaluate(&self.state, &self.sequence);

        let total_secs = self.sequence.total_seconds();
        info!(
            %session_id,
            timers = self.sequence.timers.len(),
            rounds = self.sequence.rounds,
            total_secs,
            "playback started"
        );
        Ok(Event::SessionStarted {
            session_id,
            total_timers: self.sequence.timers.len(),
            total_rounds: self.sequence.rounds,
            total_secs,
            at: Utc::now(),
        })
    }

    /// Pause a running session, or resume a paused one.
    pub fn pause_toggle(&mut self) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        let session_id = self.session_id?;
        self.state.is_paused = !self.state.is_paused;
        let time_remaining = self.state.time_remaining;

        if self.state.is_paused {
            self.clock.release();
            debug!(%session_id, time_remaining, "paused");
            Some(Event::SessionPaused {
                session_id,
                time_remaining,
                at: Utc::now(),
            })
        } else {
            self.clock.acquire();
            debug!(%session_id, time_remaining, "resumed");
            Some(Event::SessionResumed {
                session_id,
                time_remaining,
                at: Utc::now(),
            })
        }
    }

    /// Cancel the clock and reset to the initial, idle state.
    ///
    /// Returns `None` when there was no session to stop; the reset happens
    /// either way.
    pub fn stop(&mut self) -> Option<Event> {
        self.clock.release();
        self.notifier = CompletionNotifier::none();
        self.alerts.reset();
        self.state = EngineState::initial(&self.sequence);

        let session_id = self.session_id.take()?;
        info!(%session_id, "playback stopped");
        Some(Event::SessionStopped {
            session_id,
            at: Utc::now(),
        })
    }

    /// End the active phase now and move to the next one.
    ///
    /// Skipping the final phase completes the session and returns
    /// `SessionCompleted`. The clock keeps its cadence.
    pub fn skip(&mut self) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        let session_id = self.session_id?;
        let from = self.state.position();

        let forced = EngineState {
            time_remaining: 0,
            ..self.state
        };
        let (next, transition) = advance(forced, &self.sequence);
        self.state = next;
        debug!(%session_id, ?transition, ?from, to = ?next.position(), "skipped");

        if transition == Some(Transition::Complete) {
            return Some(self.finish(session_id));
        }
        self.alerts.evaluate(&self.state, &self.sequence);
        Some(Event::PhaseSkipped {
            session_id,
            from,
            to: next.position(),
            at: Utc::now(),
        })
    }

    /// Apply one tick of workout time.
    ///
    /// No-op unless running and not paused. Returns an event when the tick
    /// crossed into a new phase.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.is_running || self.state.is_paused {
            return None;
        }
        let session_id = self.session_id?;

        let (next, transition) = countdown(self.state, &self.sequence);
        self.state = next;
        self.alerts.evaluate(&self.state, &self.sequence);

        match transition? {
            Transition::Complete => Some(self.finish(session_id)),
            transition => {
                debug!(
                    %session_id,
                    ?transition,
                    round = next.current_round,
                    timer = next.current_timer_index,
                    repetition = next.current_repetition,
                    "phase advanced"
                );
                Some(Event::PhaseAdvanced {
                    session_id,
                    transition,
                    position: next.position(),
                    time_remaining: next.time_remaining,
                    at: Utc::now(),
                })
            }
        }
    }

    /// Wait for the clock, then apply one tick.
    ///
    /// Pending forever while the clock is released (idle, paused or
    /// complete), which makes it safe to poll inside `tokio::select!`.
    pub async fn next_tick(&mut self) -> Option<Event> {
        self.clock.tick().await;
        self.tick()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn finish(&mut self, session_id: Uuid) -> Event {
        self.clock.release();
        self.notifier.fire();
        info!(%session_id, "playback complete");
        Event::SessionCompleted {
            session_id,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::TimerDefinition;
    use crate::timer::scheduler::Phase;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn single(duration: u32) -> SequenceDefinition {
        SequenceDefinition::new(vec![TimerDefinition::new("Hold", duration)])
    }

    fn counting_notifier() -> (CompletionNotifier, Arc<AtomicU32>) {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let notifier = CompletionNotifier::callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (notifier, fired)
    }

    #[test]
    fn start_initializes_state() {
        let mut c = PlaybackController::new(single(5));
        assert!(matches!(
            c.start(CompletionNotifier::none()),
            Ok(Event::SessionStarted { total_secs: 5, .. })
        ));
        let s = c.state();
        assert_eq!(s.phase, Phase::Timer);
        assert_eq!(
            (s.current_round, s.current_timer_index, s.current_repetition),
            (1, 0, 1)
        );
        assert_eq!(s.time_remaining, 5);
        assert!(s.is_running && !s.is_paused);
        assert!(c.is_clock_armed());
    }

    #[test]
    fn start_rejects_empty_sequence() {
        let mut c = PlaybackController::new(SequenceDefinition::new(vec![]));
        assert_eq!(
            c.start(CompletionNotifier::none()).unwrap_err(),
            EngineError::EmptySequence
        );
        assert!(!c.state().is_running);
        assert!(!c.is_clock_armed());
    }

    #[test]
    fn scenario_single_timer_counts_down_then_completes() {
        let mut c = PlaybackController::new(single(5));
        c.start(CompletionNotifier::none()).unwrap();
        let mut seen = vec![c.state().time_remaining];
        while !c.state().is_complete() {
            c.tick();
            seen.push(c.state().time_remaining);
        }
        assert_eq!(seen, vec![5, 4, 3, 2, 1, 0]);
        assert!(!c.state().is_running);
        assert!(!c.is_clock_armed());
    }

    #[test]
    fn scenario_repetitions_with_rest() {
        let seq = SequenceDefinition::new(vec![TimerDefinition::new("A", 3)
            .with_repetitions(2)
            .with_rest(2)]);
        let mut c = PlaybackController::new(seq);
        c.start(CompletionNotifier::none()).unwrap();

        let mut trace = vec![(c.state().phase, c.state().time_remaining)];
        while !c.state().is_complete() {
            c.tick();
            trace.push((c.state().phase, c.state().time_remaining));
        }
        assert_eq!(
            trace,
            vec![
                (Phase::Timer, 3),
                (Phase::Timer, 2),
                (Phase::Timer, 1),
                (Phase::Rest, 2),
                (Phase::Rest, 1),
                (Phase::Timer, 3),
                (Phase::Timer, 2),
                (Phase::Timer, 1),
                (Phase::Complete, 0),
            ]
        );
    }

    #[test]
    fn scenario_skip_mid_rest() {
        let seq = SequenceDefinition::new(vec![TimerDefinition::new("A", 20)
            .with_repetitions(3)
            .with_rest(30)]);
        let mut c = PlaybackController::new(seq);
        c.start(CompletionNotifier::none()).unwrap();
        c.skip();
        c.tick();
        assert_eq!(c.state().phase, Phase::Rest);
        assert_eq!(c.state().time_remaining, 29);

        assert!(matches!(c.skip(), Some(Event::PhaseSkipped { .. })));
        let s = c.state();
        assert_eq!(s.phase, Phase::Timer);
        assert_eq!(s.current_repetition, 2);
        assert_eq!(s.time_remaining, 20);
    }

    #[test]
    fn pause_freezes_remaining_time() {
        let mut c = PlaybackController::new(single(10));
        c.start(CompletionNotifier::none()).unwrap();
        c.tick();
        assert!(matches!(c.pause_toggle(), Some(Event::SessionPaused { .. })));
        assert!(!c.is_clock_armed());
        for _ in 0..50 {
            assert!(c.tick().is_none());
        }
        assert_eq!(c.state().time_remaining, 9);

        assert!(matches!(c.pause_toggle(), Some(Event::SessionResumed { .. })));
        assert!(c.is_clock_armed());
        c.tick();
        assert_eq!(c.state().time_remaining, 8);
    }

    #[test]
    fn pause_and_skip_are_noops_when_idle() {
        let mut c = PlaybackController::new(single(10));
        assert!(c.pause_toggle().is_none());
        assert!(c.skip().is_none());
        assert!(c.tick().is_none());
        assert_eq!(c.state(), EngineState::initial(c.sequence()));
    }

    #[test]
    fn stop_resets_to_initial_state() {
        let seq = SequenceDefinition::new(vec![
            TimerDefinition::new("A", 10),
            TimerDefinition::new("B", 20),
        ]);
        let mut c = PlaybackController::new(seq);
        c.start(CompletionNotifier::none()).unwrap();
        c.skip();
        c.pause_toggle();
        assert!(matches!(c.stop(), Some(Event::SessionStopped { .. })));

        let s = c.state();
        assert_eq!(s, EngineState::initial(c.sequence()));
        assert_eq!(s.time_remaining, 10);
        assert!(!s.is_running && !s.is_paused);
        assert!(!c.is_clock_armed());
        assert!(c.session_id().is_none());
        assert!(c.stop().is_none());
    }

    #[test]
    fn completion_fires_exactly_once() {
        let mut c = PlaybackController::new(single(2));
        let (notifier, fired) = counting_notifier();
        c.start(notifier).unwrap();
        for _ in 0..10 {
            c.tick();
            c.skip();
        }
        assert!(c.state().is_complete());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stopped_session_never_fires_notifier() {
        let mut c = PlaybackController::new(single(2));
        let (notifier, fired) = counting_notifier();
        c.start(notifier).unwrap();
        c.stop();
        c.start(CompletionNotifier::none()).unwrap();
        c.skip();
        assert!(c.state().is_complete());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn skipping_last_phase_completes() {
        let mut c = PlaybackController::new(single(30));
        let (notifier, fired) = counting_notifier();
        c.start(notifier).unwrap();
        assert!(matches!(c.skip(), Some(Event::SessionCompleted { .. })));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(c.skip().is_none());
    }

    #[test]
    fn degenerate_counts_are_clamped() {
        let mut seq = SequenceDefinition::new(vec![TimerDefinition::new("A", 3).with_repetitions(0)]);
        seq.rounds = 0;
        let c = PlaybackController::new(seq);
        assert_eq!(c.sequence().rounds, 1);
        assert_eq!(c.sequence().timers[0].repetitions, 1);
    }

    #[test]
    fn restart_begins_a_new_session() {
        let mut c = PlaybackController::new(single(10));
        c.start(CompletionNotifier::none()).unwrap();
        let first = c.session_id();
        c.tick();
        c.start(CompletionNotifier::none()).unwrap();
        assert_ne!(c.session_id(), first);
        assert_eq!(c.state().time_remaining, 10);
    }

    fn counting_alerts() -> (AlertNotifier, Arc<AtomicU32>) {
        let tones = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&tones);
        let alerts = AlertNotifier::new(move |_: &crate::timer::Tone| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (alerts, tones)
    }

    #[test]
    fn short_timer_alerts_from_its_first_second() {
        let (alerts, tones) = counting_alerts();
        let mut c = PlaybackController::new(single(3)).with_alerts(alerts);
        c.start(CompletionNotifier::none()).unwrap();
        assert_eq!(tones.load(Ordering::SeqCst), 1);
        while !c.state().is_complete() {
            c.tick();
        }
        assert_eq!(tones.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn skip_into_short_rest_alerts_immediately() {
        let seq = SequenceDefinition::new(vec![TimerDefinition::new("A", 10)
            .with_repetitions(2)
            .with_rest(2)]);
        let (alerts, tones) = counting_alerts();
        let mut c = PlaybackController::new(seq).with_alerts(alerts);
        c.start(CompletionNotifier::none()).unwrap();
        assert_eq!(tones.load(Ordering::SeqCst), 0);

        c.skip();
        assert_eq!(c.state().phase, Phase::Rest);
        assert_eq!(tones.load(Ordering::SeqCst), 1);
        c.tick();
        assert_eq!(tones.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn channel_notifier_resolves_after_clock_ticks() {
        let mut c = PlaybackController::new(single(3));
        let (notifier, done) = CompletionNotifier::channel();
        c.start(notifier).unwrap();
        let started = tokio::time::Instant::now();
        while !c.state().is_complete() {
            c.next_tick().await;
        }
        assert!(done.await.is_ok());
        assert!(started.elapsed() >= Duration::from_secs(3));
    }
}
