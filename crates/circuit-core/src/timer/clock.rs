//! Countdown clock.
//!
//! Two halves: [`countdown`] is the logical tick (one second of workout time,
//! independent of wall-clock skew), and [`CountdownClock`] is the periodic
//! tick source that paces it. The controller owns exactly one clock and arms
//! it only while a session is running and not paused.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::scheduler::{advance, EngineState, Transition};
use crate::sequence::SequenceDefinition;

/// Default cadence: one tick per second.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Apply one logical tick.
///
/// Decrements while more than one second is left; on the last second (or an
/// already exhausted phase) hands over to the scheduler instead, so remaining
/// time never goes below zero and each exhaustion advances exactly once.
pub fn countdown(
    state: EngineState,
    sequence: &SequenceDefinition,
) -> (EngineState, Option<Transition>) {
    if !state.is_running || state.is_paused {
        return (state, None);
    }
    if state.time_remaining > 1 {
        let mut next = state;
        next.time_remaining -= 1;
        return (next, None);
    }
    advance(state, sequence)
}

#[derive(Debug)]
enum Slot {
    Released,
    /// Acquired, interval not created until first polled.
    Armed,
    Ticking(Interval),
}

/// Cancellable periodic tick source.
///
/// Holds at most one live [`Interval`]. Releasing drops it immediately, and
/// re-arming always waits a full period before the first tick, so time spent
/// released is never caught up.
#[derive(Debug)]
pub struct CountdownClock {
    period: Duration,
    slot: Slot,
}

impl CountdownClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            slot: Slot::Released,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn acquire(&mut self) {
        self.slot = Slot::Armed;
    }

    pub fn release(&mut self) {
        self.slot = Slot::Released;
    }

    pub fn is_armed(&self) -> bool {
        !matches!(self.slot, Slot::Released)
    }

    /// Wait for the next tick. Pending forever while released.
    ///
    /// Cancel-safe: dropping the future loses no tick.
    pub async fn tick(&mut self) {
        if matches!(self.slot, Slot::Armed) {
            let mut interval = interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.slot = Slot::Ticking(interval);
        }
        match &mut self.slot {
            Slot::Ticking(interval) => {
                interval.tick().await;
            }
            _ => std::future::pending::<()>().await,
        }
    }
}

impl Default for CountdownClock {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}
