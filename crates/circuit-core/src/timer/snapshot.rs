//! Read-only display projection of engine state.

use serde::{Deserialize, Serialize};

use super::scheduler::{phase_duration, EngineState, Phase};
use crate::sequence::SequenceDefinition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub current_round: u32,
    pub total_rounds: u32,
    pub current_timer_index: usize,
    pub total_timers: usize,
    pub current_repetition: u32,
    pub total_repetitions: u32,
    pub time_remaining: u32,
    /// Configured length of the active phase.
    pub phase_duration: u32,
    pub is_running: bool,
    pub is_paused: bool,
    /// 0.0 .. 1.0 at timer granularity across the whole sequence.
    pub overall_progress: f64,
    /// 0.0 .. 1.0 within the active phase.
    pub phase_progress: f64,
    pub timer_name: String,
    pub timer_color: String,
    pub label: String,
    /// `MM:SS` rendering of `time_remaining`.
    pub clock: String,
}

impl Snapshot {
    pub fn project(state: &EngineState, sequence: &SequenceDefinition) -> Self {
        let timer = sequence.timer(state.current_timer_index);
        let total_timers = sequence.timers.len();
        let total_rounds = sequence.rounds.max(1);
        let duration = phase_duration(state, sequence);

        let label = match state.phase {
            Phase::Timer => timer.map(|t| t.name.clone()).unwrap_or_default(),
            Phase::Rest => "Rest".to_string(),
            Phase::GlobalRest => "Round rest".to_string(),
            Phase::Complete => "Complete".to_string(),
        };

        Self {
            phase: state.phase,
            current_round: state.current_round,
            total_rounds,
            current_timer_index: state.current_timer_index,
            total_timers,
            current_repetition: state.current_repetition,
            total_repetitions: timer.map(|t| t.repetitions.max(1)).unwrap_or(0),
            time_remaining: state.time_remaining,
            phase_duration: duration,
            is_running: state.is_running,
            is_paused: state.is_paused,
            overall_progress: overall_progress(state, total_timers, total_rounds),
            phase_progress: phase_progress(state, duration),
            timer_name: timer.map(|t| t.name.clone()).unwrap_or_default(),
            timer_color: timer.map(|t| t.color.clone()).unwrap_or_default(),
            label,
            clock: format_clock(state.time_remaining),
        }
    }
}

fn overall_progress(state: &EngineState, total_timers: usize, total_rounds: u32) -> f64 {
    if state.phase == Phase::Complete {
        return 1.0;
    }
    let total = total_timers as f64 * f64::from(total_rounds);
    if total == 0.0 {
        return 0.0;
    }
    let done = f64::from(state.current_round.saturating_sub(1)) * total_timers as f64
        + state.current_timer_index as f64;
    (done / total).clamp(0.0, 1.0)
}

fn phase_progress(state: &EngineState, duration: u32) -> f64 {
    if state.phase == Phase::Complete || duration == 0 {
        return 0.0;
    }
    let elapsed = duration.saturating_sub(state.time_remaining);
    f64::from(elapsed) / f64::from(duration)
}

/// Format seconds as `MM:SS`. Hours fold into the minutes.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
