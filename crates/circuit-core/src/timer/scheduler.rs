//! Phase scheduler.
//!
//! [`advance`] is the single transition function of the engine. It is called
//! when the active phase runs out of time, either naturally from a clock tick
//! or forced by a skip, and walks the nested iteration
//! repetition → timer → round.
//!
//! ```text
//! Timer ──(reps left, rest>0)──▶ Rest ──▶ Timer
//! Timer ──(reps left)──────────▶ Timer
//! Timer ──(last timer, rounds left, round rest>0)──▶ GlobalRest ──▶ Timer
//! Timer ──(last timer, last round)──▶ Complete
//! ```

use serde::{Deserialize, Serialize};

use crate::sequence::SequenceDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Timer,
    /// Rest between repetitions of the same timer.
    Rest,
    /// Rest between rounds.
    GlobalRest,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Timer => "timer",
            Phase::Rest => "rest",
            Phase::GlobalRest => "global-rest",
            Phase::Complete => "complete",
        }
    }
}

/// What kind of step [`advance`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Same timer, next repetition.
    NextRepetition,
    /// Into the rest between two repetitions.
    Rest,
    /// Next timer in the round.
    NextTimer,
    /// Into the rest between two rounds.
    RoundRest,
    /// First timer of the next round.
    NextRound,
    Complete,
}

/// Where playback is within the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub phase: Phase,
    pub round: u32,
    pub timer_index: usize,
    pub repetition: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub phase: Phase,
    pub current_round: u32,
    pub current_timer_index: usize,
    pub current_repetition: u32,
    /// Seconds left in the active phase.
    pub time_remaining: u32,
    pub is_running: bool,
    pub is_paused: bool,
}

impl EngineState {
    /// First repetition of the first timer in round 1, not yet running.
    pub fn initial(sequence: &SequenceDefinition) -> Self {
        Self {
            phase: Phase::Timer,
            current_round: 1,
            current_timer_index: 0,
            current_repetition: 1,
            time_remaining: sequence.timer(0).map(|t| t.duration).unwrap_or(0),
            is_running: false,
            is_paused: false,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            phase: self.phase,
            round: self.current_round,
            timer_index: self.current_timer_index,
            repetition: self.current_repetition,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }
}

/// Configured length in seconds of the phase `state` is in. 0 once complete.
pub fn phase_duration(state: &EngineState, sequence: &SequenceDefinition) -> u32 {
    let timer = sequence.timer(state.current_timer_index);
    match state.phase {
        Phase::Timer => timer.map(|t| t.duration).unwrap_or(0),
        Phase::Rest => timer.map(|t| t.rest_secs()).unwrap_or(0),
        Phase::GlobalRest => sequence.global_rest_secs(),
        Phase::Complete => 0,
    }
}

/// Step past the active phase.
///
/// Returns the next state and the transition taken. A complete state is
/// terminal and comes back unchanged with no transition.
pub fn advance(
    state: EngineState,
    sequence: &SequenceDefinition,
) -> (EngineState, Option<Transition>) {
    let mut next = state;
    let Some(timer) = sequence.timer(state.current_timer_index) else {
        if state.is_complete() {
            return (state, None);
        }
        // Out-of-range position: nothing left to play.
        return (complete(next), Some(Transition::Complete));
    };

    let transition = match state.phase {
        Phase::Complete => return (state, None),
        Phase::Timer if state.current_repetition < timer.repetitions => {
            if timer.rest_secs() > 0 {
                next.phase = Phase::Rest;
                next.time_remaining = timer.rest_secs();
                Transition::Rest
            } else {
                next.current_repetition += 1;
                next.time_remaining = timer.duration;
                Transition::NextRepetition
            }
        }
        Phase::Rest => {
            next.phase = Phase::Timer;
            next.current_repetition += 1;
            next.time_remaining = timer.duration;
            Transition::NextRepetition
        }
        Phase::Timer => return move_to_next_timer(next, sequence),
        Phase::GlobalRest => {
            start_next_round(&mut next, sequence);
            Transition::NextRound
        }
    };
    (next, Some(transition))
}

fn move_to_next_timer(
    mut state: EngineState,
    sequence: &SequenceDefinition,
) -> (EngineState, Option<Transition>) {
    let next_index = state.current_timer_index + 1;
    if let Some(timer) = sequence.timer(next_index) {
        state.phase = Phase::Timer;
        state.current_timer_index = next_index;
        state.current_repetition = 1;
        state.time_remaining = timer.duration;
        return (state, Some(Transition::NextTimer));
    }

    if state.current_round < sequence.rounds {
        if sequence.global_rest_secs() > 0 {
            state.phase = Phase::GlobalRest;
            state.time_remaining = sequence.global_rest_secs();
            (state, Some(Transition::RoundRest))
        } else {
            start_next_round(&mut state, sequence);
            (state, Some(Transition::NextRound))
        }
    } else {
        (complete(state), Some(Transition::Complete))
    }
}

fn start_next_round(state: &mut EngineState, sequence: &SequenceDefinition) {
    state.phase = Phase::Timer;
    state.current_round += 1;
    state.current_timer_index = 0;
    state.current_repetition = 1;
    state.time_remaining = sequence.timer(0).map(|t| t.duration).unwrap_or(0);
}

fn complete(mut state: EngineState) -> EngineState {
    state.phase = Phase::Complete;
    state.is_running = false;
    state.is_paused = false;
    state.time_remaining = 0;
    state
}
