//! Workout sequence definitions.
//!
//! A [`SequenceDefinition`] is the immutable input to playback: an ordered
//! list of [`TimerDefinition`]s repeated for a number of rounds, with an
//! optional rest between rounds. Sequences arrive from the surrounding
//! application (REST payloads, files) so field names accept both snake_case
//! and the camelCase spelling used on the wire.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SequenceError;
use crate::timer::Phase;

fn default_one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerDefinition {
    pub name: String,
    /// Display tag, passed through to snapshots untouched.
    #[serde(default)]
    pub color: String,
    /// Duration in seconds.
    pub duration: u32,
    #[serde(default = "default_one")]
    pub repetitions: u32,
    /// Seconds of rest between repetitions of this timer.
    #[serde(
        default,
        alias = "restBetween",
        skip_serializing_if = "Option::is_none"
    )]
    pub rest_between: Option<u32>,
    #[serde(default, alias = "isSilent")]
    pub is_silent: bool,
}

impl TimerDefinition {
    pub fn new(name: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            color: String::new(),
            duration,
            repetitions: 1,
            rest_between: None,
            is_silent: false,
        }
    }

    pub fn with_repetitions(mut self, repetitions: u32) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_rest(mut self, rest_between: u32) -> Self {
        self.rest_between = Some(rest_between);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn silent(mut self) -> Self {
        self.is_silent = true;
        self
    }

    /// Rest between repetitions, 0 when unset.
    pub fn rest_secs(&self) -> u32 {
        self.rest_between.unwrap_or(0)
    }

    /// Ticks one repetition occupies. A zero-length timer still takes one.
    pub fn ticks_per_repetition(&self) -> u64 {
        u64::from(self.duration.max(1))
    }

    /// Ticks for every repetition of this timer plus the rests between them.
    pub fn total_seconds(&self) -> u64 {
        let reps = u64::from(self.repetitions.max(1));
        self.ticks_per_repetition() * reps + u64::from(self.rest_secs()) * (reps - 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_one")]
    pub rounds: u32,
    /// Seconds of rest between rounds.
    #[serde(
        default,
        alias = "globalRestTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub global_rest_time: Option<u32>,
    pub timers: Vec<TimerDefinition>,
}

/// One phase of a fully expanded sequence, in playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPhase {
    pub phase: Phase,
    pub round: u32,
    pub timer_index: usize,
    pub repetition: u32,
    pub label: String,
    /// Configured duration in seconds.
    pub duration: u32,
}

impl PlannedPhase {
    /// Ticks the phase occupies on the countdown clock.
    pub fn ticks(&self) -> u64 {
        u64::from(self.duration.max(1))
    }
}

impl SequenceDefinition {
    pub fn new(timers: Vec<TimerDefinition>) -> Self {
        Self {
            name: None,
            rounds: 1,
            global_rest_time: None,
            timers,
        }
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_global_rest(mut self, secs: u32) -> Self {
        self.global_rest_time = Some(secs);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn timer(&self, index: usize) -> Option<&TimerDefinition> {
        self.timers.get(index)
    }

    /// Rest between rounds, 0 when unset.
    pub fn global_rest_secs(&self) -> u32 {
        self.global_rest_time.unwrap_or(0)
    }

    /// Clamp repetition and round counts to at least 1.
    ///
    /// Durations are left alone: a zero-length timer is legal and costs a
    /// single tick.
    pub fn normalized(mut self) -> Self {
        if self.rounds < 1 {
            warn!(rounds = self.rounds, "clamping round count to 1");
            self.rounds = 1;
        }
        for timer in &mut self.timers {
            if timer.repetitions < 1 {
                warn!(
                    timer = %timer.name,
                    repetitions = timer.repetitions,
                    "clamping repetition count to 1"
                );
                timer.repetitions = 1;
            }
        }
        self
    }

    /// Total ticks from start to completion when nothing is skipped.
    pub fn total_seconds(&self) -> u64 {
        let rounds = u64::from(self.rounds.max(1));
        let per_round: u64 = self.timers.iter().map(TimerDefinition::total_seconds).sum();
        per_round * rounds + u64::from(self.global_rest_secs()) * (rounds - 1)
    }

    /// Expand the sequence into every phase it will play, in order.
    pub fn plan(&self) -> Vec<PlannedPhase> {
        let rounds = self.rounds.max(1);
        let round_rest = self.global_rest_secs();
        let mut phases = Vec::new();

        for round in 1..=rounds {
            for (timer_index, timer) in self.timers.iter().enumerate() {
                let reps = timer.repetitions.max(1);
                for repetition in 1..=reps {
                    phases.push(PlannedPhase {
                        phase: Phase::Timer,
                        round,
                        timer_index,
                        repetition,
                        label: timer.name.clone(),
                        duration: timer.duration,
                    });
                    if repetition < reps && timer.rest_secs() > 0 {
                        phases.push(PlannedPhase {
                            phase: Phase::Rest,
                            round,
                            timer_index,
                            repetition,
                            label: "Rest".into(),
                            duration: timer.rest_secs(),
                        });
                    }
                }
            }
            if round < rounds && round_rest > 0 && !self.timers.is_empty() {
                phases.push(PlannedPhase {
                    phase: Phase::GlobalRest,
                    round,
                    timer_index: self.timers.len() - 1,
                    repetition: self.timers[self.timers.len() - 1].repetitions.max(1),
                    label: "Round rest".into(),
                    duration: round_rest,
                });
            }
        }
        phases
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SequenceError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SequenceError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read a sequence file. `.json` files are parsed as JSON, anything else
    /// as TOML. Files without timers are rejected.
    pub fn load(path: &Path) -> Result<Self, SequenceError> {
        let content = std::fs::read_to_string(path).map_err(|source| SequenceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let sequence = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };
        if sequence.is_empty() {
            return Err(SequenceError::Empty);
        }
        Ok(sequence)
    }
}
