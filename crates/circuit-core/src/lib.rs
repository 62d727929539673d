//! # Circuit Core Library
//!
//! Playback engine for structured interval workouts: an ordered list of
//! timers, each with repetitions and optional rests, repeated across rounds
//! with an optional rest between rounds.
//!
//! ## Architecture
//!
//! - **Sequence**: immutable workout definition, loadable from TOML or JSON
//! - **Scheduler**: pure transition function over an explicit `EngineState`
//! - **Clock**: one-second logical ticks paced by a cancellable tokio interval
//! - **Controller**: `start` / `pause_toggle` / `stop` / `skip` plus snapshots
//! - **Alerts**: short tones during the last seconds of a non-silent timer
//!
//! ## Key Components
//!
//! - [`PlaybackController`]: owns the state and clock of one session
//! - [`Snapshot`]: display-ready projection of the state
//! - [`Config`]: host configuration (tick pacing, alert tone)

pub mod error;
pub mod events;
pub mod sequence;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, EngineError, SequenceError};
pub use events::Event;
pub use sequence::{PlannedPhase, SequenceDefinition, TimerDefinition};
pub use storage::Config;
pub use timer::{
    run_session, AlertNotifier, Command, CompletionNotifier, EngineState, Phase,
    PlaybackController, SessionEnd, Snapshot, Tone, ToneSink, Transition,
};
