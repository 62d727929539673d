mod alert;
mod clock;
mod engine;
mod scheduler;
mod session;
mod snapshot;

pub use alert::{AlertNotifier, MutedSink, Tone, ToneSink, ALERT_WINDOW_SECS};
pub use clock::{countdown, CountdownClock, TICK_PERIOD};
pub use engine::{CompletionNotifier, PlaybackController};
pub use scheduler::{advance, phase_duration, EngineState, Phase, Position, Transition};
pub use session::{run_session, Command, SessionEnd};
pub use snapshot::{format_clock, Snapshot};
