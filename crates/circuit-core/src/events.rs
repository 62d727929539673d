use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{Position, Transition};

/// Every state change of a playback session produces an Event.
/// Hosts log or forward them; the snapshot remains the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        total_timers: usize,
        total_rounds: u32,
        /// Expected length without skips.
        total_secs: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        session_id: Uuid,
        time_remaining: u32,
        at: DateTime<Utc>,
    },
    SessionResumed {
        session_id: Uuid,
        time_remaining: u32,
        at: DateTime<Utc>,
    },
    SessionStopped {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
    PhaseSkipped {
        session_id: Uuid,
        from: Position,
        to: Position,
        at: DateTime<Utc>,
    },
    PhaseAdvanced {
        session_id: Uuid,
        transition: Transition,
        position: Position,
        time_remaining: u32,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: Uuid,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn session_id(&self) -> Uuid {
        match self {
            Event::SessionStarted { session_id, .. }
            | Event::SessionPaused { session_id, .. }
            | Event::SessionResumed { session_id, .. }
            | Event::SessionStopped { session_id, .. }
            | Event::PhaseSkipped { session_id, .. }
            | Event::PhaseAdvanced { session_id, .. }
            | Event::SessionCompleted { session_id, .. } => *session_id,
        }
    }
}
