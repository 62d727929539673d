//! Near-zero countdown alerts.
//!
//! During the last [`ALERT_WINDOW_SECS`] seconds of a phase the notifier plays
//! one short [`Tone`] per countdown second, unless the current timer is marked
//! silent. The silence flag is always read from the timer at the current
//! index, so rests inherit the flag of the timer they belong to.

use std::f32::consts::TAU;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::scheduler::{EngineState, Phase};
use crate::sequence::SequenceDefinition;

/// Alerts fire while `time_remaining` is in `1..=ALERT_WINDOW_SECS`.
pub const ALERT_WINDOW_SECS: u32 = 3;

/// A short fixed-pitch beep with an exponential fade-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration_ms: u32,
    /// Peak amplitude, 0.0 ..= 1.0.
    pub volume: f32,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            frequency_hz: 880.0,
            duration_ms: 150,
            volume: 0.5,
        }
    }
}

impl Tone {
    /// Synthesize mono PCM samples at `sample_rate`.
    ///
    /// Amplitude decays to roughly 0.1% of the peak by the last sample.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let len = (u64::from(sample_rate) * u64::from(self.duration_ms) / 1000) as usize;
        if len == 0 {
            return Vec::new();
        }
        let volume = self.volume.clamp(0.0, 1.0);
        let seconds = self.duration_ms as f32 / 1000.0;
        let decay = 1000f32.ln() / seconds;
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                volume * (TAU * self.frequency_hz * t).sin() * (-decay * t).exp()
            })
            .collect()
    }
}

/// Destination for alert tones.
pub trait ToneSink: Send {
    fn play(&mut self, tone: &Tone);
}

impl<F> ToneSink for F
where
    F: FnMut(&Tone) + Send,
{
    fn play(&mut self, tone: &Tone) {
        self(tone)
    }
}

/// Sink that drops every tone.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutedSink;

impl ToneSink for MutedSink {
    fn play(&mut self, _tone: &Tone) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AlertKey {
    phase: Phase,
    round: u32,
    timer_index: usize,
    repetition: u32,
    remaining: u32,
}

impl AlertKey {
    fn of(state: &EngineState) -> Self {
        Self {
            phase: state.phase,
            round: state.current_round,
            timer_index: state.current_timer_index,
            repetition: state.current_repetition,
            remaining: state.time_remaining,
        }
    }
}

pub struct AlertNotifier {
    tone: Tone,
    enabled: bool,
    sink: Box<dyn ToneSink>,
    last: Option<AlertKey>,
}

impl AlertNotifier {
    pub fn new(sink: impl ToneSink + 'static) -> Self {
        Self {
            tone: Tone::default(),
            enabled: true,
            sink: Box::new(sink),
            last: None,
        }
    }

    /// Notifier that never plays anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(MutedSink)
        }
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn tone(&self) -> &Tone {
        &self.tone
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Forget which second was last alerted. Called when a session restarts.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Evaluate the alert for the state left behind by a tick.
    ///
    /// Returns the countdown second a tone was played for, if any.
    pub fn evaluate(&mut self, state: &EngineState, sequence: &SequenceDefinition) -> Option<u32> {
        if !self.enabled || !state.is_running {
            return None;
        }
        if !(1..=ALERT_WINDOW_SECS).contains(&state.time_remaining) {
            return None;
        }
        let timer = sequence.timer(state.current_timer_index)?;
        if timer.is_silent {
            return None;
        }
        let key = AlertKey::of(state);
        if self.last == Some(key) {
            return None;
        }
        self.last = Some(key);
        debug!(seconds = state.time_remaining, timer = %timer.name, "countdown alert");
        self.sink.play(&self.tone);
        Some(state.time_remaining)
    }
}

impl fmt::Debug for AlertNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertNotifier")
            .field("tone", &self.tone)
            .field("enabled", &self.enabled)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

impl Default for AlertNotifier {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::TimerDefinition;
    use std::sync::{Arc, Mutex};

    fn counting() -> (AlertNotifier, Arc<Mutex<u32>>) {
        let plays = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&plays);
        let notifier = AlertNotifier::new(move |_: &Tone| *counter.lock().unwrap() += 1);
        (notifier, plays)
    }

    fn state_with(remaining: u32) -> EngineState {
        EngineState {
            phase: Phase::Timer,
            current_round: 1,
            current_timer_index: 0,
            current_repetition: 1,
            time_remaining: remaining,
            is_running: true,
            is_paused: false,
        }
    }

    #[test]
    fn fires_only_in_final_three_seconds() {
        let seq = SequenceDefinition::new(vec![TimerDefinition::new("A", 10)]);
        let (mut notifier, plays) = counting();
        for remaining in (0..=10).rev() {
            notifier.evaluate(&state_with(remaining), &seq);
        }
        assert_eq!(*plays.lock().unwrap(), 3);
    }

    #[test]
    fn same_second_is_not_repeated() {
        let seq = SequenceDefinition::new(vec![TimerDefinition::new("A", 10)]);
        let (mut notifier, plays) = counting();
        assert_eq!(notifier.evaluate(&state_with(2), &seq), Some(2));
        assert_eq!(notifier.evaluate(&state_with(2), &seq), None);
        assert_eq!(*plays.lock().unwrap(), 1);
    }

    #[test]
    fn new_phase_with_same_remaining_fires_again() {
        let seq = SequenceDefinition::new(vec![TimerDefinition::new("A", 3).with_repetitions(2)]);
        let (mut notifier, _plays) = counting();
        let first = state_with(3);
        let second = EngineState {
            current_repetition: 2,
            ..first
        };
        assert_eq!(notifier.evaluate(&first, &seq), Some(3));
        assert_eq!(notifier.evaluate(&second, &seq), Some(3));
    }

    #[test]
    fn silent_timer_mutes_its_rest_too() {
        let seq = SequenceDefinition::new(vec![TimerDefinition::new("A", 10)
            .with_repetitions(2)
            .with_rest(5)
            .silent()]);
        let (mut notifier, plays) = counting();
        let rest = EngineState {
            phase: Phase::Rest,
            ..state_with(2)
        };
        assert_eq!(notifier.evaluate(&rest, &seq), None);
        assert_eq!(*plays.lock().unwrap(), 0);
    }

    #[test]
    fn disabled_or_stopped_never_fires() {
        let seq = SequenceDefinition::new(vec![TimerDefinition::new("A", 10)]);
        let mut disabled = AlertNotifier::disabled();
        assert_eq!(disabled.evaluate(&state_with(1), &seq), None);

        let (mut notifier, _plays) = counting();
        let stopped = EngineState {
            is_running: false,
            ..state_with(1)
        };
        assert_eq!(notifier.evaluate(&stopped, &seq), None);
    }

    #[test]
    fn rendered_tone_fades_out() {
        let tone = Tone::default();
        let samples = tone.render(8_000);
        assert_eq!(samples.len(), 1_200);
        assert!(samples.iter().all(|s| s.abs() <= tone.volume + f32::EPSILON));

        let peak = |chunk: &[f32]| chunk.iter().fold(0f32, |m, s| m.max(s.abs()));
        assert!(peak(&samples[..100]) > 10.0 * peak(&samples[1_100..]));
    }
}
