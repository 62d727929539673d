//! Alert tone output for the terminal host.
//!
//! With the `audio` feature the tone is synthesized and played through the
//! default output device with rodio. Without it, or when no device can be
//! opened, each tone rings the terminal bell instead.

use std::io::Write;

use circuit_core::{Tone, ToneSink};

/// Rings the terminal bell for each countdown tone.
pub struct BellSink;

impl BellSink {
    fn ring() {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
    }
}

impl ToneSink for BellSink {
    fn play(&mut self, _tone: &Tone) {
        Self::ring();
    }
}

#[cfg(feature = "audio")]
pub use rodio_sink::RodioSink;

#[cfg(feature = "audio")]
mod rodio_sink {
    use circuit_core::{Tone, ToneSink};
    use rodio::buffer::SamplesBuffer;
    use tracing::debug;

    use super::BellSink;

    pub const SAMPLE_RATE: u32 = 44_100;

    /// Mono buffer holding the rendered tone, fade-out included.
    pub fn tone_source(tone: &Tone) -> SamplesBuffer<f32> {
        SamplesBuffer::new(1, SAMPLE_RATE, tone.render(SAMPLE_RATE))
    }

    /// Plays each tone on the default output device.
    ///
    /// Playback happens on a short-lived thread so the tick is never held up
    /// by the audio device.
    pub struct RodioSink;

    impl ToneSink for RodioSink {
        fn play(&mut self, tone: &Tone) {
            let tone = *tone;
            std::thread::spawn(move || {
                use rodio::{OutputStream, Sink};

                let Ok((_stream, stream_handle)) = OutputStream::try_default() else {
                    debug!("no audio output device, falling back to the bell");
                    BellSink.play(&tone);
                    return;
                };
                let Ok(sink) = Sink::try_new(&stream_handle) else {
                    BellSink.play(&tone);
                    return;
                };
                sink.append(tone_source(&tone));
                sink.sleep_until_end();
            });
        }
    }

}

/// Sink used by `circuit run`.
#[cfg(feature = "audio")]
pub fn alert_sink() -> RodioSink {
    RodioSink
}

/// Sink used by `circuit run`.
#[cfg(not(feature = "audio"))]
pub fn alert_sink() -> BellSink {
    BellSink
}
