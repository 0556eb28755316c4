//! Final mix bus shared by every source of a context.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::source::{EndedCallback, SourceShared, SourceState};

/// A started source and its read position.
struct Voice {
    source: Arc<SourceShared>,
    position: usize,
}

struct DestinationInner {
    sample_rate: u32,
    channels: u16,
    voices: Mutex<Vec<Voice>>,
    frames_rendered: AtomicU64,
}

/// Output of a decoding context.
///
/// Whatever drives the output (a device stream or an offline caller) pulls
/// interleaved frames through [`Destination::render`], which also advances
/// the context clock.
#[derive(Clone)]
pub struct Destination {
    inner: Arc<DestinationInner>,
}

impl Destination {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            inner: Arc::new(DestinationInner {
                sample_rate,
                channels: channels.max(1),
                voices: Mutex::new(Vec::new()),
                frames_rendered: AtomicU64::new(0),
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    /// Frames rendered since creation.
    pub fn frames_rendered(&self) -> u64 {
        self.inner.frames_rendered.load(Ordering::Acquire)
    }

    /// Context time in seconds.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered() as f64 / f64::from(self.inner.sample_rate.max(1))
    }

    /// Number of sources currently playing.
    pub fn active_voices(&self) -> usize {
        self.inner
            .voices
            .lock()
            .iter()
            .filter(|v| v.source.state() == SourceState::Playing)
            .count()
    }

    pub(crate) fn add_voice(&self, source: Arc<SourceShared>) {
        self.inner.voices.lock().push(Voice {
            source,
            position: 0,
        });
    }

    /// Mix every playing source into `output` (interleaved).
    ///
    /// Voices that were stopped or played to their end are dropped. Ended
    /// callbacks run after the voice list is released.
    pub fn render(&self, output: &mut [f32]) {
        output.fill(0.0);

        let channels = usize::from(self.inner.channels);
        let frames = output.len() / channels;
        let start_frame = self.frames_rendered();
        let sample_rate = f64::from(self.inner.sample_rate.max(1));
        let mut finished: Vec<EndedCallback> = Vec::new();

        {
            let mut voices = self.inner.voices.lock();
            voices.retain_mut(|voice| {
                if voice.source.state() != SourceState::Playing {
                    return false;
                }

                let ended = mix_voice(voice, output, channels, frames, start_frame, sample_rate);
                if ended {
                    if let Some(callback) = voice.source.finish() {
                        finished.push(callback);
                    }
                    return false;
                }
                true
            });
        }

        // Soft clipping using tanh for smooth limiting
        for sample in output.iter_mut() {
            if sample.abs() > 0.9 {
                *sample = sample.tanh();
            }
        }

        self.inner
            .frames_rendered
            .fetch_add(frames as u64, Ordering::AcqRel);

        for callback in finished {
            callback();
        }
    }
}

/// Mix one voice into the output. Returns true when a non-looping voice ran out.
fn mix_voice(
    voice: &mut Voice,
    output: &mut [f32],
    channels: usize,
    frames: usize,
    start_frame: u64,
    sample_rate: f64,
) -> bool {
    let buffer = voice.source.buffer();
    let total = buffer.frames();
    if total == 0 {
        return true;
    }

    let gain = voice.source.gain();
    let looping = voice.source.is_looping();
    let src_channels = usize::from(buffer.channels());
    let samples = buffer.samples();

    for frame in 0..frames {
        if voice.position >= total {
            if looping {
                voice.position = 0;
            } else {
                return true;
            }
        }

        let level = gain.map_or(1.0, |g| {
            g.value_at((start_frame + frame as u64) as f64 / sample_rate)
        });

        let base = voice.position * src_channels;
        for ch in 0..channels {
            let sample = samples[base + ch % src_channels];
            output[frame * channels + ch] += sample * level;
        }
        voice.position += 1;
    }

    !looping && voice.position >= total
}
