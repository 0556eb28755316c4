//! Sample-rate conversion using rubato.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use audiolet_core::{Error, Result};
use rubato::{FftFixedIn, Resampler as RubatoResampler};
use tracing::debug;

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Converts whole interleaved buffers to the context's sample rate.
pub struct Resampler {
    /// `None` when input and output rates match.
    resampler: Option<FftFixedIn<f32>>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    /// Deinterleaved input waiting for a full chunk.
    input_buffer: Vec<Vec<f32>>,
}

impl Resampler {
    /// Create a new resampler.
    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> Result<Self> {
        let channels = channels.max(1);
        let resampler = if input_rate == output_rate {
            None
        } else {
            let resampler = FftFixedIn::new(
                input_rate as usize,
                output_rate as usize,
                CHUNK_SIZE,
                SUB_CHUNKS,
                channels,
            )
            .map_err(|e| Error::DecodeFailure(format!("Failed to create resampler: {e}")))?;

            debug!(
                "Resampler created: {}Hz -> {}Hz, {} channels",
                input_rate, output_rate, channels
            );
            Some(resampler)
        };

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            channels,
            input_buffer: vec![Vec::new(); channels],
        })
    }

    /// Check if resampling is needed.
    pub const fn needs_resampling(&self) -> bool {
        self.resampler.is_some()
    }

    pub const fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub const fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Resample a complete interleaved buffer, including its tail.
    pub fn process_all(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(input.to_vec());
        };

        // Deinterleave input
        for frame in input.chunks_exact(self.channels) {
            for (buffer, sample) in self.input_buffer.iter_mut().zip(frame) {
                buffer.push(*sample);
            }
        }

        let input_frames = self.input_buffer[0].len();
        let expected = (input_frames as f64 * f64::from(self.output_rate)
            / f64::from(self.input_rate))
        .round() as usize;
        let delay = resampler.output_delay();
        let mut output: Vec<Vec<f32>> = vec![Vec::new(); self.channels];

        // Keep feeding (silence once the input runs out) until the delayed
        // output covers the whole signal.
        while output[0].len() < delay + expected {
            let needed = resampler.input_frames_next();
            let take = self.input_buffer[0].len().min(needed);

            let chunk: Vec<Vec<f32>> = self
                .input_buffer
                .iter_mut()
                .map(|ch| {
                    let mut data: Vec<f32> = ch.drain(..take).collect();
                    data.resize(needed, 0.0);
                    data
                })
                .collect();

            let resampled = resampler
                .process(&chunk, None)
                .map_err(|e| Error::DecodeFailure(format!("Resample failed: {e}")))?;

            for (out, ch) in output.iter_mut().zip(resampled) {
                out.extend(ch);
            }
        }

        let mut interleaved = Vec::with_capacity(expected * self.channels);
        for frame in delay..delay + expected {
            for ch in &output {
                interleaved.push(ch[frame]);
            }
        }

        Ok(interleaved)
    }
}
