//! Opus packet decoding through libopus.
//!
//! symphonia demuxes Ogg and WebM Opus tracks but has no Opus codec, so the
//! decoder falls back to this for `CODEC_TYPE_OPUS`.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use audiolet_core::{Error, Result};
use opus::Channels;
use tracing::debug;

/// Opus always decodes at 48 kHz.
pub const OPUS_SAMPLE_RATE: u32 = 48_000;

/// 120 ms at 48 kHz, the longest packet Opus allows.
const MAX_FRAME_SAMPLES: usize = 5760;

/// Fields of an `OpusHead` identification header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpusHead {
    pub channels: u16,
    /// Frames to drop from the start of the decoded stream.
    pub pre_skip: usize,
}

impl OpusHead {
    /// Parse the header symphonia passes along as codec extra data.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 19 || !data.starts_with(b"OpusHead") {
            return None;
        }
        Some(Self {
            channels: u16::from(data[9]),
            pre_skip: usize::from(u16::from_le_bytes([data[10], data[11]])),
        })
    }
}

/// Decodes the packets of one Opus track into interleaved f32.
pub struct OpusPacketDecoder {
    decoder: opus::Decoder,
    channels: u16,
    /// Pre-skip frames still to drop.
    skip: usize,
    scratch: Vec<f32>,
}

impl OpusPacketDecoder {
    pub fn new(head: OpusHead) -> Result<Self> {
        let layout = match head.channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            n => {
                return Err(Error::DecodeFailure(format!(
                    "Opus streams with {n} channels are not supported"
                )));
            }
        };

        let decoder = opus::Decoder::new(OPUS_SAMPLE_RATE, layout)
            .map_err(|e| Error::DecodeFailure(format!("Failed to create Opus decoder: {e}")))?;

        debug!(
            "Opus decoder created: {} channels, pre-skip {}",
            head.channels, head.pre_skip
        );

        Ok(Self {
            decoder,
            channels: head.channels,
            skip: head.pre_skip,
            scratch: vec![0.0; MAX_FRAME_SAMPLES * usize::from(head.channels)],
        })
    }

    /// Build a decoder from the track's extra data, falling back to the
    /// container's channel count with no pre-skip.
    pub fn from_track(extra_data: Option<&[u8]>, channels: Option<u16>) -> Result<Self> {
        let head = extra_data.and_then(OpusHead::parse).unwrap_or(OpusHead {
            channels: channels.unwrap_or(2),
            pre_skip: 0,
        });
        Self::new(head)
    }

    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Decode one packet. The pre-skip is trimmed from the first packets.
    pub fn decode(&mut self, packet: &[u8]) -> Result<Vec<f32>> {
        let frames = self
            .decoder
            .decode_float(packet, &mut self.scratch, false)
            .map_err(|e| Error::DecodeFailure(format!("Opus decode failed: {e}")))?;

        let skipped = self.skip.min(frames);
        self.skip -= skipped;

        let channels = usize::from(self.channels);
        Ok(self.scratch[skipped * channels..frames * channels].to_vec())
    }
}
