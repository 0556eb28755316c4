//! # audiolet-audio
//!
//! Decoding context and audio player for Audiolet.
//!
//! Features:
//! - Process-wide decoding context, created once on first use
//! - Full-file decoding with symphonia, resampled to the device rate
//! - Single-use playback sources mixed through a shared destination
//! - Players that load, decode, and start on request or automatically

pub mod buffer;
pub mod callback;
pub mod context;
pub mod decode;
pub mod destination;
pub mod gain;
pub mod opus_decode;
pub mod output;
pub mod player;
pub mod resample;
pub mod source;

pub use audiolet_core::{
    AudioFormat, AudioSource, Blob, ContextOptions, Error, PlayerConfig, PlayerInit, Result,
};
pub use buffer::DecodedBuffer;
pub use callback::{Callback, CallbackRegistry};
pub use context::DecodingContext;
pub use destination::Destination;
pub use gain::GainNode;
pub use player::{AudioPlayer, PlayIntent, PlayerEvent, PlayerId, PlayerState};
pub use source::{PlaybackSource, SourceState};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "audiolet_audio=info,audiolet_loader=info";

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .try_init();
}
