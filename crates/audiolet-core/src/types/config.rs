//! Player and context configuration.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::source::AudioSource;

/// Time constant (seconds) of the initial volume ramp.
pub const DEFAULT_GAIN_TIME_CONSTANT: f64 = 0.015;

const fn default_volume() -> f32 {
    1.0
}

/// Full player configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Audio content location or data.
    pub source: AudioSource,
    /// Start playback as soon as decoding completes.
    #[serde(default)]
    pub auto_play: bool,
    /// Repeat the decoded buffer indefinitely.
    #[serde(default, rename = "loop")]
    pub loop_playback: bool,
    /// Initial gain, applied through a short ramp.
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl PlayerConfig {
    pub fn new(source: impl Into<AudioSource>) -> Self {
        Self {
            source: source.into(),
            auto_play: false,
            loop_playback: false,
            volume: default_volume(),
        }
    }

    pub const fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    pub const fn with_loop(mut self, loop_playback: bool) -> Self {
        self.loop_playback = loop_playback;
        self
    }

    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The volume to latch into the gain node.
    ///
    /// Negative values clamp to silence and non-finite values fall back to 1.0.
    pub fn effective_volume(&self) -> f32 {
        sanitize_volume(self.volume)
    }
}

/// Clamp a requested volume into the accepted range.
pub fn sanitize_volume(volume: f32) -> f32 {
    if !volume.is_finite() {
        warn!("Ignoring non-finite volume {volume}, using 1.0");
        return default_volume();
    }
    if volume < 0.0 {
        warn!("Clamping negative volume {volume} to 0.0");
        return 0.0;
    }
    volume
}

/// What a player is constructed from.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerInit {
    /// Legacy shorthand: a bare URL with no gain, loop, or auto-play setup.
    Source(String),
    /// Full configuration.
    Config(PlayerConfig),
}

impl PlayerInit {
    /// Get the source this init describes.
    pub fn source(&self) -> AudioSource {
        match self {
            Self::Source(url) => AudioSource::Url(url.clone()),
            Self::Config(config) => config.source.clone(),
        }
    }

    /// Reject inits that carry no usable source.
    pub fn ensure_present(&self) -> Result<()> {
        let blank = match self {
            Self::Source(url) => url.trim().is_empty(),
            Self::Config(config) => config
                .source
                .as_url()
                .is_some_and(|url| url.trim().is_empty()),
        };
        if blank {
            return Err(Error::ConfigurationMissing);
        }
        Ok(())
    }
}

impl From<&str> for PlayerInit {
    fn from(url: &str) -> Self {
        Self::Source(url.to_string())
    }
}

impl From<String> for PlayerInit {
    fn from(url: String) -> Self {
        Self::Source(url)
    }
}

impl From<PlayerConfig> for PlayerInit {
    fn from(config: PlayerConfig) -> Self {
        Self::Config(config)
    }
}

/// Options for creating a decoding context.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextOptions {
    /// Output sample rate. Defaults to the device rate.
    pub sample_rate: Option<u32>,
    /// Output channel count. Defaults to the device layout.
    pub channels: Option<u16>,
    /// Time constant (seconds) for gain ramps.
    pub gain_time_constant: f64,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            sample_rate: None,
            channels: None,
            gain_time_constant: DEFAULT_GAIN_TIME_CONSTANT,
        }
    }
}
