//! Core domain types for Audiolet.

pub mod config;
pub mod format;
pub mod source;

pub use config::{
    sanitize_volume, ContextOptions, PlayerConfig, PlayerInit, DEFAULT_GAIN_TIME_CONSTANT,
};
pub use format::{validate_source, AudioFormat};
pub use source::{AudioSource, Blob};
