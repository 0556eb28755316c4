//! # audiolet-core
//!
//! Core types, configuration, and error handling for the Audiolet playback helper.

pub mod error;
pub mod types;

pub use error::{Error, HttpError, Result};
pub use types::*;
