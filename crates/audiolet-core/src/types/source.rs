//! Audio source descriptors.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Deserializer};

/// In-memory binary object holding file-like audio data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    mime_type: Option<String>,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
        }
    }

    /// Attach a MIME type, used as a decoding hint.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Get the raw bytes (cheap clone of the shared buffer).
    pub fn data(&self) -> Bytes {
        self.data.clone()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Where the audio content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// A URL or local path to an audio file.
    Url(String),
    /// In-memory audio data.
    Blob(Blob),
}

impl AudioSource {
    pub const fn is_blob(&self) -> bool {
        matches!(self, Self::Blob(_))
    }

    /// Get the URL, if this source is one.
    pub fn as_url(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Blob(_) => None,
        }
    }

    /// Get the MIME hint for decoding, if known.
    pub fn mime_hint(&self) -> Option<&str> {
        match self {
            Self::Url(_) => None,
            Self::Blob(blob) => blob.mime_type(),
        }
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Blob(blob) => write!(f, "blob({} bytes)", blob.len()),
        }
    }
}

impl From<&str> for AudioSource {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for AudioSource {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<Blob> for AudioSource {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

// Only URLs can come from a config file.
impl<'de> Deserialize<'de> for AudioSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::Url)
    }
}
