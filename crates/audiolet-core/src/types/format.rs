//! Supported audio formats and source validation.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use crate::error::{Error, Result};
use crate::types::source::AudioSource;

/// Audio file formats accepted for URL sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Opus,
    Ogg,
    Wav,
    M4a,
    /// `WebM` audio.
    Weba,
}

impl AudioFormat {
    /// Every accepted format.
    pub const ALL: [Self; 6] = [
        Self::Mp3,
        Self::Opus,
        Self::Ogg,
        Self::Wav,
        Self::M4a,
        Self::Weba,
    ];

    /// File extension without the leading dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Ogg => "ogg",
            Self::Wav => "wav",
            Self::M4a => "m4a",
            Self::Weba => "weba",
        }
    }

    /// Parse from a file extension (without the dot). Case-sensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Typical MIME type for this format.
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/opus",
            Self::Ogg => "audio/ogg",
            Self::Wav => "audio/wav",
            Self::M4a => "audio/mp4",
            Self::Weba => "audio/webm",
        }
    }

    /// Detect the format from the end of a URL or path.
    ///
    /// The whole string must end in `.<ext>`, so query strings and fragments
    /// after the extension are rejected.
    pub fn from_source_path(path: &str) -> Option<Self> {
        let (_, ext) = path.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

/// Check that a source may be loaded.
///
/// Blobs are trusted and bypass the check entirely. URL sources must end in an
/// accepted extension.
pub fn validate_source(source: &AudioSource) -> Result<Option<AudioFormat>> {
    match source {
        AudioSource::Blob(_) => Ok(None),
        AudioSource::Url(url) => AudioFormat::from_source_path(url)
            .map(Some)
            .ok_or_else(|| Error::InvalidFormat(url.clone())),
    }
}
