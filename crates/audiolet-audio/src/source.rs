//! Single-use playback sources.
//!
//! A source plays one decoded buffer once. After it has been started it can
//! only be stopped; playing the buffer again needs a fresh source.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use audiolet_core::{Error, Result};
use parking_lot::Mutex;
use tracing::trace;

use crate::buffer::DecodedBuffer;
use crate::destination::Destination;
use crate::gain::{GainAutomation, GainNode};

/// Invoked once when a source plays to its end.
pub type EndedCallback = Box<dyn FnOnce() + Send>;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a playback source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SourceState {
    /// Created, not yet started.
    Idle = 0,
    Playing = 1,
    /// Stopped before reaching the end.
    Stopped = 2,
    /// Played to the end of a non-looping buffer.
    Ended = 3,
}

impl SourceState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Playing,
            2 => Self::Stopped,
            _ => Self::Ended,
        }
    }
}

/// State shared between a source handle and the destination's render path.
pub(crate) struct SourceShared {
    id: u64,
    buffer: DecodedBuffer,
    state: AtomicU8,
    looping: AtomicBool,
    gain: Mutex<Option<GainNode>>,
    on_ended: Mutex<Option<EndedCallback>>,
}

impl SourceShared {
    pub(crate) const fn buffer(&self) -> &DecodedBuffer {
        &self.buffer
    }

    pub(crate) fn state(&self) -> SourceState {
        SourceState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }

    pub(crate) fn gain(&self) -> Option<GainAutomation> {
        self.gain.lock().as_ref().map(GainNode::automation)
    }

    fn transition(&self, from: SourceState, to: SourceState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Mark a playing source as ended and hand back its callback.
    pub(crate) fn finish(&self) -> Option<EndedCallback> {
        if self.transition(SourceState::Playing, SourceState::Ended) {
            trace!("Source {} ended", self.id);
            self.on_ended.lock().take()
        } else {
            None
        }
    }
}

/// Handle to a single-use playback source.
pub struct PlaybackSource {
    shared: Arc<SourceShared>,
    destination: Destination,
}

impl PlaybackSource {
    pub(crate) fn new(buffer: DecodedBuffer, destination: Destination) -> Self {
        Self {
            shared: Arc::new(SourceShared {
                id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
                buffer,
                state: AtomicU8::new(SourceState::Idle as u8),
                looping: AtomicBool::new(false),
                gain: Mutex::new(None),
                on_ended: Mutex::new(None),
            }),
            destination,
        }
    }

    /// Process-unique id of this source.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn buffer(&self) -> &DecodedBuffer {
        &self.shared.buffer
    }

    pub fn state(&self) -> SourceState {
        self.shared.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == SourceState::Playing
    }

    pub fn is_looping(&self) -> bool {
        self.shared.is_looping()
    }

    /// Repeat the buffer until stopped. Takes effect immediately, even while playing.
    pub fn set_loop(&self, looping: bool) {
        self.shared.looping.store(looping, Ordering::Relaxed);
    }

    /// Route this source through a gain node instead of straight to the destination.
    pub fn connect(&self, gain: &GainNode) {
        *self.shared.gain.lock() = Some(gain.clone());
    }

    /// Route this source straight to the destination.
    pub fn disconnect(&self) {
        *self.shared.gain.lock() = None;
    }

    /// Get the gain node this source plays through, if any.
    pub fn gain(&self) -> Option<GainNode> {
        self.shared.gain.lock().clone()
    }

    /// Set the callback fired when the buffer plays to its end.
    ///
    /// Looping sources never end on their own. Stopping a source does not
    /// fire the callback.
    pub fn on_ended(&self, callback: impl FnOnce() + Send + 'static) {
        *self.shared.on_ended.lock() = Some(Box::new(callback));
    }

    /// Start playback. A source can only be started once.
    pub fn start(&self) -> Result<()> {
        if !self
            .shared
            .transition(SourceState::Idle, SourceState::Playing)
        {
            return Err(Error::InvalidState(format!(
                "source {} can only be started once (state: {:?})",
                self.shared.id,
                self.state()
            )));
        }

        trace!("Source {} started", self.shared.id);
        self.destination.add_voice(Arc::clone(&self.shared));
        Ok(())
    }

    /// Stop a playing source. No-op if it was never started or already finished.
    pub fn stop(&self) {
        if self
            .shared
            .transition(SourceState::Playing, SourceState::Stopped)
        {
            trace!("Source {} stopped", self.shared.id);
        }
    }
}

impl std::fmt::Debug for PlaybackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSource")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .field("looping", &self.is_looping())
            .field("frames", &self.shared.buffer.frames())
            .finish()
    }
}
