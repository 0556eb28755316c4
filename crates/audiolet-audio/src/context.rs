//! Decoding context shared by every player.
//!
//! A context turns compressed bytes into [`DecodedBuffer`]s at its own sample
//! rate and layout, and owns the [`Destination`] that sources play into.
//! The process-wide context returned by [`DecodingContext::shared`] is created
//! on first use and never torn down.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::future::Future;
use std::sync::Arc;

use audiolet_core::{ContextOptions, Error, Result};
use bytes::Bytes;
use once_cell::sync::OnceCell;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::buffer::DecodedBuffer;
use crate::decode::{decode_bytes, remix_channels};
use crate::destination::Destination;
use crate::gain::GainNode;
use crate::output::AudioOutput;
use crate::resample::Resampler;
use crate::source::PlaybackSource;

static SHARED: OnceCell<Arc<DecodingContext>> = OnceCell::new();

/// Where load and decode tasks run.
enum TaskRuntime {
    /// The runtime that was current when the context was created.
    Borrowed(Handle),
    /// A runtime owned by the context.
    Owned(Option<Runtime>),
}

impl TaskRuntime {
    /// Borrow the current runtime, or build one if there is none.
    fn current_or_owned() -> Result<Self> {
        match Handle::try_current() {
            Ok(handle) => Ok(Self::Borrowed(handle)),
            Err(_) => Self::owned(),
        }
    }

    fn owned() -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("audiolet-runtime")
            .enable_all()
            .build()
            .map_err(|e| Error::Internal(format!("Failed to start runtime: {e}")))?;
        Ok(Self::Owned(Some(runtime)))
    }

    fn handle(&self) -> Handle {
        match self {
            Self::Borrowed(handle) => handle.clone(),
            Self::Owned(Some(runtime)) => runtime.handle().clone(),
            Self::Owned(None) => Handle::current(),
        }
    }
}

impl Drop for TaskRuntime {
    fn drop(&mut self) {
        // Dropping a runtime from async code panics; shut it down in the background instead.
        if let Self::Owned(runtime) = self {
            if let Some(runtime) = runtime.take() {
                runtime.shutdown_background();
            }
        }
    }
}

/// Host facility that decodes audio and provides the output destination.
pub struct DecodingContext {
    destination: Destination,
    options: ContextOptions,
    runtime: TaskRuntime,
    output: Option<AudioOutput>,
}

impl DecodingContext {
    /// Get the process-wide context, creating it on first use.
    ///
    /// Fails with `UnsupportedEnvironment` when no output device is available.
    /// A failed attempt is not cached, so a later call retries.
    pub fn shared() -> Result<Arc<Self>> {
        Self::shared_in(&SHARED, || {
            info!("Creating shared decoding context");
            let context = Self::realtime(ContextOptions::default(), TaskRuntime::owned()?)?;
            Ok(Arc::new(context))
        })
    }

    /// Get the context held by `cell`, creating it with `init` on first use.
    ///
    /// Concurrent callers block until one `init` finishes and then share its
    /// result. An error leaves the cell empty.
    pub(crate) fn shared_in(
        cell: &OnceCell<Arc<Self>>,
        init: impl FnOnce() -> Result<Arc<Self>>,
    ) -> Result<Arc<Self>> {
        cell.get_or_try_init(init).cloned()
    }

    /// Get the process-wide context only if it already exists.
    pub fn try_shared() -> Option<Arc<Self>> {
        SHARED.get().cloned()
    }

    /// Create a context on the default output device with explicit options.
    ///
    /// The context is independent of the shared one.
    pub fn with_options(options: ContextOptions) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::realtime(
            options,
            TaskRuntime::current_or_owned()?,
        )?))
    }

    /// Create a context with no device attached.
    ///
    /// Nothing plays until the caller pulls frames through
    /// [`Destination::render`]; the context clock advances with each render.
    pub fn offline(sample_rate: u32, channels: u16) -> Result<Arc<Self>> {
        if sample_rate == 0 || channels == 0 {
            return Err(Error::Config(format!(
                "offline context needs a non-zero rate and channel count (got {sample_rate} Hz, {channels} channels)"
            )));
        }

        let options = ContextOptions {
            sample_rate: Some(sample_rate),
            channels: Some(channels),
            ..ContextOptions::default()
        };

        debug!("Creating offline context: {sample_rate} Hz, {channels} channels");
        Ok(Arc::new(Self {
            destination: Destination::new(sample_rate, channels),
            options,
            runtime: TaskRuntime::current_or_owned()?,
            output: None,
        }))
    }

    fn realtime(options: ContextOptions, runtime: TaskRuntime) -> Result<Self> {
        let output = AudioOutput::open(&options)?;
        Ok(Self {
            destination: output.destination().clone(),
            options,
            runtime,
            output: Some(output),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.destination.sample_rate()
    }

    pub fn channels(&self) -> u16 {
        self.destination.channels()
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.destination.current_time()
    }

    pub const fn destination(&self) -> &Destination {
        &self.destination
    }

    pub const fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// True if no device drives this context.
    pub const fn is_offline(&self) -> bool {
        self.output.is_none()
    }

    /// Name of the output device, if any.
    pub fn device_name(&self) -> Option<&str> {
        self.output.as_ref().map(AudioOutput::device_name)
    }

    /// Time constant used for gain ramps.
    pub const fn gain_time_constant(&self) -> f64 {
        self.options.gain_time_constant
    }

    /// Create a gain node at unity gain feeding this context's destination.
    pub fn create_gain(&self) -> GainNode {
        GainNode::new()
    }

    /// Create an unstarted source for `buffer`, routed to the destination.
    pub fn create_buffer_source(&self, buffer: DecodedBuffer) -> PlaybackSource {
        PlaybackSource::new(buffer, self.destination.clone())
    }

    /// Decode a complete file into a buffer at this context's rate and layout.
    pub async fn decode_audio_data(
        &self,
        data: Bytes,
        mime_hint: Option<String>,
    ) -> Result<DecodedBuffer> {
        let sample_rate = self.sample_rate();
        let channels = self.channels();

        self.runtime
            .handle()
            .spawn_blocking(move || {
                decode_to_buffer(data, mime_hint.as_deref(), sample_rate, channels)
            })
            .await
            .map_err(|e| Error::Internal(format!("Decode task failed: {e}")))?
    }

    /// Run a task on the context's runtime.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.handle().spawn(future)
    }
}

impl std::fmt::Debug for DecodingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodingContext")
            .field("sample_rate", &self.sample_rate())
            .field("channels", &self.channels())
            .field("offline", &self.is_offline())
            .finish_non_exhaustive()
    }
}

/// Decode, remix, and resample in one blocking pass.
fn decode_to_buffer(
    data: Bytes,
    mime_hint: Option<&str>,
    sample_rate: u32,
    channels: u16,
) -> Result<DecodedBuffer> {
    let pcm = decode_bytes(data, mime_hint)?;
    debug!(
        "Decoded {} frames at {} Hz, {} channels",
        pcm.frames(),
        pcm.sample_rate,
        pcm.channels
    );

    let remixed = remix_channels(&pcm.samples, pcm.channels, channels);
    let samples = Resampler::new(pcm.sample_rate, sample_rate, usize::from(channels))?
        .process_all(&remixed)?;

    Ok(DecodedBuffer::new(samples, sample_rate, channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::wav_bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_offline_rejects_zero_rate() {
        assert!(matches!(
            DecodingContext::offline(0, 2),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_decode_audio_data() {
        let context = DecodingContext::offline(8000, 2).unwrap();
        let buffer = context
            .decode_audio_data(wav_bytes(8000, 1, 400), None)
            .await
            .unwrap();

        assert_eq!(buffer.sample_rate(), 8000);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 400);
    }

    #[tokio::test]
    async fn test_decode_audio_data_resamples() {
        let context = DecodingContext::offline(16000, 1).unwrap();
        let buffer = context
            .decode_audio_data(wav_bytes(8000, 1, 800), Some("audio/wav".into()))
            .await
            .unwrap();

        assert_eq!(buffer.sample_rate(), 16000);
        assert_eq!(buffer.frames(), 1600);
    }

    #[tokio::test]
    async fn test_decode_audio_data_failure() {
        let context = DecodingContext::offline(8000, 1).unwrap();
        let err = context
            .decode_audio_data(Bytes::from_static(b"garbage"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DecodeFailure(_)));
    }

    #[test]
    fn test_offline_outside_runtime_owns_one() {
        let context = DecodingContext::offline(8000, 1).unwrap();
        let handle = context.spawn(async { 21 * 2 });
        let value = block_on(handle);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_shared_in_creates_once() {
        let cell = OnceCell::new();
        let inits = AtomicUsize::new(0);
        let init = || {
            inits.fetch_add(1, Ordering::SeqCst);
            DecodingContext::offline(8000, 1)
        };

        let contexts: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| DecodingContext::shared_in(&cell, init).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert!(contexts.iter().all(|c| Arc::ptr_eq(c, &contexts[0])));
        assert!(Arc::ptr_eq(cell.get().unwrap(), &contexts[0]));
    }

    #[test]
    fn test_shared_in_retries_after_failure() {
        let cell = OnceCell::new();

        let err = DecodingContext::shared_in(&cell, || {
            Err(Error::UnsupportedEnvironment("no device".to_string()))
        })
        .unwrap_err();
        assert!(err.is_construction_error());
        assert!(cell.get().is_none());

        let context =
            DecodingContext::shared_in(&cell, || DecodingContext::offline(8000, 2)).unwrap();
        assert_eq!(context.channels(), 2);

        // A later init is never run once the cell is filled
        let again = DecodingContext::shared_in(&cell, || panic!("initialized twice")).unwrap();
        assert!(Arc::ptr_eq(&context, &again));
    }

    #[test]
    fn test_shared_is_singleton() {
        // Without an output device both attempts fail the same way.
        match (DecodingContext::shared(), DecodingContext::shared()) {
            (Ok(a), Ok(b)) => {
                assert!(Arc::ptr_eq(&a, &b));
                assert!(DecodingContext::try_shared().is_some());
            }
            (Err(a), Err(b)) => assert_eq!(a, b),
            (a, b) => panic!("inconsistent shared context: {a:?} / {b:?}"),
        }
    }

    #[test]
    fn test_create_buffer_source_targets_destination() {
        let context = DecodingContext::offline(1000, 1).unwrap();
        let source = context.create_buffer_source(DecodedBuffer::new(vec![0.5; 4], 1000, 1));
        source.start().unwrap();
        assert_eq!(context.destination().active_voices(), 1);

        let mut out = [0.0f32; 2];
        context.destination().render(&mut out);
        assert!((context.current_time() - 0.002).abs() < 1e-9);
    }

    fn block_on<T: Send + 'static>(handle: JoinHandle<T>) -> T {
        let runtime = Builder::new_current_thread().build().unwrap();
        runtime.block_on(handle).unwrap()
    }
}
