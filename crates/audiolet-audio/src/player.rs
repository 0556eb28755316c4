//! Audio player: load, decode, and play one source.
//!
//! Construction validates the source synchronously and then drives
//! load → decode in the background on the context's runtime. Progress and
//! failures are reported through [`PlayerEvent`]s and
//! [`AudioPlayer::wait_until_ready`].

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use audiolet_core::{
    sanitize_volume, validate_source, AudioFormat, AudioSource, Error, PlayerConfig, PlayerInit,
    Result,
};
use audiolet_loader::{DefaultLoader, SourceLoader};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use crate::buffer::DecodedBuffer;
use crate::callback::{Callback, CallbackRegistry};
use crate::context::DecodingContext;
use crate::gain::GainNode;
use crate::source::PlaybackSource;

/// Identifies a player in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(Uuid);

impl PlayerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// Fetching or reading the source bytes.
    #[default]
    Loading,
    /// Bytes are in; the context is decoding them.
    Decoding,
    /// Decoded, never played.
    Ready,
    Playing,
    /// Decoded, played at least once, nothing active now.
    Stopped,
    /// Load or decode failed. Terminal.
    Failed,
}

impl PlayerState {
    /// True once a decoded buffer is available.
    pub const fn has_buffer(self) -> bool {
        matches!(self, Self::Ready | Self::Playing | Self::Stopped)
    }
}

/// Whether playback has been asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayIntent {
    #[default]
    NotRequested,
    /// Start as soon as decoding completes.
    RequestedBeforeReady,
    Playing,
}

/// Events emitted by a player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Source bytes arrived.
    Loaded { bytes: usize },
    /// Decoding finished.
    Decoded { duration: Duration },
    /// A fresh source started playing.
    Started,
    /// Playback was stopped by the caller.
    Stopped,
    /// A non-looping source played to its end.
    Ended,
    /// Load or decode failed.
    Failed(Error),
}

#[derive(Debug, Clone, PartialEq)]
enum Readiness {
    Pending,
    Ready,
    Failed(Error),
}

/// How the player was constructed.
enum Mode {
    /// Bare URL: no gain stage, no loop, no auto-play.
    Legacy,
    Configured { config: PlayerConfig, gain: GainNode },
}

struct PlayerInner {
    state: PlayerState,
    intent: PlayIntent,
    buffer: Option<DecodedBuffer>,
    /// Source built at decode time, used by the first start.
    prepared: Option<PlaybackSource>,
    /// The one started source, if any.
    active: Option<PlaybackSource>,
    error: Option<Error>,
    /// Set when the owning handle is dropped.
    closed: bool,
}

struct PlayerShared {
    id: PlayerId,
    this: Weak<PlayerShared>,
    context: Arc<DecodingContext>,
    mode: Mode,
    source: AudioSource,
    format: Option<AudioFormat>,
    inner: Mutex<PlayerInner>,
    callbacks: CallbackRegistry<PlayerShared>,
    event_tx: Sender<PlayerEvent>,
    ready_tx: watch::Sender<Readiness>,
}

/// Plays a single audio source through a decoding context.
///
/// At most one playback source is active at a time. Dropping the player
/// stops it; the context is unaffected.
pub struct AudioPlayer {
    shared: Arc<PlayerShared>,
    event_rx: Receiver<PlayerEvent>,
}

impl AudioPlayer {
    /// Create a player on `context` using the default loader.
    ///
    /// Fails with `ConfigurationMissing` if `init` is `None` or names a blank
    /// source, and with `InvalidFormat` if a URL does not end in a supported
    /// extension. Both checks run before any load is attempted.
    pub fn new(context: &Arc<DecodingContext>, init: Option<PlayerInit>) -> Result<Self> {
        Self::with_loader(context, init, Arc::new(DefaultLoader::new()))
    }

    /// Create a player on `context` that loads bytes through `loader`.
    pub fn with_loader(
        context: &Arc<DecodingContext>,
        init: Option<PlayerInit>,
        loader: Arc<dyn SourceLoader>,
    ) -> Result<Self> {
        let init = check_init(init)?;
        let source = init.source();
        let format = validate_source(&source)?;

        let (mode, intent) = match init {
            PlayerInit::Source(_) => (Mode::Legacy, PlayIntent::NotRequested),
            PlayerInit::Config(config) => {
                let gain = context.create_gain();
                gain.set_target_at_time(
                    config.effective_volume(),
                    context.current_time(),
                    context.gain_time_constant(),
                );
                let intent = if config.auto_play {
                    PlayIntent::RequestedBeforeReady
                } else {
                    PlayIntent::NotRequested
                };
                (Mode::Configured { config, gain }, intent)
            }
        };

        let (event_tx, event_rx) = unbounded();
        let (ready_tx, _) = watch::channel(Readiness::Pending);

        let shared = Arc::new_cyclic(|this| PlayerShared {
            id: PlayerId::new(),
            this: this.clone(),
            context: Arc::clone(context),
            mode,
            source,
            format,
            inner: Mutex::new(PlayerInner {
                state: PlayerState::Loading,
                intent,
                buffer: None,
                prepared: None,
                active: None,
                error: None,
                closed: false,
            }),
            callbacks: CallbackRegistry::new(),
            event_tx,
            ready_tx,
        });

        info!(
            "Player {} created for {} (auto-play: {})",
            shared.id,
            shared.source,
            intent == PlayIntent::RequestedBeforeReady
        );

        context.spawn(run_pipeline(Arc::downgrade(&shared), loader));

        Ok(Self { shared, event_rx })
    }

    /// Create a player from a bare URL on the shared context.
    ///
    /// The URL gets no gain stage; use [`AudioPlayer::from_config`] for volume
    /// or loop control.
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        Self::open(Some(PlayerInit::Source(url.into())))
    }

    /// Create a player from a full configuration on the shared context.
    pub fn from_config(config: PlayerConfig) -> Result<Self> {
        Self::open(Some(PlayerInit::Config(config)))
    }

    /// Create a player on the shared context.
    ///
    /// The init is checked before the context is acquired, so a bad init
    /// reports its own error even on a host without audio output.
    pub fn open(init: Option<PlayerInit>) -> Result<Self> {
        Self::open_on(init, DecodingContext::shared)
    }

    /// Check `init`, then create the player on the context `acquire` returns.
    fn open_on(
        init: Option<PlayerInit>,
        acquire: impl FnOnce() -> Result<Arc<DecodingContext>>,
    ) -> Result<Self> {
        let init = check_init(init)?;
        validate_source(&init.source())?;
        Self::new(&acquire()?, Some(init))
    }

    /// Start playback, or request it for when decoding completes.
    ///
    /// Calling this while already playing restarts from the beginning. After
    /// a failed load or decode it returns that failure.
    pub fn play(&self) -> Result<()> {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();

        match inner.state {
            PlayerState::Failed => Err(inner
                .error
                .clone()
                .unwrap_or_else(|| Error::Internal("player failed".to_string()))),
            PlayerState::Loading | PlayerState::Decoding => {
                inner.intent = PlayIntent::RequestedBeforeReady;
                drop(inner);
                shared.callbacks.register(start_pending(), shared);
                debug!("Player {}: play requested before ready", shared.id);
                Ok(())
            }
            PlayerState::Ready | PlayerState::Playing | PlayerState::Stopped => {
                shared.start_locked(&mut inner)
            }
        }
    }

    /// Stop playback. No-op if nothing is playing.
    ///
    /// A start requested before decoding completed, including auto-play, is
    /// left in place; use [`AudioPlayer::cancel`] to drop it.
    pub fn stop(&self) {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();

        let Some(source) = inner.active.take() else {
            trace!(
                "Player {}: stop with nothing playing (state: {:?})",
                shared.id,
                inner.state
            );
            return;
        };

        source.stop();
        inner.state = PlayerState::Stopped;
        inner.intent = PlayIntent::NotRequested;
        shared.emit(PlayerEvent::Stopped);
        info!("Player {} stopped", shared.id);
    }

    /// Drop a start requested before decoding completed.
    ///
    /// Returns whether one was pending. Active playback is not affected.
    pub fn cancel(&self) -> bool {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();
        if inner.intent != PlayIntent::RequestedBeforeReady {
            return false;
        }

        inner.intent = PlayIntent::NotRequested;
        drop(inner);
        shared.callbacks.clear();
        debug!("Player {}: pending start cancelled", shared.id);
        true
    }

    /// Wait until the source is decoded, or report why it never will be.
    pub async fn wait_until_ready(&self) -> Result<()> {
        let mut rx = self.shared.ready_tx.subscribe();
        let readiness = rx
            .wait_for(|r| *r != Readiness::Pending)
            .await
            .map_err(|_| Error::Internal("player closed".to_string()))?
            .clone();

        match readiness {
            Readiness::Ready => Ok(()),
            Readiness::Failed(e) => Err(e),
            Readiness::Pending => Err(Error::Internal("player still pending".to_string())),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.shared.id
    }

    pub fn state(&self) -> PlayerState {
        self.shared.inner.lock().state
    }

    pub fn intent(&self) -> PlayIntent {
        self.shared.inner.lock().intent
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    /// The context this player decodes and plays through.
    pub fn context(&self) -> &Arc<DecodingContext> {
        &self.shared.context
    }

    pub fn source(&self) -> &AudioSource {
        &self.shared.source
    }

    /// Full configuration, if the player was not built from a bare URL.
    pub fn config(&self) -> Option<&PlayerConfig> {
        match &self.shared.mode {
            Mode::Legacy => None,
            Mode::Configured { config, .. } => Some(config),
        }
    }

    /// The player's gain stage, if it has one.
    pub fn gain(&self) -> Option<&GainNode> {
        match &self.shared.mode {
            Mode::Legacy => None,
            Mode::Configured { gain, .. } => Some(gain),
        }
    }

    /// Decoded buffer, once available.
    pub fn buffer(&self) -> Option<DecodedBuffer> {
        self.shared.inner.lock().buffer.clone()
    }

    /// The volume the gain stage is heading to.
    pub fn volume(&self) -> Option<f32> {
        self.gain().map(GainNode::target)
    }

    /// Ramp to a new volume. Players built from a bare URL have no gain stage.
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        let gain = self.gain().ok_or_else(|| {
            Error::InvalidState("player was created without a gain stage".to_string())
        })?;

        let context = &self.shared.context;
        gain.set_target_at_time(
            sanitize_volume(volume),
            context.current_time(),
            context.gain_time_constant(),
        );
        debug!("Player {}: volume -> {volume}", self.shared.id);
        Ok(())
    }

    /// Whether the active source repeats. `None` if nothing is playing.
    pub fn is_looping(&self) -> Option<bool> {
        self.shared
            .inner
            .lock()
            .active
            .as_ref()
            .map(PlaybackSource::is_looping)
    }

    /// Take the next event without blocking.
    pub fn try_recv_event(&self) -> Option<PlayerEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block the calling thread until the next event arrives.
    pub fn recv_event(&self) -> Option<PlayerEvent> {
        self.event_rx.recv().ok()
    }

    /// Event receiver, for use with `crossbeam_channel::select!`.
    pub fn events(&self) -> &Receiver<PlayerEvent> {
        &self.event_rx
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();
        inner.closed = true;
        shared.callbacks.clear();

        if let Some(source) = inner.active.take() {
            source.stop();
        }
        debug!("Player {} dropped", shared.id);
    }
}

impl fmt::Debug for AudioPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("AudioPlayer")
            .field("id", &self.shared.id)
            .field("source", &self.shared.source)
            .field("state", &inner.state)
            .field("intent", &inner.intent)
            .finish_non_exhaustive()
    }
}

fn check_init(init: Option<PlayerInit>) -> Result<PlayerInit> {
    let init = init.ok_or(Error::ConfigurationMissing)?;
    init.ensure_present()?;
    Ok(init)
}

/// The deferred start run once decoding completes.
fn start_pending() -> Callback<PlayerShared> {
    Arc::new(PlayerShared::start_pending)
}

impl PlayerShared {
    fn emit(&self, event: PlayerEvent) {
        // The receiver lives in the handle; a closed channel means nobody listens.
        let _ = self.event_tx.send(event);
    }

    fn on_loaded(&self, bytes: usize) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed {
            return false;
        }
        inner.state = PlayerState::Decoding;
        drop(inner);

        debug!("Player {}: loaded {bytes} bytes", self.id);
        self.emit(PlayerEvent::Loaded { bytes });
        true
    }

    fn on_decoded(&self, buffer: DecodedBuffer) {
        let duration = buffer.duration();
        let pending = {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            inner.prepared = Some(self.make_source(buffer.clone()));
            inner.buffer = Some(buffer);
            inner.state = PlayerState::Ready;
            inner.intent == PlayIntent::RequestedBeforeReady
        };

        info!("Player {} ready ({:.2}s)", self.id, duration.as_secs_f64());
        self.emit(PlayerEvent::Decoded { duration });

        if pending {
            if let Some(this) = self.this.upgrade() {
                self.callbacks.register(start_pending(), &this);
                self.callbacks.execute();
            }
        }

        self.ready_tx.send_replace(Readiness::Ready);
    }

    fn fail(&self, err: Error) {
        error!("Player {} failed to load {}: {err}", self.id, self.source);

        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.state = PlayerState::Failed;
        inner.error = Some(err.clone());
        drop(inner);

        self.callbacks.clear();
        self.emit(PlayerEvent::Failed(err.clone()));
        self.ready_tx.send_replace(Readiness::Failed(err));
    }

    fn start_pending(&self) {
        let mut inner = self.inner.lock();
        if inner.closed || inner.intent != PlayIntent::RequestedBeforeReady {
            return;
        }
        if let Err(e) = self.start_locked(&mut inner) {
            error!("Player {}: deferred start failed: {e}", self.id);
        }
    }

    /// Start a fresh source, stopping any active one first.
    fn start_locked(&self, inner: &mut PlayerInner) -> Result<()> {
        let Some(buffer) = inner.buffer.clone() else {
            return Err(Error::InvalidState(format!(
                "player {} has no decoded buffer (state: {:?})",
                self.id, inner.state
            )));
        };

        if let Some(previous) = inner.active.take() {
            previous.stop();
            debug!("Player {}: restarting", self.id);
        }

        let source = inner
            .prepared
            .take()
            .unwrap_or_else(|| self.make_source(buffer));

        let source_id = source.id();
        let this = self.this.clone();
        source.on_ended(move || {
            if let Some(player) = this.upgrade() {
                player.on_source_ended(source_id);
            }
        });
        source.start()?;

        inner.active = Some(source);
        inner.state = PlayerState::Playing;
        inner.intent = PlayIntent::Playing;
        self.emit(PlayerEvent::Started);
        info!("Player {} playing", self.id);
        Ok(())
    }

    fn on_source_ended(&self, source_id: u64) {
        let mut inner = self.inner.lock();
        if inner.active.as_ref().map(PlaybackSource::id) != Some(source_id) {
            return;
        }
        inner.active = None;
        inner.state = PlayerState::Stopped;
        inner.intent = PlayIntent::NotRequested;
        drop(inner);

        debug!("Player {}: playback ended", self.id);
        self.emit(PlayerEvent::Ended);
    }

    fn make_source(&self, buffer: DecodedBuffer) -> PlaybackSource {
        let source = self.context.create_buffer_source(buffer);
        if let Mode::Configured { config, gain } = &self.mode {
            source.connect(gain);
            source.set_loop(config.loop_playback);
        }
        source
    }

    fn mime_hint(&self) -> Option<String> {
        self.source
            .mime_hint()
            .map(str::to_string)
            .or_else(|| self.format.map(|f| f.mime_type().to_string()))
    }
}

/// Load then decode, reporting to the player if it is still alive.
async fn run_pipeline(player: Weak<PlayerShared>, loader: Arc<dyn SourceLoader>) {
    let Some((source, context, mime_hint)) = player
        .upgrade()
        .map(|p| (p.source.clone(), Arc::clone(&p.context), p.mime_hint()))
    else {
        return;
    };

    let data = match loader.load(&source).await {
        Ok(data) => data,
        Err(e) => {
            if let Some(p) = player.upgrade() {
                p.fail(e);
            }
            return;
        }
    };

    match player.upgrade() {
        Some(p) if p.on_loaded(data.len()) => {}
        _ => {
            trace!("Player dropped before decode of {source}");
            return;
        }
    }

    let result = context.decode_audio_data(data, mime_hint).await;

    let Some(p) = player.upgrade() else {
        trace!("Player dropped during decode of {source}");
        return;
    };
    match result {
        Ok(buffer) => p.on_decoded(buffer),
        Err(e) => p.fail(e),
    }
}
