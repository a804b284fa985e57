//! # Playback Controller
//!
//! Public playback surface built from the [`PlayerState`] machine, the
//! [`ProgressTicker`] and the [`EventRouter`].
//!
//! ## Locking
//!
//! All state lives in one [`Session`] behind a single mutex. Commands and
//! native callbacks mutate it under that lock and record the transitions they
//! caused; everything observable (bus events, plugin dispatch, listeners,
//! audio focus, the ticker) happens after the lock is released. Listeners and
//! plugins may therefore call back into the controller.
//!
//! ## Completion
//!
//! Natural completion is reported in two phases: the completion listener runs
//! while the machine still reads `PlaybackCompleted`, then the controller
//! stops and resets it to `Idle`. The cleanup is skipped only if the listener
//! started a new cycle (queueing the next track, for example); a listener
//! `stop()` is still followed by the reset.

use crate::bundle::Bundle;
use crate::error::{PlaybackError, Result};
use crate::focus::AudioFocus;
use crate::listener::Listeners;
use crate::now_playing::{NowPlaying, Song, NOTHING_PLAYING};
use crate::router::{EventRouter, PlayerPlugin, PluginEvent, RegistryChange};
use crate::state::{Operation, PlayerState};
use crate::ticker::{PositionSource, ProgressSink, ProgressTicker, TickSample};
use bridge_traits::{
    AlbumArt, DataSource, NativeEvent, NativeEventKind, NativePlayer, PlaybackState,
};
use core_runtime::events::{EventBus, EventStream, PlayerEvent};
use core_runtime::logging::redact_locator;
use core_runtime::PlayerConfig;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::Receiver;
use tracing::{debug, error, info, instrument, warn};

type Transition = (PlaybackState, PlaybackState);

/// Everything guarded by the controller lock.
struct Session<N> {
    player: PlayerState<N>,
    now_playing: Option<NowPlaying>,
    song: Song,
}

impl<N: NativePlayer> Session<N> {
    /// Run one state-machine command, recording the transition it caused
    /// (also when it failed into `Error`).
    fn apply<R>(
        &mut self,
        log: &mut Vec<Transition>,
        command: impl FnOnce(&mut PlayerState<N>) -> Result<R>,
    ) -> Result<R> {
        let from = self.player.state();
        let result = command(&mut self.player);
        let to = self.player.state();
        if from != to {
            log.push((from, to));
        }
        result
    }

    fn display(&self) -> String {
        self.now_playing
            .as_ref()
            .map(|np| np.display().to_string())
            .unwrap_or_else(|| NOTHING_PLAYING.to_string())
    }

    /// Start or resume according to the current state.
    fn begin_playback(&mut self, log: &mut Vec<Transition>) -> Result<PlayOutcome> {
        match self.player.state() {
            PlaybackState::Initialized | PlaybackState::Stopped => {
                self.apply(log, |p| p.prepare_async())?;
                Ok(PlayOutcome::Loading {
                    source: self.display(),
                })
            }
            PlaybackState::Prepared => {
                self.apply(log, |p| p.start())?;
                Ok(PlayOutcome::Started {
                    generation: self.player.generation(),
                    source: self.display(),
                    duration_ms: self.player.duration(),
                })
            }
            PlaybackState::Paused => {
                self.apply(log, |p| p.start())?;
                Ok(PlayOutcome::Resumed {
                    generation: self.player.generation(),
                    position_ms: self.player.current_position(),
                })
            }
            state => Err(PlaybackError::illegal(Operation::Start, state)),
        }
    }
}

enum PlayOutcome {
    Loading {
        source: String,
    },
    Started {
        generation: u64,
        source: String,
        duration_ms: u64,
    },
    Resumed {
        generation: u64,
        position_ms: u64,
    },
}

struct Inner<N> {
    session: Mutex<Session<N>>,
    listeners: Listeners,
    router: EventRouter,
    ticker: ProgressTicker,
    focus: Option<Arc<AudioFocus>>,
    events: EventBus,
    bundle: Mutex<Bundle>,
}

impl<N> Inner<N> {
    fn emit(&self, event: PlayerEvent) {
        // Nobody listening is not an error.
        let _ = self.events.emit(event);
    }

    fn publish_transitions(&self, transitions: &[Transition]) {
        for &(from, to) in transitions {
            self.emit(PlayerEvent::StateChanged { from, to });
        }
    }

    fn dispatch(&self, event: PluginEvent) {
        let report = self.router.dispatch(&event);
        if !report.is_clean() {
            debug!(
                handler = event.name(),
                faults = report.faults.len(),
                "dispatch finished with plugin faults"
            );
        }
    }

    fn request_focus(&self) {
        if let Some(focus) = &self.focus {
            if let Err(error) = focus.request() {
                warn!(%error, "audio focus request failed");
            }
        }
    }

    fn abandon_focus(&self) {
        if let Some(focus) = &self.focus {
            if let Err(error) = focus.abandon() {
                warn!(%error, "audio focus abandon failed");
            }
        }
    }
}

impl<N: NativePlayer + 'static> Inner<N> {
    fn start_ticker(self: &Arc<Self>, generation: u64) {
        let source: Arc<dyn PositionSource> = Arc::new(SessionProbe {
            inner: Arc::downgrade(self),
        });
        let sink: Arc<dyn ProgressSink> = Arc::new(self.events.clone());
        self.ticker.start(generation, source, sink);
    }
}

/// Ticker view of the session. Holds no strong reference, so a dropped
/// controller ends its ticker.
struct SessionProbe<N> {
    inner: Weak<Inner<N>>,
}

impl<N: NativePlayer + 'static> PositionSource for SessionProbe<N> {
    fn sample(&self, generation: u64) -> TickSample {
        let Some(inner) = self.inner.upgrade() else {
            return TickSample::Finish;
        };
        let session = inner.session.lock();
        let player = &session.player;
        if player.generation() != generation {
            return TickSample::Finish;
        }
        match player.state() {
            PlaybackState::Started => TickSample::Report {
                position_ms: player.current_position(),
                duration_ms: player.duration(),
            },
            PlaybackState::Paused | PlaybackState::Prepared | PlaybackState::Preparing => {
                TickSample::Skip
            }
            _ => TickSample::Finish,
        }
    }
}

/// Coordinates one native player on behalf of callers, the host's native
/// callback thread and the progress ticker.
///
/// Cloning yields another handle to the same player.
pub struct PlaybackController<N> {
    inner: Arc<Inner<N>>,
}

impl<N> Clone for PlaybackController<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N: NativePlayer + 'static> PlaybackController<N> {
    pub fn new(native: N, config: &PlayerConfig) -> Self {
        let focus = config.resource_arbiter().map(|arbiter| {
            Arc::new(AudioFocus::new(
                Arc::clone(arbiter),
                config.owner().clone(),
            ))
        });
        let ticker = ProgressTicker::new(config.progress_interval(), config.runtime().clone());

        info!(
            owner = config.owner().tag(),
            interval_ms = config.settings().progress_interval_ms,
            focus = focus.is_some(),
            "playback controller created"
        );

        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session {
                    player: PlayerState::new(native),
                    now_playing: None,
                    song: Song::default(),
                }),
                listeners: Listeners::default(),
                router: EventRouter::new(),
                ticker,
                focus,
                events: config.event_bus().clone(),
                bundle: Mutex::new(Bundle::new()),
            }),
        }
    }

    fn with_session<R>(
        &self,
        f: impl FnOnce(&mut Session<N>, &mut Vec<Transition>) -> Result<R>,
    ) -> Result<R> {
        let mut transitions = Vec::new();
        let result = {
            let mut session = self.inner.session.lock();
            f(&mut session, &mut transitions)
        };
        self.inner.publish_transitions(&transitions);
        result
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Load `source` and start preparing it, discarding whatever was loaded.
    #[instrument(skip_all, fields(source = %redact_locator(&source.display_name())))]
    pub fn play_source(&self, source: DataSource) -> Result<()> {
        self.inner.ticker.cancel();
        let outcome = self.with_session(|session, log| {
            if session.player.state() != PlaybackState::Idle {
                session.apply(log, |p| p.reset())?;
            }
            session.now_playing = Some(NowPlaying::new(source.clone()));
            session.apply(log, |p| p.set_source(&source))?;
            session.begin_playback(log)
        })?;
        self.finish_play(outcome);
        Ok(())
    }

    /// Start, resume, or begin preparing the loaded source.
    #[instrument(skip(self))]
    pub fn play(&self) -> Result<()> {
        let outcome = self.with_session(|session, log| session.begin_playback(log))?;
        self.finish_play(outcome);
        Ok(())
    }

    fn finish_play(&self, outcome: PlayOutcome) {
        let inner = &self.inner;
        match outcome {
            PlayOutcome::Loading { source } => {
                inner.ticker.cancel();
                info!(source = %redact_locator(&source), "preparing source");
                inner.emit(PlayerEvent::Loading { source });
                inner.dispatch(PluginEvent::Loading);
            }
            PlayOutcome::Started {
                generation,
                source,
                duration_ms,
            } => {
                inner.emit(PlayerEvent::Started {
                    source,
                    duration_ms,
                });
                inner.dispatch(PluginEvent::Play);
                inner.request_focus();
                inner.start_ticker(generation);
            }
            PlayOutcome::Resumed {
                generation,
                position_ms,
            } => {
                inner.emit(PlayerEvent::Resumed { position_ms });
                inner.dispatch(PluginEvent::Resume);
                inner.request_focus();
                inner.start_ticker(generation);
            }
        }
    }

    #[instrument(skip(self))]
    pub fn pause(&self) -> Result<()> {
        let (from, position_ms) = self.with_session(|session, log| {
            let from = session.player.state();
            session.apply(log, |p| p.pause())?;
            Ok((from, session.player.current_position()))
        })?;

        if from == PlaybackState::Started {
            self.inner.emit(PlayerEvent::Paused { position_ms });
            self.inner.dispatch(PluginEvent::Pause);
            self.inner.abandon_focus();
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn stop(&self) -> Result<()> {
        let from = self.with_session(|session, log| {
            let from = session.player.state();
            session.apply(log, |p| p.stop())?;
            Ok(from)
        })?;

        self.inner.ticker.cancel();
        if from != PlaybackState::Stopped {
            self.inner.emit(PlayerEvent::Stopped);
            self.inner.dispatch(PluginEvent::Stop);
            self.inner.abandon_focus();
        }
        Ok(())
    }

    /// Seek to `position_ms`. The state in effect before the seek returns
    /// once the native player confirms it.
    #[instrument(skip(self))]
    pub fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.with_session(|session, log| session.apply(log, |p| p.seek_to(position_ms)))
    }

    #[instrument(skip(self))]
    pub fn set_volume(&self, left: f32, right: f32) -> Result<()> {
        self.with_session(|session, log| session.apply(log, |p| p.set_volume(left, right)))
    }

    /// Free the native player. The controller is unusable afterwards;
    /// releasing again is a no-op.
    #[instrument(skip(self))]
    pub fn release(&self) -> Result<()> {
        self.inner.ticker.cancel();
        self.with_session(|session, log| {
            session.apply(log, |p| p.release())?;
            session.now_playing = None;
            Ok(())
        })?;
        self.inner.abandon_focus();
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> PlaybackState {
        self.inner.session.lock().player.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Started
    }

    /// Position in milliseconds; 0 when the state has none.
    pub fn current_position(&self) -> u64 {
        self.inner.session.lock().player.current_position()
    }

    /// Duration in milliseconds; 0 when the state has none.
    pub fn duration(&self) -> u64 {
        self.inner.session.lock().player.duration()
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.inner.session.lock().now_playing.clone()
    }

    /// Display string of the loaded source, `"<#null>"` when nothing is loaded.
    pub fn now_playing_display(&self) -> String {
        self.inner.session.lock().display()
    }

    pub fn is_ticker_running(&self) -> bool {
        self.inner.ticker.is_running()
    }

    pub fn audio_focus(&self) -> Option<Arc<AudioFocus>> {
        self.inner.focus.clone()
    }

    // ========================================================================
    // Song metadata
    // ========================================================================

    pub fn song(&self) -> Song {
        self.inner.session.lock().song.clone()
    }

    pub fn set_song(&self, song: Song) {
        self.replace_song(|_| song.clone());
        self.inner.dispatch(PluginEvent::SongChanged(song));
    }

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        self.replace_song(|song| song.clone().with_title(title.clone()));
        self.inner.dispatch(PluginEvent::TitleChanged(title));
    }

    pub fn set_artist(&self, artist: impl Into<String>) {
        let artist = artist.into();
        self.replace_song(|song| song.clone().with_artist(artist.clone()));
        self.inner.dispatch(PluginEvent::ArtistChanged(artist));
    }

    pub fn set_album_art(&self, art: AlbumArt) {
        self.replace_song(|song| song.clone().with_album_art(art.clone()));
        self.inner.dispatch(PluginEvent::AlbumArtChanged(art));
    }

    fn replace_song(&self, next: impl FnOnce(&Song) -> Song) {
        let song = {
            let mut session = self.inner.session.lock();
            session.song = next(&session.song);
            session.song.clone()
        };
        self.inner.emit(PlayerEvent::SongChanged {
            title: song.title,
            artist: song.artist,
        });
    }

    // ========================================================================
    // Now-playing bundle
    // ========================================================================

    /// Last committed bundle.
    pub fn bundle(&self) -> Bundle {
        self.inner.bundle.lock().clone()
    }

    pub fn commit_bundle(&self, bundle: Bundle) {
        debug!(entries = bundle.len(), "bundle committed");
        *self.inner.bundle.lock() = bundle;
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn set_on_prepared_listener(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.inner.listeners.prepared.replace(Some(Arc::new(listener)));
    }

    pub fn set_on_completion_listener(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.inner
            .listeners
            .completion
            .replace(Some(Arc::new(listener)));
    }

    pub fn set_on_seek_complete_listener(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.inner
            .listeners
            .seek_complete
            .replace(Some(Arc::new(listener)));
    }

    /// The listener returns `true` to consume the error; otherwise it is
    /// logged as unhandled.
    pub fn set_on_error_listener(
        &self,
        listener: impl Fn(i32, i32) -> bool + Send + Sync + 'static,
    ) {
        self.inner.listeners.error.replace(Some(Arc::new(listener)));
    }

    pub fn set_on_buffering_update_listener(
        &self,
        listener: impl Fn(u8) + Send + Sync + 'static,
    ) {
        self.inner
            .listeners
            .buffering
            .replace(Some(Arc::new(listener)));
    }

    pub fn set_on_info_listener(&self, listener: impl Fn(i32, i32) + Send + Sync + 'static) {
        self.inner.listeners.info.replace(Some(Arc::new(listener)));
    }

    pub fn clear_listeners(&self) {
        self.inner.listeners.clear();
    }

    // ========================================================================
    // Plugins and events
    // ========================================================================

    pub fn add_plugin(&self, plugin: Arc<dyn PlayerPlugin>) -> RegistryChange {
        self.inner.router.add_plugin(plugin)
    }

    pub fn remove_plugin(&self, plugin: &Arc<dyn PlayerPlugin>) -> RegistryChange {
        self.inner.router.remove_plugin(plugin)
    }

    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.inner.events.subscribe()
    }

    pub fn events(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    // ========================================================================
    // Native callbacks
    // ========================================================================

    /// Entry point for callbacks raised by the native player. Safe to call
    /// from any thread; callbacks from a superseded cycle are dropped.
    pub fn handle_native_event(&self, event: NativeEvent) {
        let folded = self.inner.session.lock().player.fold(&event);
        let Some(folded) = folded else {
            return;
        };
        if folded.changed() {
            self.inner.publish_transitions(&[(folded.from, folded.to)]);
        }

        match folded.kind {
            NativeEventKind::Prepared => self.on_prepared(folded.generation),
            NativeEventKind::PlaybackCompleted => self.on_completed(folded.generation),
            NativeEventKind::SeekCompleted => self.inner.listeners.notify_seek_complete(),
            NativeEventKind::Error { what, extra } => self.on_native_error(what, extra),
            NativeEventKind::BufferingUpdate { percent } => {
                self.inner.listeners.notify_buffering(percent);
                self.inner.emit(PlayerEvent::Buffering { percent });
            }
            NativeEventKind::Info { what, extra } => self.inner.listeners.notify_info(what, extra),
        }
    }

    fn on_prepared(&self, generation: u64) {
        let mut transitions = Vec::new();
        let started = {
            let mut session = self.inner.session.lock();
            if session.player.generation() != generation
                || session.player.state() != PlaybackState::Prepared
            {
                None
            } else {
                match session.apply(&mut transitions, |p| p.start()) {
                    Ok(()) => Some((
                        session.display(),
                        session.player.current_position(),
                        session.player.duration(),
                    )),
                    Err(error) => {
                        warn!(%error, "could not start prepared source");
                        None
                    }
                }
            }
        };
        self.inner.publish_transitions(&transitions);

        if let Some((source, position_ms, duration_ms)) = started {
            info!(source = %redact_locator(&source), duration_ms, "playback started");
            self.inner.emit(PlayerEvent::Started {
                source,
                duration_ms,
            });
            self.inner.dispatch(PluginEvent::Play);
            self.inner.dispatch(PluginEvent::DurationChanged(duration_ms));
            self.inner.emit(PlayerEvent::Progress {
                position_ms,
                duration_ms,
            });
            self.inner.request_focus();
            self.inner.start_ticker(generation);
        }
        self.inner.listeners.notify_prepared();
    }

    fn on_completed(&self, generation: u64) {
        self.inner.emit(PlayerEvent::Completed);
        self.inner.listeners.notify_completion();

        let transitions = {
            let mut session = self.inner.session.lock();
            let transitions = session.player.finish_completion(generation);
            if !transitions.is_empty() {
                session.now_playing = None;
            }
            transitions
        };
        if transitions.is_empty() {
            debug!("completion cleanup superseded by a new cycle");
            return;
        }

        self.inner.publish_transitions(&transitions);
        self.inner.ticker.cancel();
        // A listener `stop()` has already dispatched and abandoned focus.
        if transitions[0].0 != PlaybackState::Stopped {
            self.inner.dispatch(PluginEvent::Stop);
            self.inner.abandon_focus();
        }
    }

    fn on_native_error(&self, what: i32, extra: i32) {
        self.inner.ticker.cancel();
        let consumed = self.inner.listeners.notify_error(what, extra);
        if !consumed {
            let error = PlaybackError::NativePlayback { what, extra };
            error!(%error, "unhandled native playback error");
        }
        self.inner.emit(PlayerEvent::Error {
            what,
            extra,
            consumed,
        });
    }
}

impl<N> fmt::Debug for PlaybackController<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.inner.session.lock();
        f.debug_struct("PlaybackController")
            .field("player", &session.player)
            .field("now_playing", &session.now_playing)
            .field("router", &self.inner.router)
            .finish()
    }
}
