//! # Event Router
//!
//! Ordered fan-out of playback lifecycle events to registered plugins.
//!
//! ## Guarantees
//!
//! - Plugins receive events in registration order.
//! - A plugin that returns an error or panics is logged and skipped; later
//!   plugins still receive the event and the controller never sees the fault.
//! - The same plugin handle (by pointer identity) is registered at most once.
//! - Registry changes requested while a dispatch is in flight (for example a
//!   plugin removing itself from inside a handler) are queued and applied
//!   once the outermost dispatch returns.
//!
//! The registry lock is never held while a plugin runs.

use crate::error::PlaybackError;
use crate::now_playing::Song;
use bridge_traits::AlbumArt;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Observer of playback lifecycle events.
///
/// Every handler defaults to a no-op, so plugins implement only what they
/// care about. Handlers run on the thread that produced the event and must
/// not block for long.
pub trait PlayerPlugin: Send + Sync {
    /// Name used in logs and fault reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn on_play(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_pause(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_resume(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_loading(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_song_changed(&self, _song: &Song) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_title_changed(&self, _title: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_artist_changed(&self, _artist: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_album_art_changed(&self, _art: &AlbumArt) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_duration_changed(&self, _duration_ms: u64) -> anyhow::Result<()> {
        Ok(())
    }
}

/// One lifecycle event, as routed to plugins.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginEvent {
    Play,
    Pause,
    Stop,
    Resume,
    Loading,
    SongChanged(Song),
    TitleChanged(String),
    ArtistChanged(String),
    AlbumArtChanged(AlbumArt),
    DurationChanged(u64),
}

impl PluginEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PluginEvent::Play => "on_play",
            PluginEvent::Pause => "on_pause",
            PluginEvent::Stop => "on_stop",
            PluginEvent::Resume => "on_resume",
            PluginEvent::Loading => "on_loading",
            PluginEvent::SongChanged(_) => "on_song_changed",
            PluginEvent::TitleChanged(_) => "on_title_changed",
            PluginEvent::ArtistChanged(_) => "on_artist_changed",
            PluginEvent::AlbumArtChanged(_) => "on_album_art_changed",
            PluginEvent::DurationChanged(_) => "on_duration_changed",
        }
    }

    fn deliver(&self, plugin: &dyn PlayerPlugin) -> anyhow::Result<()> {
        match self {
            PluginEvent::Play => plugin.on_play(),
            PluginEvent::Pause => plugin.on_pause(),
            PluginEvent::Stop => plugin.on_stop(),
            PluginEvent::Resume => plugin.on_resume(),
            PluginEvent::Loading => plugin.on_loading(),
            PluginEvent::SongChanged(song) => plugin.on_song_changed(song),
            PluginEvent::TitleChanged(title) => plugin.on_title_changed(title),
            PluginEvent::ArtistChanged(artist) => plugin.on_artist_changed(artist),
            PluginEvent::AlbumArtChanged(art) => plugin.on_album_art_changed(art),
            PluginEvent::DurationChanged(ms) => plugin.on_duration_changed(*ms),
        }
    }
}

/// Outcome of one dispatch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Plugins whose handler returned normally.
    pub delivered: usize,
    /// One [`PlaybackError::PluginFault`] per failing plugin.
    pub faults: Vec<PlaybackError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// What happened to a registry change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    Applied,
    /// Queued until the running dispatch completes.
    Deferred,
    /// Already registered (add) or not registered (remove).
    Unchanged,
}

enum PendingOp {
    Add(Arc<dyn PlayerPlugin>),
    Remove(Arc<dyn PlayerPlugin>),
}

#[derive(Default)]
struct Registry {
    plugins: Vec<Arc<dyn PlayerPlugin>>,
    dispatch_depth: usize,
    pending: Vec<PendingOp>,
}

impl Registry {
    fn position(&self, plugin: &Arc<dyn PlayerPlugin>) -> Option<usize> {
        self.plugins.iter().position(|p| same_plugin(p, plugin))
    }

    fn add(&mut self, plugin: Arc<dyn PlayerPlugin>) -> RegistryChange {
        if self.position(&plugin).is_some() {
            return RegistryChange::Unchanged;
        }
        debug!(plugin = plugin.name(), "plugin registered");
        self.plugins.push(plugin);
        RegistryChange::Applied
    }

    fn remove(&mut self, plugin: &Arc<dyn PlayerPlugin>) -> RegistryChange {
        match self.position(plugin) {
            Some(index) => {
                let removed = self.plugins.remove(index);
                debug!(plugin = removed.name(), "plugin removed");
                RegistryChange::Applied
            }
            None => RegistryChange::Unchanged,
        }
    }

    fn apply_pending(&mut self) {
        for op in std::mem::take(&mut self.pending) {
            match op {
                PendingOp::Add(plugin) => self.add(plugin),
                PendingOp::Remove(plugin) => self.remove(&plugin),
            };
        }
    }
}

/// Identity of a plugin handle, ignoring vtable metadata.
fn same_plugin(a: &Arc<dyn PlayerPlugin>, b: &Arc<dyn PlayerPlugin>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}

/// Ordered plugin registry with fault-isolated dispatch.
#[derive(Default)]
pub struct EventRouter {
    registry: Mutex<Registry>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` at the end of the dispatch order.
    pub fn add_plugin(&self, plugin: Arc<dyn PlayerPlugin>) -> RegistryChange {
        let mut registry = self.registry.lock();
        if registry.dispatch_depth > 0 {
            trace!(plugin = plugin.name(), "plugin registration deferred");
            registry.pending.push(PendingOp::Add(plugin));
            return RegistryChange::Deferred;
        }
        registry.add(plugin)
    }

    pub fn remove_plugin(&self, plugin: &Arc<dyn PlayerPlugin>) -> RegistryChange {
        let mut registry = self.registry.lock();
        if registry.dispatch_depth > 0 {
            trace!(plugin = plugin.name(), "plugin removal deferred");
            registry.pending.push(PendingOp::Remove(Arc::clone(plugin)));
            return RegistryChange::Deferred;
        }
        registry.remove(plugin)
    }

    pub fn contains(&self, plugin: &Arc<dyn PlayerPlugin>) -> bool {
        self.registry.lock().position(plugin).is_some()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every registered plugin, in order.
    pub fn dispatch(&self, event: &PluginEvent) -> DispatchReport {
        let plugins = {
            let mut registry = self.registry.lock();
            registry.dispatch_depth += 1;
            registry.plugins.clone()
        };

        let mut report = DispatchReport::default();
        for plugin in &plugins {
            let outcome = catch_unwind(AssertUnwindSafe(|| event.deliver(plugin.as_ref())));
            let message = match outcome {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    continue;
                }
                Ok(Err(error)) => format!("{error:#}"),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            warn!(
                plugin = plugin.name(),
                handler = event.name(),
                error = %message,
                "plugin fault"
            );
            report.faults.push(PlaybackError::PluginFault {
                plugin: plugin.name().to_string(),
                message,
            });
        }

        let mut registry = self.registry.lock();
        registry.dispatch_depth -= 1;
        if registry.dispatch_depth == 0 {
            registry.apply_pending();
        }
        report
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        let names: Vec<&str> = registry.plugins.iter().map(|p| p.name()).collect();
        f.debug_struct("EventRouter")
            .field("plugins", &names)
            .field("pending", &registry.pending.len())
            .finish()
    }
}
