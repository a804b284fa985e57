//! Native player bridge and the playback vocabulary shared with hosts.
//!
//! The host wraps its platform media primitive (Android `MediaPlayer`,
//! `AVPlayer`, ...) in a [`NativePlayer`] implementation. Commands are plain
//! synchronous calls; completions arrive later as [`NativeEvent`]s which the
//! host delivers back to the core from whatever thread the platform uses.
//!
//! Every callback carries the [`CallbackToken`] that was handed to
//! [`NativePlayer::set_source`] for the current cycle. The core uses it to
//! discard callbacks that belong to a cycle it has already reset.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::sync::Arc;

/// Lifecycle state of a wrapped native player.
///
/// Exactly one state is active at a time per player instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Initialized,
    Preparing,
    Prepared,
    Started,
    Paused,
    Stopped,
    PlaybackCompleted,
    Error,
    /// Terminal: the native resources are gone.
    Released,
}

impl PlaybackState {
    /// Every state, in declaration order.
    pub const ALL: [PlaybackState; 10] = [
        PlaybackState::Idle,
        PlaybackState::Initialized,
        PlaybackState::Preparing,
        PlaybackState::Prepared,
        PlaybackState::Started,
        PlaybackState::Paused,
        PlaybackState::Stopped,
        PlaybackState::PlaybackCompleted,
        PlaybackState::Error,
        PlaybackState::Released,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Released)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Initialized => "initialized",
            PlaybackState::Preparing => "preparing",
            PlaybackState::Prepared => "prepared",
            PlaybackState::Started => "started",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
            PlaybackState::PlaybackCompleted => "playback_completed",
            PlaybackState::Error => "error",
            PlaybackState::Released => "released",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of locator a [`DataSource`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Remote stream addressed by URL.
    Network,
    /// Already-open local file handle.
    File,
}

/// Where the native player reads audio from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Remote stream (HTTP(S), RTSP, ...).
    Network { url: String },
    /// Open file handle owned jointly with the caller.
    File {
        file: Arc<File>,
        /// Human-readable label, typically the file name.
        label: String,
    },
}

impl DataSource {
    pub fn url(url: impl Into<String>) -> Self {
        DataSource::Network { url: url.into() }
    }

    pub fn file(file: Arc<File>, label: impl Into<String>) -> Self {
        DataSource::File {
            file,
            label: label.into(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            DataSource::Network { .. } => SourceKind::Network,
            DataSource::File { .. } => SourceKind::File,
        }
    }

    /// String shown to users for this source.
    pub fn display_name(&self) -> String {
        match self {
            DataSource::Network { url } => url.clone(),
            DataSource::File { label, .. } => label.clone(),
        }
    }
}

impl PartialEq for DataSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DataSource::Network { url: a }, DataSource::Network { url: b }) => a == b,
            (
                DataSource::File { file: a, label: la },
                DataSource::File { file: b, label: lb },
            ) => Arc::ptr_eq(a, b) && la == lb,
            _ => false,
        }
    }
}

/// Correlates asynchronous callbacks with the preparation cycle they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackToken(u64);

impl CallbackToken {
    pub fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Asynchronous notifications raised by the native player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum NativeEventKind {
    Prepared,
    PlaybackCompleted,
    SeekCompleted,
    /// Platform error codes, passed through untouched.
    Error { what: i32, extra: i32 },
    BufferingUpdate { percent: u8 },
    Info { what: i32, extra: i32 },
}

/// A native callback tagged with the cycle it was raised for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeEvent {
    pub token: CallbackToken,
    pub kind: NativeEventKind,
}

impl NativeEvent {
    pub fn new(token: CallbackToken, kind: NativeEventKind) -> Self {
        Self { token, kind }
    }
}

/// Host adapter over the platform media primitive.
///
/// Implementations only execute the command; legality is enforced by the
/// core before any method is called. Commands that finish asynchronously
/// (`prepare_async`, `seek_to`) report completion through [`NativeEvent`]s
/// carrying the token last passed to `set_source`.
pub trait NativePlayer: Send {
    /// Attach a data source. The token must be echoed on every callback until
    /// the next `reset`.
    fn set_source(&mut self, source: &DataSource, token: CallbackToken) -> Result<()>;

    /// Prepare synchronously; returns once the source can be started.
    fn prepare(&mut self) -> Result<()>;

    /// Begin preparation; completion arrives as [`NativeEventKind::Prepared`].
    fn prepare_async(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Begin a seek; completion arrives as [`NativeEventKind::SeekCompleted`].
    fn seek_to(&mut self, position_ms: u64) -> Result<()>;

    fn current_position(&self) -> u64;

    fn duration(&self) -> u64;

    fn set_volume(&mut self, left: f32, right: f32) -> Result<()>;

    /// Return the primitive to its uninitialized state.
    fn reset(&mut self);

    /// Free native resources. No further calls follow.
    fn release(&mut self);
}
