//! Presentation surfaces driven by playback plugins.
//!
//! Rendering itself belongs to the host: a notification shade entry and the
//! lock-screen transport controls. Plugins only push content through these
//! traits.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Reference to album artwork, either a bundled resource or a locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlbumArt {
    Resource(i32),
    Uri(String),
}

/// Text shown in the ongoing playback notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub text: String,
}

/// Host notification service.
pub trait NotificationSurface: Send + Sync {
    /// Post `content` and promote the hosting service to the foreground.
    fn show_foreground(&self, id: u32, content: &NotificationContent) -> Result<()>;

    /// Replace the content of an already visible notification.
    fn update(&self, id: u32, content: &NotificationContent) -> Result<()>;

    /// Remove the notification and leave the foreground.
    fn remove_foreground(&self, id: u32) -> Result<()>;
}

/// Playback state advertised on the lock screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemotePlaybackState {
    Playing,
    Paused,
    Stopped,
}

/// Batch of lock-screen metadata changes, applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEdit {
    /// Drop previously published fields before applying this edit.
    pub clear_existing: bool,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_art: Option<AlbumArt>,
    pub duration_ms: Option<u64>,
}

impl MetadataEdit {
    /// Start an edit that keeps already published fields.
    pub fn merge() -> Self {
        Self::default()
    }

    /// Start an edit that replaces everything published so far.
    pub fn replace() -> Self {
        Self {
            clear_existing: true,
            ..Self::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn album_art(mut self, art: AlbumArt) -> Self {
        self.album_art = Some(art);
        self
    }

    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Host lock-screen / remote transport controls.
pub trait RemoteControlSurface: Send + Sync {
    fn register(&self) -> Result<()>;

    fn unregister(&self) -> Result<()>;

    fn set_playback_state(&self, state: RemotePlaybackState) -> Result<()>;

    fn apply_metadata(&self, edit: MetadataEdit) -> Result<()>;
}
