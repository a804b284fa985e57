//! What is loaded and what it is called.
//!
//! [`NowPlaying`] describes the source handed to the native player; it lives
//! from `play(source)` until the next reset. [`Song`] is display metadata the
//! host pushes independently. Both are immutable snapshots: every change
//! replaces the whole value.

use bridge_traits::{AlbumArt, DataSource, SourceKind};
use serde::{Deserialize, Serialize};

/// Display string reported when nothing is loaded.
pub const NOTHING_PLAYING: &str = "<#null>";

/// The source currently attached to the native player.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    display: String,
    source: DataSource,
}

impl NowPlaying {
    pub fn new(source: DataSource) -> Self {
        Self {
            display: source.display_name(),
            source,
        }
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }
}

/// Track metadata shown on the notification and lock screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album_art: Option<AlbumArt>,
}

impl Song {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            artist: Some(artist.into()),
            album_art: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    pub fn with_album_art(mut self, art: AlbumArt) -> Self {
        self.album_art = Some(art);
        self
    }
}
