//! Ongoing "now playing" notification.

use crate::now_playing::Song;
use crate::router::PlayerPlugin;
use bridge_traits::{NotificationContent, NotificationSurface};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Notification id used unless the host picks its own.
pub const DEFAULT_NOTIFICATION_ID: u32 = 9_747_245;

struct Shown {
    content: NotificationContent,
    visible: bool,
}

/// Keeps an ongoing notification up while playing.
///
/// The notification goes to the foreground on play and is removed on stop.
/// Title and artist changes refresh it only while it is visible.
pub struct NotificationPlugin {
    surface: Arc<dyn NotificationSurface>,
    id: u32,
    shown: Mutex<Shown>,
}

impl NotificationPlugin {
    pub fn new(surface: Arc<dyn NotificationSurface>) -> Self {
        Self {
            surface,
            id: DEFAULT_NOTIFICATION_ID,
            shown: Mutex::new(Shown {
                content: NotificationContent {
                    title: "Now playing".to_string(),
                    text: String::new(),
                },
                visible: false,
            }),
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    /// Content shown until the first title or artist arrives.
    pub fn with_content(self, content: NotificationContent) -> Self {
        self.shown.lock().content = content;
        self
    }

    pub fn is_visible(&self) -> bool {
        self.shown.lock().visible
    }

    pub fn content(&self) -> NotificationContent {
        self.shown.lock().content.clone()
    }

    /// Apply `edit` and return the content to push, if visible.
    fn edit(&self, edit: impl FnOnce(&mut NotificationContent)) -> Option<NotificationContent> {
        let mut shown = self.shown.lock();
        edit(&mut shown.content);
        shown.visible.then(|| shown.content.clone())
    }

    fn refresh(&self, content: Option<NotificationContent>) -> anyhow::Result<()> {
        if let Some(content) = content {
            self.surface.update(self.id, &content)?;
        }
        Ok(())
    }
}

impl PlayerPlugin for NotificationPlugin {
    fn name(&self) -> &str {
        "notification"
    }

    fn on_play(&self) -> anyhow::Result<()> {
        let content = self.content();
        debug!(id = self.id, "showing playback notification");
        self.surface.show_foreground(self.id, &content)?;
        self.shown.lock().visible = true;
        Ok(())
    }

    fn on_stop(&self) -> anyhow::Result<()> {
        self.shown.lock().visible = false;
        self.surface.remove_foreground(self.id)?;
        Ok(())
    }

    fn on_title_changed(&self, title: &str) -> anyhow::Result<()> {
        self.refresh(self.edit(|content| content.title = title.to_string()))
    }

    fn on_artist_changed(&self, artist: &str) -> anyhow::Result<()> {
        self.refresh(self.edit(|content| content.text = artist.to_string()))
    }

    fn on_song_changed(&self, song: &Song) -> anyhow::Result<()> {
        self.refresh(self.edit(|content| {
            if let Some(title) = &song.title {
                content.title = title.clone();
            }
            if let Some(artist) = &song.artist {
                content.text = artist.clone();
            }
        }))
    }
}
