//! Audio focus plugin.
//!
//! Requests focus on play and resume, gives it back on pause and stop, and
//! keeps media-button routing registered while a stream is loaded.

use crate::focus::AudioFocus;
use crate::router::PlayerPlugin;
use std::sync::Arc;

/// Requests audio focus while playing and routes media buttons to the player.
pub struct AudioFocusPlugin {
    focus: Arc<AudioFocus>,
}

impl AudioFocusPlugin {
    pub fn new(focus: Arc<AudioFocus>) -> Self {
        Self { focus }
    }
}

impl PlayerPlugin for AudioFocusPlugin {
    fn name(&self) -> &str {
        "audio-focus"
    }

    fn on_play(&self) -> anyhow::Result<()> {
        self.focus.request()?;
        self.focus.register_media_buttons()?;
        Ok(())
    }

    fn on_resume(&self) -> anyhow::Result<()> {
        self.focus.request()?;
        Ok(())
    }

    fn on_pause(&self) -> anyhow::Result<()> {
        self.focus.abandon()?;
        Ok(())
    }

    fn on_stop(&self) -> anyhow::Result<()> {
        self.focus.abandon()?;
        self.focus.unregister_media_buttons()?;
        Ok(())
    }
}
