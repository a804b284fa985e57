//! # Lock-Screen Controls
//!
//! Mirrors the transport state and song metadata onto a
//! [`RemoteControlSurface`]. Title and artist edits merge into the current
//! metadata; a new song replaces it, album art included.

use crate::focus::AudioFocus;
use crate::now_playing::Song;
use crate::router::PlayerPlugin;
use bridge_traits::{AlbumArt, MetadataEdit, RemoteControlSurface, RemotePlaybackState};
use parking_lot::Mutex;
use std::sync::Arc;

/// Drives the lock-screen transport controls.
///
/// Focus handling is delegated to the shared [`AudioFocus`], the same one the
/// controller uses.
pub struct LockScreenControlsPlugin {
    surface: Arc<dyn RemoteControlSurface>,
    focus: Arc<AudioFocus>,
    album_art: Mutex<Option<AlbumArt>>,
}

impl LockScreenControlsPlugin {
    pub fn new(surface: Arc<dyn RemoteControlSurface>, focus: Arc<AudioFocus>) -> Self {
        Self {
            surface,
            focus,
            album_art: Mutex::new(None),
        }
    }

    /// Artwork published with the next full metadata replace.
    pub fn album_art(&self) -> Option<AlbumArt> {
        self.album_art.lock().clone()
    }
}

impl PlayerPlugin for LockScreenControlsPlugin {
    fn name(&self) -> &str {
        "lock-screen"
    }

    fn on_play(&self) -> anyhow::Result<()> {
        self.focus.request()?;
        self.focus.register_media_buttons()?;
        self.surface.set_playback_state(RemotePlaybackState::Playing)?;
        self.surface.register()?;
        Ok(())
    }

    fn on_resume(&self) -> anyhow::Result<()> {
        self.focus.request()?;
        self.surface.set_playback_state(RemotePlaybackState::Playing)?;
        Ok(())
    }

    fn on_pause(&self) -> anyhow::Result<()> {
        self.focus.abandon()?;
        self.surface.set_playback_state(RemotePlaybackState::Paused)?;
        Ok(())
    }

    fn on_stop(&self) -> anyhow::Result<()> {
        self.focus.abandon()?;
        self.focus.unregister_media_buttons()?;
        self.surface.set_playback_state(RemotePlaybackState::Stopped)?;
        self.surface.unregister()?;
        Ok(())
    }

    fn on_duration_changed(&self, duration_ms: u64) -> anyhow::Result<()> {
        self.surface
            .apply_metadata(MetadataEdit::merge().duration_ms(duration_ms))?;
        Ok(())
    }

    fn on_song_changed(&self, song: &Song) -> anyhow::Result<()> {
        let art = {
            let mut stored = self.album_art.lock();
            if let Some(art) = &song.album_art {
                *stored = Some(art.clone());
            }
            stored.clone()
        };

        let mut edit = MetadataEdit::replace();
        edit.title = song.title.clone();
        edit.artist = song.artist.clone();
        edit.album_art = art;
        self.surface.apply_metadata(edit)?;
        Ok(())
    }

    fn on_title_changed(&self, title: &str) -> anyhow::Result<()> {
        self.surface.apply_metadata(MetadataEdit::merge().title(title))?;
        Ok(())
    }

    fn on_artist_changed(&self, artist: &str) -> anyhow::Result<()> {
        self.surface.apply_metadata(MetadataEdit::merge().artist(artist))?;
        Ok(())
    }

    fn on_album_art_changed(&self, art: &AlbumArt) -> anyhow::Result<()> {
        *self.album_art.lock() = Some(art.clone());
        self.surface
            .apply_metadata(MetadataEdit::merge().album_art(art.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{ArbitrationOutcome, ResourceArbiter, ResourceOwner};
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Arbiter {}

        impl ResourceArbiter for Arbiter {
            fn request(&self, owner: &ResourceOwner) -> BridgeResult<ArbitrationOutcome>;
            fn abandon(&self, owner: &ResourceOwner) -> BridgeResult<()>;
            fn register_media_buttons(&self, owner: &ResourceOwner) -> BridgeResult<()>;
            fn unregister_media_buttons(&self, owner: &ResourceOwner) -> BridgeResult<()>;
        }
    }

    mock! {
        Remote {}

        impl RemoteControlSurface for Remote {
            fn register(&self) -> BridgeResult<()>;
            fn unregister(&self) -> BridgeResult<()>;
            fn set_playback_state(&self, state: RemotePlaybackState) -> BridgeResult<()>;
            fn apply_metadata(&self, edit: MetadataEdit) -> BridgeResult<()>;
        }
    }

    fn permissive_focus() -> Arc<AudioFocus> {
        let mut arbiter = MockArbiter::new();
        arbiter
            .expect_request()
            .returning(|_| Ok(ArbitrationOutcome::Granted));
        arbiter.expect_abandon().returning(|_| Ok(()));
        arbiter.expect_register_media_buttons().returning(|_| Ok(()));
        arbiter.expect_unregister_media_buttons().returning(|_| Ok(()));
        Arc::new(AudioFocus::new(Arc::new(arbiter), ResourceOwner::new("t")))
    }

    #[test]
    fn play_and_stop_drive_surface_and_focus() {
        let mut remote = MockRemote::new();
        remote
            .expect_set_playback_state()
            .with(eq(RemotePlaybackState::Playing))
            .times(1)
            .returning(|_| Ok(()));
        remote.expect_register().times(1).returning(|| Ok(()));
        remote
            .expect_set_playback_state()
            .with(eq(RemotePlaybackState::Stopped))
            .times(1)
            .returning(|_| Ok(()));
        remote.expect_unregister().times(1).returning(|| Ok(()));

        let focus = permissive_focus();
        let plugin = LockScreenControlsPlugin::new(Arc::new(remote), Arc::clone(&focus));

        plugin.on_play().unwrap();
        assert!(focus.is_held());
        plugin.on_stop().unwrap();
        assert!(!focus.is_held());
    }

    #[test]
    fn song_change_replaces_metadata_with_stored_art() {
        let mut remote = MockRemote::new();
        remote
            .expect_apply_metadata()
            .withf(|edit| !edit.clear_existing && edit.album_art == Some(AlbumArt::Resource(3)))
            .times(1)
            .returning(|_| Ok(()));
        remote
            .expect_apply_metadata()
            .withf(|edit| {
                edit.clear_existing
                    && edit.title.as_deref() == Some("One")
                    && edit.artist.as_deref() == Some("Band")
                    && edit.album_art == Some(AlbumArt::Resource(3))
            })
            .times(1)
            .returning(|_| Ok(()));

        let plugin = LockScreenControlsPlugin::new(Arc::new(remote), permissive_focus());
        plugin.on_album_art_changed(&AlbumArt::Resource(3)).unwrap();
        plugin.on_song_changed(&Song::new("One", "Band")).unwrap();
        assert_eq!(plugin.album_art(), Some(AlbumArt::Resource(3)));
    }

    #[test]
    fn duration_is_merged() {
        let mut remote = MockRemote::new();
        remote
            .expect_apply_metadata()
            .with(eq(MetadataEdit::merge().duration_ms(180_000)))
            .times(1)
            .returning(|_| Ok(()));

        let plugin = LockScreenControlsPlugin::new(Arc::new(remote), permissive_focus());
        plugin.on_duration_changed(180_000).unwrap();
    }
}
