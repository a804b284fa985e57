//! Audio resource arbitration (audio focus).
//!
//! The platform decides which app may use the audio output. The core asks for
//! the resource when playback starts or resumes and gives it back on pause or
//! stop. The outcome is reported for logging only; the playback state machine
//! does not react to denials.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity presented to the arbiter. Requests and abandons for the same
/// owner must match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceOwner {
    id: Uuid,
    tag: String,
}

impl ResourceOwner {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tag: tag.into(),
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// Answer to a [`ResourceArbiter::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArbitrationOutcome {
    Granted,
    Denied,
    /// Granted later through a platform callback.
    Delayed,
}

/// Host adapter over the platform audio-focus service.
pub trait ResourceArbiter: Send + Sync {
    fn request(&self, owner: &ResourceOwner) -> Result<ArbitrationOutcome>;

    fn abandon(&self, owner: &ResourceOwner) -> Result<()>;

    /// Route hardware media buttons (headset, lock screen) to `owner`.
    fn register_media_buttons(&self, _owner: &ResourceOwner) -> Result<()> {
        Ok(())
    }

    fn unregister_media_buttons(&self, _owner: &ResourceOwner) -> Result<()> {
        Ok(())
    }
}
