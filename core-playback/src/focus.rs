//! Audio focus held on behalf of one player.
//!
//! [`AudioFocus`] pairs a [`ResourceArbiter`] with the [`ResourceOwner`] the
//! controller was configured with, so every request and abandon uses the same
//! identity. It is shared by reference between the controller and plugins
//! that need focus (lock-screen controls), rather than each re-implementing
//! the arbitration calls.
//!
//! The arbitration outcome is only logged. Playback proceeds on `Denied`.

use crate::error::Result;
use bridge_traits::{ArbitrationOutcome, ResourceArbiter, ResourceOwner};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AudioFocus {
    arbiter: Arc<dyn ResourceArbiter>,
    owner: ResourceOwner,
    held: AtomicBool,
}

impl AudioFocus {
    pub fn new(arbiter: Arc<dyn ResourceArbiter>, owner: ResourceOwner) -> Self {
        Self {
            arbiter,
            owner,
            held: AtomicBool::new(false),
        }
    }

    pub fn owner(&self) -> &ResourceOwner {
        &self.owner
    }

    /// Whether the last request was granted and not yet abandoned.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    pub fn request(&self) -> Result<ArbitrationOutcome> {
        let outcome = self.arbiter.request(&self.owner)?;
        match outcome {
            ArbitrationOutcome::Granted => {
                self.held.store(true, Ordering::Release);
                debug!(owner = self.owner.tag(), "audio focus granted");
            }
            ArbitrationOutcome::Delayed => {
                info!(owner = self.owner.tag(), "audio focus delayed");
            }
            ArbitrationOutcome::Denied => {
                warn!(owner = self.owner.tag(), "audio focus denied, playing anyway");
            }
        }
        Ok(outcome)
    }

    /// Give focus back. Always forwarded, even if the last request was not
    /// granted, so a delayed grant is cancelled too.
    pub fn abandon(&self) -> Result<()> {
        self.held.store(false, Ordering::Release);
        self.arbiter.abandon(&self.owner)?;
        debug!(owner = self.owner.tag(), "audio focus abandoned");
        Ok(())
    }

    pub fn register_media_buttons(&self) -> Result<()> {
        self.arbiter.register_media_buttons(&self.owner)?;
        Ok(())
    }

    pub fn unregister_media_buttons(&self) -> Result<()> {
        self.arbiter.unregister_media_buttons(&self.owner)?;
        Ok(())
    }
}

impl fmt::Debug for AudioFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFocus")
            .field("owner", &self.owner)
            .field("held", &self.is_held())
            .finish()
    }
}
