//! # Player Configuration
//!
//! Builder-based configuration for the playback core.
//!
//! ## Overview
//!
//! [`PlayerConfig`] bundles plain settings ([`PlayerSettings`], serde-friendly so
//! hosts can ship them as JSON) with the live capabilities the controller needs:
//! the tokio runtime that drives the progress ticker, an optional
//! [`ResourceArbiter`] and the event bus.
//!
//! The builder validates everything up front. A controller is never created
//! from a half-valid configuration.
//!
//! ## Required capabilities
//!
//! - tokio runtime handle - taken from the ambient runtime when not supplied
//!
//! ## Optional capabilities
//!
//! - `ResourceArbiter` - audio focus; without it arbitration is skipped
//! - `EventBus` - share an existing bus; a new one is created otherwise
//!
//! ## Usage
//!
//! ```no_run
//! use core_runtime::config::PlayerConfig;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = PlayerConfig::builder()
//!     .progress_interval(Duration::from_millis(500))
//!     .owner_tag("podcast-player")
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.progress_interval(), Duration::from_millis(500));
//! # }
//! ```

use crate::error::{Error, Result};
use crate::events::{EventBus, DEFAULT_EVENT_BUFFER_SIZE};
use bridge_traits::{ResourceArbiter, ResourceOwner};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Default progress sampling period.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 1_000;

/// Shortest accepted progress sampling period.
pub const MIN_PROGRESS_INTERVAL_MS: u64 = 50;

/// Longest accepted progress sampling period.
pub const MAX_PROGRESS_INTERVAL_MS: u64 = 60_000;

/// Tag presented to the resource arbiter when none is configured.
pub const DEFAULT_OWNER_TAG: &str = "playback-core";

/// Plain-data part of the configuration.
///
/// Missing fields take their defaults when deserialized:
///
/// ```
/// use core_runtime::config::PlayerSettings;
///
/// let settings: PlayerSettings = serde_json::from_str(r#"{"progress_interval_ms": 250}"#).unwrap();
/// assert_eq!(settings.progress_interval_ms, 250);
/// assert_eq!(settings.event_buffer_size, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Progress sampling period in milliseconds.
    pub progress_interval_ms: u64,

    /// Per-subscriber buffer of the event bus.
    pub event_buffer_size: usize,

    /// Name presented to the resource arbiter.
    pub owner_tag: String,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            owner_tag: DEFAULT_OWNER_TAG.to_string(),
        }
    }
}

impl PlayerSettings {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.progress_interval_ms < MIN_PROGRESS_INTERVAL_MS {
            return Err(Error::Config(format!(
                "Progress interval must be at least {}ms, got {}ms",
                MIN_PROGRESS_INTERVAL_MS, self.progress_interval_ms
            )));
        }

        if self.progress_interval_ms > MAX_PROGRESS_INTERVAL_MS {
            return Err(Error::Config(format!(
                "Progress interval exceeds maximum of {}ms, got {}ms",
                MAX_PROGRESS_INTERVAL_MS, self.progress_interval_ms
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.owner_tag.trim().is_empty() {
            return Err(Error::Config("Owner tag cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Validated configuration handed to the playback controller.
#[derive(Clone)]
pub struct PlayerConfig {
    settings: PlayerSettings,
    owner: ResourceOwner,
    resource_arbiter: Option<Arc<dyn ResourceArbiter>>,
    event_bus: EventBus,
    runtime: Handle,
}

impl fmt::Debug for PlayerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerConfig")
            .field("settings", &self.settings)
            .field("owner", &self.owner)
            .field(
                "resource_arbiter",
                &self
                    .resource_arbiter
                    .as_ref()
                    .map(|_| "ResourceArbiter { ... }"),
            )
            .field("event_bus", &self.event_bus)
            .finish()
    }
}

impl PlayerConfig {
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.settings.progress_interval_ms)
    }

    /// Identity used for every request/abandon pair.
    pub fn owner(&self) -> &ResourceOwner {
        &self.owner
    }

    pub fn resource_arbiter(&self) -> Option<&Arc<dyn ResourceArbiter>> {
        self.resource_arbiter.as_ref()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Runtime the progress ticker is spawned on.
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

/// Builder for [`PlayerConfig`].
#[derive(Default)]
pub struct PlayerConfigBuilder {
    settings: PlayerSettings,
    resource_arbiter: Option<Arc<dyn ResourceArbiter>>,
    event_bus: Option<EventBus>,
    runtime: Option<Handle>,
}

impl PlayerConfigBuilder {
    /// Replace all plain settings at once, e.g. after deserializing them.
    pub fn settings(mut self, settings: PlayerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the progress sampling period.
    ///
    /// Default: 1000 ms. Valid range: 50 ms to 60 s.
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.settings.progress_interval_ms =
            u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.settings.event_buffer_size = size;
        self
    }

    pub fn owner_tag(mut self, tag: impl Into<String>) -> Self {
        self.settings.owner_tag = tag.into();
        self
    }

    /// Sets the audio-focus arbiter (optional).
    pub fn resource_arbiter(mut self, arbiter: Arc<dyn ResourceArbiter>) -> Self {
        self.resource_arbiter = Some(arbiter);
        self
    }

    /// Publish into an existing bus instead of creating one.
    ///
    /// The bus keeps its own capacity; `event_buffer_size` is ignored.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Sets the runtime that drives the progress ticker.
    ///
    /// Defaults to the runtime the builder is called from.
    pub fn runtime_handle(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Builds the final `PlayerConfig`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when a setting is out of range
    /// - [`Error::CapabilityMissing`] when no runtime handle was given and the
    ///   builder is not running inside a tokio runtime
    pub fn build(self) -> Result<PlayerConfig> {
        self.settings.validate()?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| {
                Error::capability_missing(
                    "TokioRuntime",
                    "The progress ticker needs a tokio runtime. Build the config from \
                     inside a runtime or pass one with .runtime_handle().",
                )
            })?,
        };

        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::new(self.settings.event_buffer_size));

        Ok(PlayerConfig {
            owner: ResourceOwner::new(self.settings.owner_tag.clone()),
            settings: self.settings,
            resource_arbiter: self.resource_arbiter,
            event_bus,
            runtime,
        })
    }
}
