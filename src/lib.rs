//! Workspace facade crate.
//!
//! Exposes the workspace crates behind feature flags so a host can depend on
//! `coordinator-workspace` alone:
//!
//! - `runtime` - configuration, logging and the event bus (`core-runtime`)
//! - `playback` (default) - state machine and controller (`core-playback`)
//! - `plugins` - reference notification, audio-focus and lock-screen plugins
//!
//! Host contracts from `bridge-traits` are always available.

pub use bridge_traits as bridge;

#[cfg(feature = "runtime")]
pub use core_runtime as runtime;

#[cfg(feature = "playback")]
pub use core_playback as playback;

#[cfg(feature = "playback")]
pub use core_playback::{PlaybackController, PlaybackError, PlayerPlugin};

#[cfg(feature = "plugins")]
pub use core_playback::plugins;
