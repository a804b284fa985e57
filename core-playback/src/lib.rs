//! # Playback Coordination Module
//!
//! Wraps a host's native media player in an explicit state machine and
//! coordinates everything that reacts to it.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback state machine and its legality table
//! - Folding asynchronous native callbacks back into state
//! - Periodic progress reporting while a stream plays
//! - Fault-isolated dispatch of lifecycle events to plugins
//! - Reference plugins for notifications, lock-screen controls and audio focus
//!   (feature `plugins`)

pub mod bundle;
pub mod controller;
pub mod error;
pub mod focus;
pub mod listener;
pub mod now_playing;
#[cfg(feature = "plugins")]
pub mod plugins;
pub mod router;
pub mod state;
pub mod ticker;

pub use bundle::Bundle;
pub use controller::PlaybackController;
pub use error::{PlaybackError, Result};
pub use focus::AudioFocus;
pub use listener::Listeners;
pub use now_playing::{NowPlaying, Song, NOTHING_PLAYING};
pub use router::{DispatchReport, EventRouter, PlayerPlugin, PluginEvent, RegistryChange};
pub use state::{Operation, PlayerState};
pub use ticker::{PositionSource, ProgressSink, ProgressTicker, TickSample};
