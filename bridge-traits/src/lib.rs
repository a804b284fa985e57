//! # Host Bridge Traits
//!
//! Contracts between the playback core and the host platform.
//!
//! ## Overview
//!
//! The core never talks to the OS directly. Each capability it needs is a
//! trait implemented by the host (Android service, iOS app, desktop test
//! harness):
//!
//! ### Playback
//! - [`NativePlayer`](playback::NativePlayer) - the platform media primitive
//! - [`NativeEvent`](playback::NativeEvent) - asynchronous callbacks it raises
//!
//! ### Platform integration
//! - [`ResourceArbiter`](arbitration::ResourceArbiter) - audio focus and media buttons
//! - [`NotificationSurface`](surfaces::NotificationSurface) - ongoing notification
//! - [`RemoteControlSurface`](surfaces::RemoteControlSurface) - lock-screen controls
//!
//! ### Utilities
//! - [`LoggerSink`](log_sink::LoggerSink) - forward structured logs to the host
//!
//! ## Error Handling
//!
//! All bridges report failures as [`BridgeError`]. Adapters should convert
//! platform exceptions into the closest variant and keep the platform message.
//!
//! ## Thread Safety
//!
//! Shared bridges are `Send + Sync`. [`NativePlayer`](playback::NativePlayer)
//! is only `Send`: the core keeps it behind its own lock.

pub mod arbitration;
pub mod error;
pub mod log_sink;
pub mod playback;
pub mod surfaces;

pub use error::BridgeError;

pub use arbitration::{ArbitrationOutcome, ResourceArbiter, ResourceOwner};
pub use log_sink::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{
    CallbackToken, DataSource, NativeEvent, NativeEventKind, NativePlayer, PlaybackState,
    SourceKind,
};
pub use surfaces::{
    AlbumArt, MetadataEdit, NotificationContent, NotificationSurface, RemoteControlSurface,
    RemotePlaybackState,
};
