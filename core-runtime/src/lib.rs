//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate holds the utilities `core-playback` builds on. It establishes the
//! logging conventions, the validated configuration handed to the controller and
//! the broadcast channel host observers subscribe to.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{PlayerConfig, PlayerConfigBuilder, PlayerSettings};
pub use error::{Error, Result};
pub use events::{EventBus, EventStream, PlayerEvent};
