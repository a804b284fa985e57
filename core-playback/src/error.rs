//! # Playback Error Types
//!
//! Errors surfaced by the playback state machine and controller.

use crate::state::Operation;
use bridge_traits::{BridgeError, PlaybackState};
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// The operation is not defined for the current state. Nothing was sent
    /// to the native player.
    #[error("Cannot {operation} while {state}")]
    IllegalState {
        operation: Operation,
        state: PlaybackState,
    },

    // ========================================================================
    // Native Errors
    // ========================================================================
    /// The native player rejected a data source while attaching or preparing
    /// it. The state machine is left in `Error`.
    #[error("Source rejected: {0}")]
    Source(String),

    /// Asynchronous error reported by the native player.
    #[error("Native playback error (what={what}, extra={extra})")]
    NativePlayback { what: i32, extra: i32 },

    /// A synchronous native command failed.
    #[error("Native player error: {0}")]
    Native(#[from] BridgeError),

    // ========================================================================
    // Plugin Errors
    // ========================================================================
    /// A plugin handler failed or panicked. Logged, never returned to callers.
    #[error("Plugin '{plugin}' failed: {message}")]
    PluginFault { plugin: String, message: String },
}

impl PlaybackError {
    pub(crate) fn illegal(operation: Operation, state: PlaybackState) -> Self {
        PlaybackError::IllegalState { operation, state }
    }

    /// Returns `true` if the call was rejected by the legality table.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, PlaybackError::IllegalState { .. })
    }

    /// Returns `true` if the native player refused the data source.
    pub fn is_source_error(&self) -> bool {
        matches!(self, PlaybackError::Source(_))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
