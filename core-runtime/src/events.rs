//! # Event Bus System
//!
//! Broadcasts playback lifecycle events to any number of host-side observers
//! using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! Plugins (see `core-playback`) are the in-process, ordered observers of the
//! controller. The event bus is the decoupled one: UI layers, bindings and the
//! progress ticker's sink all publish or consume [`PlayerEvent`]s here without
//! holding a reference to the controller.
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐   subscribe   ┌────────────┐
//! │ Controller   ├────────────>│           ├──────────────>│ UI binding │
//! └──────────────┘             │ EventBus  │               └────────────┘
//! ┌──────────────┐    emit     │ (broadcast│   subscribe   ┌────────────┐
//! │ProgressTicker├────────────>│  channel) ├──────────────>│ Test suite │
//! └──────────────┘             └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, EventStream, PlayerEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut progress = EventStream::new(bus.subscribe())
//!     .filter(|event| matches!(event, PlayerEvent::Progress { .. }));
//!
//! bus.emit(PlayerEvent::Progress { position_ms: 1_000, duration_ms: 60_000 }).ok();
//! assert!(progress.recv().await.is_ok());
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`; publishers ignore it.

use bridge_traits::PlaybackState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall further behind receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Player Events
// ============================================================================

/// Lifecycle events published by the playback core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    /// The state machine moved between two states.
    StateChanged {
        from: PlaybackState,
        to: PlaybackState,
    },
    /// Asynchronous preparation of a source began.
    Loading {
        /// Display name of the source being prepared.
        source: String,
    },
    /// Playback started after preparation.
    Started {
        source: String,
        duration_ms: u64,
    },
    Paused {
        position_ms: u64,
    },
    /// Playback resumed from pause.
    Resumed {
        position_ms: u64,
    },
    Stopped,
    /// The source played to its end.
    Completed,
    /// Periodic position sample from the progress ticker.
    Progress {
        position_ms: u64,
        duration_ms: u64,
    },
    /// Song metadata was replaced.
    SongChanged {
        title: Option<String>,
        artist: Option<String>,
    },
    /// The native player reported an asynchronous error.
    Error {
        what: i32,
        extra: i32,
        /// Whether a registered error listener handled it.
        consumed: bool,
    },
    /// Network buffering progress, 0..=100.
    Buffering {
        percent: u8,
    },
}

impl PlayerEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            PlayerEvent::StateChanged { .. } => "Playback state changed",
            PlayerEvent::Loading { .. } => "Preparing source",
            PlayerEvent::Started { .. } => "Playback started",
            PlayerEvent::Paused { .. } => "Playback paused",
            PlayerEvent::Resumed { .. } => "Playback resumed",
            PlayerEvent::Stopped => "Playback stopped",
            PlayerEvent::Completed => "Track completed",
            PlayerEvent::Progress { .. } => "Playback position changed",
            PlayerEvent::SongChanged { .. } => "Song metadata changed",
            PlayerEvent::Error { .. } => "Playback error",
            PlayerEvent::Buffering { .. } => "Buffering",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerEvent::Error {
                consumed: false, ..
            } => EventSeverity::Error,
            PlayerEvent::Error { consumed: true, .. } => EventSeverity::Warning,
            PlayerEvent::Started { .. } | PlayerEvent::Completed | PlayerEvent::Stopped => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to player events.
///
/// Cloning is cheap; every clone publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: PlayerEvent) -> Result<usize, SendError<PlayerEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&PlayerEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
pub struct EventStream {
    receiver: Receiver<PlayerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<PlayerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<PlayerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching event is currently available.
    pub fn try_recv(&mut self) -> Option<Result<PlayerEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    /// Drains every buffered event that passes the filter.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Some(result) = self.try_recv() {
            match result {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
