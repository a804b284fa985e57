//! Single-subscriber callback slots.
//!
//! Each native callback kind has exactly one listener slot. Setting a slot
//! replaces the previous listener (last writer wins); there is no fan-out
//! here. Plugins are the multi-subscriber mechanism, see [`crate::router`].
//!
//! Listeners run outside the controller lock, so they may call back into the
//! controller. A panicking listener is logged and treated as absent.

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

pub type PreparedListener = dyn Fn() + Send + Sync;
pub type CompletionListener = dyn Fn() + Send + Sync;
pub type SeekCompleteListener = dyn Fn() + Send + Sync;
/// Receives `(what, extra)`; returns `true` when the error was handled.
pub type ErrorListener = dyn Fn(i32, i32) -> bool + Send + Sync;
pub type BufferingListener = dyn Fn(u8) + Send + Sync;
pub type InfoListener = dyn Fn(i32, i32) + Send + Sync;

/// Holds at most one listener.
pub struct Slot<L: ?Sized> {
    current: RwLock<Option<Arc<L>>>,
}

impl<L: ?Sized> Default for Slot<L> {
    fn default() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }
}

impl<L: ?Sized> Slot<L> {
    /// Install `listener`, returning the one it replaced.
    pub fn replace(&self, listener: Option<Arc<L>>) -> Option<Arc<L>> {
        std::mem::replace(&mut *self.current.write(), listener)
    }

    pub fn get(&self) -> Option<Arc<L>> {
        self.current.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.current.read().is_some()
    }
}

fn guarded<R>(slot: &'static str, call: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(value) => Some(value),
        Err(_) => {
            error!(listener = slot, "listener panicked");
            None
        }
    }
}

/// The full set of native callback slots.
#[derive(Default)]
pub struct Listeners {
    pub prepared: Slot<PreparedListener>,
    pub completion: Slot<CompletionListener>,
    pub seek_complete: Slot<SeekCompleteListener>,
    pub error: Slot<ErrorListener>,
    pub buffering: Slot<BufferingListener>,
    pub info: Slot<InfoListener>,
}

impl Listeners {
    pub fn notify_prepared(&self) {
        if let Some(listener) = self.prepared.get() {
            guarded("prepared", || listener());
        }
    }

    pub fn notify_completion(&self) {
        if let Some(listener) = self.completion.get() {
            guarded("completion", || listener());
        }
    }

    pub fn notify_seek_complete(&self) {
        if let Some(listener) = self.seek_complete.get() {
            guarded("seek_complete", || listener());
        }
    }

    /// Returns whether the error was consumed. No listener, or a panicking
    /// one, counts as declined.
    pub fn notify_error(&self, what: i32, extra: i32) -> bool {
        self.error
            .get()
            .and_then(|listener| guarded("error", || listener(what, extra)))
            .unwrap_or(false)
    }

    pub fn notify_buffering(&self, percent: u8) {
        if let Some(listener) = self.buffering.get() {
            guarded("buffering", || listener(percent));
        }
    }

    pub fn notify_info(&self, what: i32, extra: i32) {
        if let Some(listener) = self.info.get() {
            guarded("info", || listener(what, extra));
        }
    }

    pub fn clear(&self) {
        self.prepared.replace(None);
        self.completion.replace(None);
        self.seek_complete.replace(None);
        self.error.replace(None);
        self.buffering.replace(None);
        self.info.replace(None);
    }
}
