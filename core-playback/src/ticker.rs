//! # Progress Ticker
//!
//! Periodic sampling of the playback position while a stream is active.
//!
//! The ticker is a tokio task driven by [`tokio::time::interval`] and stopped
//! through a [`CancellationToken`]. It never touches the state machine
//! directly: each tick asks a [`PositionSource`] what to do and forwards
//! reports to a single [`ProgressSink`].
//!
//! At most one task runs per ticker. [`ProgressTicker::start`] cancels the
//! running task before spawning the next one, and [`ProgressTicker::cancel`]
//! may be called any number of times.

use core_runtime::events::{EventBus, PlayerEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// What a tick should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSample {
    /// Playback is running; report this position.
    Report { position_ms: u64, duration_ms: u64 },
    /// Playback is momentarily not advancing (paused, seeking).
    Skip,
    /// The cycle this ticker was started for is over.
    Finish,
}

/// Answers ticks for one preparation cycle.
pub trait PositionSource: Send + Sync {
    fn sample(&self, generation: u64) -> TickSample;
}

/// Receives progress reports.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, position_ms: u64, duration_ms: u64);
}

impl ProgressSink for EventBus {
    fn on_progress(&self, position_ms: u64, duration_ms: u64) {
        // No subscribers is fine.
        let _ = self.emit(PlayerEvent::Progress {
            position_ms,
            duration_ms,
        });
    }
}

/// Owner of the (at most one) running progress task.
pub struct ProgressTicker {
    interval: Duration,
    runtime: Handle,
    current: Mutex<Option<CancellationToken>>,
}

impl ProgressTicker {
    pub fn new(interval: Duration, runtime: Handle) -> Self {
        Self {
            interval,
            runtime,
            current: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn a ticker for `generation`, cancelling any running one first.
    pub fn start(
        &self,
        generation: u64,
        source: Arc<dyn PositionSource>,
        sink: Arc<dyn ProgressSink>,
    ) -> CancellationToken {
        let token = CancellationToken::new();
        {
            let mut current = self.current.lock();
            if let Some(previous) = current.replace(token.clone()) {
                previous.cancel();
            }
        }

        debug!(
            generation,
            interval_ms = self.interval.as_millis() as u64,
            "progress ticker started"
        );
        self.runtime
            .spawn(run(self.interval, generation, source, sink, token.clone()));
        token
    }

    /// Stop the running ticker. Returns whether one was running.
    pub fn cancel(&self) -> bool {
        match self.current.lock().take() {
            Some(token) => {
                let was_running = !token.is_cancelled();
                token.cancel();
                if was_running {
                    debug!("progress ticker cancelled");
                }
                was_running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run(
    period: Duration,
    generation: u64,
    source: Arc<dyn PositionSource>,
    sink: Arc<dyn ProgressSink>,
    token: CancellationToken,
) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; reports start one period in.
    ticks.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticks.tick() => match source.sample(generation) {
                TickSample::Report { position_ms, duration_ms } => {
                    trace!(position_ms, duration_ms, "progress");
                    sink.on_progress(position_ms, duration_ms);
                }
                TickSample::Skip => {}
                TickSample::Finish => {
                    debug!(generation, "progress ticker finished");
                    token.cancel();
                    break;
                }
            },
        }
    }
}
