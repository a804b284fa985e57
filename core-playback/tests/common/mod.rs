//! Shared fixtures for core-playback integration tests.

#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    ArbitrationOutcome, BridgeError, CallbackToken, DataSource, NativeEvent, NativeEventKind,
    NativePlayer, ResourceArbiter, ResourceOwner,
};
use core_playback::{PlaybackController, PlayerPlugin};
use core_runtime::PlayerConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fake Native Player
// ============================================================================

#[derive(Default)]
pub struct FakeState {
    pub calls: Vec<String>,
    pub token: Option<CallbackToken>,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub reject_sources: bool,
    pub fail_start: bool,
}

/// Scriptable in-memory native player. Clones share state, so a test keeps
/// one handle while the controller owns another.
#[derive(Clone, Default)]
pub struct FakePlayer {
    state: Arc<Mutex<FakeState>>,
}

impl FakePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(self, duration_ms: u64) -> Self {
        self.state.lock().duration_ms = duration_ms;
        self
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state.lock().position_ms = position_ms;
    }

    pub fn reject_sources(&self) {
        self.state.lock().reject_sources = true;
    }

    pub fn fail_start(&self, fail: bool) {
        self.state.lock().fail_start = fail;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Build a callback carrying the token of the last `set_source`.
    pub fn event(&self, kind: NativeEventKind) -> NativeEvent {
        let token = self.state.lock().token.unwrap_or(CallbackToken::new(0));
        NativeEvent::new(token, kind)
    }

    fn record(&self, call: impl Into<String>) {
        self.state.lock().calls.push(call.into());
    }
}

impl NativePlayer for FakePlayer {
    fn set_source(&mut self, source: &DataSource, token: CallbackToken) -> BridgeResult<()> {
        self.record(format!("set_source:{}", source.display_name()));
        let mut state = self.state.lock();
        if state.reject_sources {
            return Err(BridgeError::SourceRejected("unsupported".into()));
        }
        state.token = Some(token);
        Ok(())
    }

    fn prepare(&mut self) -> BridgeResult<()> {
        self.record("prepare");
        Ok(())
    }

    fn prepare_async(&mut self) -> BridgeResult<()> {
        self.record("prepare_async");
        Ok(())
    }

    fn start(&mut self) -> BridgeResult<()> {
        self.record("start");
        if self.state.lock().fail_start {
            return Err(BridgeError::OperationFailed("start".into()));
        }
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.record("pause");
        Ok(())
    }

    fn stop(&mut self) -> BridgeResult<()> {
        self.record("stop");
        Ok(())
    }

    fn seek_to(&mut self, position_ms: u64) -> BridgeResult<()> {
        self.record(format!("seek_to:{position_ms}"));
        self.state.lock().position_ms = position_ms;
        Ok(())
    }

    fn current_position(&self) -> u64 {
        self.state.lock().position_ms
    }

    fn duration(&self) -> u64 {
        self.state.lock().duration_ms
    }

    fn set_volume(&mut self, left: f32, right: f32) -> BridgeResult<()> {
        self.record(format!("set_volume:{left}:{right}"));
        Ok(())
    }

    fn reset(&mut self) {
        self.record("reset");
    }

    fn release(&mut self) {
        self.record("release");
    }
}

// ============================================================================
// Fake Arbiter
// ============================================================================

#[derive(Default)]
pub struct FakeArbiter {
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeArbiter {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

impl ResourceArbiter for FakeArbiter {
    fn request(&self, _owner: &ResourceOwner) -> BridgeResult<ArbitrationOutcome> {
        self.calls.lock().push("request");
        Ok(ArbitrationOutcome::Granted)
    }

    fn abandon(&self, _owner: &ResourceOwner) -> BridgeResult<()> {
        self.calls.lock().push("abandon");
        Ok(())
    }
}

// ============================================================================
// Recording Plugin
// ============================================================================

/// Appends `"<label>:<handler>"` to a shared log for every event.
pub struct RecordingPlugin {
    pub label: &'static str,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl RecordingPlugin {
    pub fn new(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn PlayerPlugin> {
        Arc::new(Self {
            label,
            log: Arc::clone(log),
        })
    }

    fn push(&self, what: &str) {
        self.log.lock().push(format!("{}:{what}", self.label));
    }
}

impl PlayerPlugin for RecordingPlugin {
    fn name(&self) -> &str {
        self.label
    }

    fn on_play(&self) -> anyhow::Result<()> {
        self.push("play");
        Ok(())
    }

    fn on_pause(&self) -> anyhow::Result<()> {
        self.push("pause");
        Ok(())
    }

    fn on_stop(&self) -> anyhow::Result<()> {
        self.push("stop");
        Ok(())
    }

    fn on_resume(&self) -> anyhow::Result<()> {
        self.push("resume");
        Ok(())
    }

    fn on_loading(&self) -> anyhow::Result<()> {
        self.push("loading");
        Ok(())
    }

    fn on_title_changed(&self, title: &str) -> anyhow::Result<()> {
        self.push(&format!("title={title}"));
        Ok(())
    }

    fn on_duration_changed(&self, duration_ms: u64) -> anyhow::Result<()> {
        self.push(&format!("duration={duration_ms}"));
        Ok(())
    }
}

// ============================================================================
// Setup helpers
// ============================================================================

pub fn config() -> PlayerConfig {
    PlayerConfig::builder()
        .progress_interval(Duration::from_millis(1_000))
        .build()
        .unwrap()
}

pub fn config_with_arbiter(arbiter: Arc<FakeArbiter>) -> PlayerConfig {
    PlayerConfig::builder()
        .progress_interval(Duration::from_millis(1_000))
        .resource_arbiter(arbiter)
        .build()
        .unwrap()
}

pub fn controller() -> (PlaybackController<FakePlayer>, FakePlayer) {
    let native = FakePlayer::new().with_duration(180_000);
    let controller = PlaybackController::new(native.clone(), &config());
    (controller, native)
}

/// Controller that has received its prepared callback and is playing.
pub fn playing_controller() -> (PlaybackController<FakePlayer>, FakePlayer) {
    let (controller, native) = controller();
    controller
        .play_source(DataSource::url("http://x/a.mp3"))
        .unwrap();
    controller.handle_native_event(native.event(NativeEventKind::Prepared));
    native.clear_calls();
    (controller, native)
}
