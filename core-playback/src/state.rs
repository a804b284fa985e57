//! # Player State Machine
//!
//! [`PlayerState`] wraps a [`NativePlayer`] and owns the legality of every
//! operation on it.
//!
//! ## Legality
//!
//! | Operation       | Legal from                                         | Result        |
//! |-----------------|----------------------------------------------------|---------------|
//! | `set_source`    | Idle                                               | Initialized   |
//! | `prepare`       | Initialized, Stopped                               | Prepared      |
//! | `prepare_async` | Initialized, Stopped                               | Preparing     |
//! | `start`         | Prepared, Started, Paused, PlaybackCompleted       | Started       |
//! | `pause`         | Started, Paused                                    | Paused        |
//! | `stop`          | Prepared, Started, Stopped, Paused, PlaybackCompleted | Stopped    |
//! | `seek_to`       | Prepared, Started, Paused, PlaybackCompleted       | Preparing     |
//! | `reset`         | any but Released                                   | Idle          |
//! | `release`       | any                                                | Released      |
//! | `set_volume`    | any but Error, Released                            | unchanged     |
//!
//! An illegal call returns [`PlaybackError::IllegalState`] before the native
//! player is touched.
//!
//! ## Callbacks
//!
//! Native callbacks are folded in with [`PlayerState::fold`]. Each one carries
//! the [`CallbackToken`] of the cycle it was raised for; `reset` and `release`
//! start a new generation, so late callbacks from an abandoned cycle are
//! dropped instead of corrupting the current one.
//!
//! A seek saves the current state in a single slot and enters `Preparing`;
//! the matching seek-complete restores it. Natural completion enters
//! `PlaybackCompleted` and is then cleaned up by
//! [`PlayerState::finish_completion`], which stops and resets to `Idle`.

use crate::error::{PlaybackError, Result};
use bridge_traits::{
    CallbackToken, DataSource, NativeEvent, NativeEventKind, NativePlayer, PlaybackState,
};
use std::fmt;
use tracing::{debug, warn};

use PlaybackState::*;

/// Commands subject to the legality table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SetSource,
    Prepare,
    PrepareAsync,
    Start,
    Pause,
    Stop,
    SeekTo,
    Reset,
    Release,
    SetVolume,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::SetSource,
        Operation::Prepare,
        Operation::PrepareAsync,
        Operation::Start,
        Operation::Pause,
        Operation::Stop,
        Operation::SeekTo,
        Operation::Reset,
        Operation::Release,
        Operation::SetVolume,
    ];

    /// States in which the operation is defined.
    pub fn legal_from(&self) -> &'static [PlaybackState] {
        match self {
            Operation::SetSource => &[Idle],
            Operation::Prepare | Operation::PrepareAsync => &[Initialized, Stopped],
            Operation::Start => &[Prepared, Started, Paused, PlaybackCompleted],
            Operation::Pause => &[Started, Paused],
            Operation::Stop => &[Prepared, Started, Stopped, Paused, PlaybackCompleted],
            Operation::SeekTo => &[Prepared, Started, Paused, PlaybackCompleted],
            Operation::Reset => &[
                Idle,
                Initialized,
                Preparing,
                Prepared,
                Started,
                Paused,
                Stopped,
                PlaybackCompleted,
                Error,
            ],
            Operation::Release => &PlaybackState::ALL,
            Operation::SetVolume => &[
                Idle,
                Initialized,
                Preparing,
                Prepared,
                Started,
                Paused,
                Stopped,
                PlaybackCompleted,
            ],
        }
    }

    pub fn is_legal_in(&self, state: PlaybackState) -> bool {
        self.legal_from().contains(&state)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SetSource => "set_source",
            Operation::Prepare => "prepare",
            Operation::PrepareAsync => "prepare_async",
            Operation::Start => "start",
            Operation::Pause => "pause",
            Operation::Stop => "stop",
            Operation::SeekTo => "seek_to",
            Operation::Reset => "reset",
            Operation::Release => "release",
            Operation::SetVolume => "set_volume",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// States in which the native position is meaningful.
const POSITION_STATES: [PlaybackState; 4] = [Started, Paused, Stopped, PlaybackCompleted];

/// States in which the native duration is meaningful.
const DURATION_STATES: [PlaybackState; 4] = [Prepared, Started, Paused, PlaybackCompleted];

/// Result of folding one accepted native callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folded {
    pub from: PlaybackState,
    pub to: PlaybackState,
    /// Generation the callback belonged to (always the current one).
    pub generation: u64,
    pub kind: NativeEventKind,
}

impl Folded {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Finite state machine around a native player.
///
/// Not synchronized: the owner serializes access (the controller keeps it
/// behind a single mutex).
pub struct PlayerState<N> {
    native: N,
    state: PlaybackState,
    previous_state: Option<PlaybackState>,
    generation: u64,
}

impl<N: NativePlayer> PlayerState<N> {
    pub fn new(native: N) -> Self {
        Self {
            native,
            state: Idle,
            previous_state: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// State saved by a pending seek, if any.
    pub fn previous_state(&self) -> Option<PlaybackState> {
        self.previous_state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token native callbacks of the current cycle must carry.
    pub fn token(&self) -> CallbackToken {
        CallbackToken::new(self.generation)
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    fn ensure(&self, operation: Operation) -> Result<()> {
        if operation.is_legal_in(self.state) {
            Ok(())
        } else {
            debug!(%operation, state = %self.state, "rejected illegal operation");
            Err(PlaybackError::illegal(operation, self.state))
        }
    }

    fn set_state(&mut self, to: PlaybackState) {
        if self.state != to {
            debug!(from = %self.state, %to, generation = self.generation, "state transition");
            self.state = to;
        }
    }

    fn source_failed(&mut self, error: bridge_traits::BridgeError) -> PlaybackError {
        warn!(%error, "native player rejected source");
        self.set_state(Error);
        PlaybackError::Source(error.to_string())
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub fn set_source(&mut self, source: &DataSource) -> Result<()> {
        self.ensure(Operation::SetSource)?;
        let token = self.token();
        match self.native.set_source(source, token) {
            Ok(()) => {
                self.set_state(Initialized);
                Ok(())
            }
            Err(error) => Err(self.source_failed(error)),
        }
    }

    /// Synchronous preparation.
    pub fn prepare(&mut self) -> Result<()> {
        self.ensure(Operation::Prepare)?;
        match self.native.prepare() {
            Ok(()) => {
                self.set_state(Prepared);
                Ok(())
            }
            Err(error) => Err(self.source_failed(error)),
        }
    }

    /// Begin preparation; the outcome arrives as a native callback.
    pub fn prepare_async(&mut self) -> Result<()> {
        self.ensure(Operation::PrepareAsync)?;
        match self.native.prepare_async() {
            Ok(()) => {
                self.set_state(Preparing);
                Ok(())
            }
            Err(error) => Err(self.source_failed(error)),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.ensure(Operation::Start)?;
        self.native.start()?;
        self.set_state(Started);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure(Operation::Pause)?;
        self.native.pause()?;
        self.set_state(Paused);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.ensure(Operation::Stop)?;
        self.native.stop()?;
        self.set_state(Stopped);
        Ok(())
    }

    /// Seek to `position_ms`. The pre-seek state comes back with the
    /// seek-complete callback.
    pub fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.ensure(Operation::SeekTo)?;
        self.native.seek_to(position_ms)?;
        self.previous_state = Some(self.state);
        self.set_state(Preparing);
        Ok(())
    }

    /// Return to `Idle` and start a new callback generation.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure(Operation::Reset)?;
        self.native.reset();
        self.previous_state = None;
        self.generation += 1;
        self.set_state(Idle);
        Ok(())
    }

    /// Free the native player. Releasing twice is a no-op.
    pub fn release(&mut self) -> Result<()> {
        self.ensure(Operation::Release)?;
        if self.state == Released {
            return Ok(());
        }
        self.native.release();
        self.previous_state = None;
        self.generation += 1;
        self.set_state(Released);
        Ok(())
    }

    pub fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        self.ensure(Operation::SetVolume)?;
        self.native.set_volume(left, right)?;
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current position in milliseconds, 0 when undefined.
    pub fn current_position(&self) -> u64 {
        if POSITION_STATES.contains(&self.state) {
            self.native.current_position()
        } else {
            0
        }
    }

    /// Duration in milliseconds, 0 when undefined.
    pub fn duration(&self) -> u64 {
        if DURATION_STATES.contains(&self.state) {
            self.native.duration()
        } else {
            0
        }
    }

    // ========================================================================
    // Callback folding
    // ========================================================================

    /// Apply a native callback.
    ///
    /// Returns `None` when the callback belongs to an earlier generation or
    /// the player is released.
    pub fn fold(&mut self, event: &NativeEvent) -> Option<Folded> {
        if event.token.generation() != self.generation {
            warn!(
                event_generation = event.token.generation(),
                current_generation = self.generation,
                kind = ?event.kind,
                "ignoring stale native callback"
            );
            return None;
        }
        if self.state == Released {
            debug!(kind = ?event.kind, "ignoring callback after release");
            return None;
        }

        let from = self.state;
        match &event.kind {
            NativeEventKind::Prepared => self.set_state(Prepared),
            NativeEventKind::PlaybackCompleted => self.set_state(PlaybackCompleted),
            NativeEventKind::SeekCompleted => match self.previous_state.take() {
                Some(previous) => self.set_state(previous),
                None => debug!(state = %from, "seek completed without a pending seek"),
            },
            NativeEventKind::Error { what, extra } => {
                warn!(what, extra, state = %from, "native player error");
                self.set_state(Error);
            }
            NativeEventKind::BufferingUpdate { .. } | NativeEventKind::Info { .. } => {}
        }

        Some(Folded {
            from,
            to: self.state,
            generation: self.generation,
            kind: event.kind.clone(),
        })
    }

    /// Cleanup after natural completion: stop, then reset to `Idle`.
    ///
    /// Runs for as long as `generation` is current, whatever state the
    /// completion listener left behind (a `stop()` from the listener is
    /// followed by the reset only). A new cycle started in between wins.
    /// Returns the transitions made, empty when the cleanup was skipped.
    pub fn finish_completion(&mut self, generation: u64) -> Vec<(PlaybackState, PlaybackState)> {
        let mut transitions = Vec::new();
        if self.generation != generation || self.state == Released {
            return transitions;
        }

        if self.state != Stopped && Operation::Stop.is_legal_in(self.state) {
            if let Err(error) = self.native.stop() {
                warn!(%error, "native stop failed during completion cleanup");
            }
            transitions.push((self.state, Stopped));
            self.set_state(Stopped);
        }

        let from = self.state;
        self.native.reset();
        self.previous_state = None;
        self.generation += 1;
        self.set_state(Idle);
        if from != Idle {
            transitions.push((from, Idle));
        }
        transitions
    }
}

impl<N> fmt::Debug for PlayerState<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerState")
            .field("state", &self.state)
            .field("previous_state", &self.previous_state)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::BridgeError;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Native {}

        impl NativePlayer for Native {
            fn set_source(&mut self, source: &DataSource, token: CallbackToken) -> BridgeResult<()>;
            fn prepare(&mut self) -> BridgeResult<()>;
            fn prepare_async(&mut self) -> BridgeResult<()>;
            fn start(&mut self) -> BridgeResult<()>;
            fn pause(&mut self) -> BridgeResult<()>;
            fn stop(&mut self) -> BridgeResult<()>;
            fn seek_to(&mut self, position_ms: u64) -> BridgeResult<()>;
            fn current_position(&self) -> u64;
            fn duration(&self) -> u64;
            fn set_volume(&mut self, left: f32, right: f32) -> BridgeResult<()>;
            fn reset(&mut self);
            fn release(&mut self);
        }
    }

    fn event(state: &PlayerState<MockNative>, kind: NativeEventKind) -> NativeEvent {
        NativeEvent::new(state.token(), kind)
    }

    fn prepared_player() -> PlayerState<MockNative> {
        let mut native = MockNative::new();
        native.expect_set_source().returning(|_, _| Ok(()));
        native.expect_prepare().returning(|| Ok(()));
        native.expect_start().returning(|| Ok(()));
        native.expect_pause().returning(|| Ok(()));
        native.expect_seek_to().returning(|_| Ok(()));
        native.expect_stop().returning(|| Ok(()));
        native.expect_reset().return_const(());
        let mut player = PlayerState::new(native);
        player.set_source(&DataSource::url("http://x/a.mp3")).unwrap();
        player.prepare().unwrap();
        player
    }

    #[test]
    fn test_illegal_call_never_reaches_native() {
        // No expectations: any native call would panic.
        let mut player = PlayerState::new(MockNative::new());

        let err = player.start().unwrap_err();
        assert!(err.is_illegal_state());
        assert_eq!(err.to_string(), "Cannot start while idle");
        assert!(player.pause().is_err());
        assert!(player.seek_to(10).is_err());
        assert_eq!(player.state(), Idle);
    }

    #[test]
    fn test_set_source_passes_current_token() {
        let mut native = MockNative::new();
        native
            .expect_set_source()
            .withf(|source, token| {
                *source == DataSource::url("http://x/a.mp3") && token.generation() == 0
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut player = PlayerState::new(native);
        player.set_source(&DataSource::url("http://x/a.mp3")).unwrap();
        assert_eq!(player.state(), Initialized);
    }

    #[test]
    fn test_rejected_source_enters_error() {
        let mut native = MockNative::new();
        native
            .expect_set_source()
            .returning(|_, _| Err(BridgeError::SourceRejected("unsupported scheme".into())));

        let mut player = PlayerState::new(native);
        let err = player.set_source(&DataSource::url("gopher://x")).unwrap_err();

        assert!(err.is_source_error());
        assert_eq!(player.state(), Error);
    }

    #[test]
    fn test_failed_prepare_enters_error() {
        let mut native = MockNative::new();
        native.expect_set_source().returning(|_, _| Ok(()));
        native
            .expect_prepare_async()
            .returning(|| Err(BridgeError::OperationFailed("codec".into())));

        let mut player = PlayerState::new(native);
        player.set_source(&DataSource::url("http://x/a.mp3")).unwrap();
        assert!(player.prepare_async().unwrap_err().is_source_error());
        assert_eq!(player.state(), Error);
    }

    #[test]
    fn test_failed_start_keeps_state() {
        let mut native = MockNative::new();
        native.expect_set_source().returning(|_, _| Ok(()));
        native.expect_prepare().returning(|| Ok(()));
        native
            .expect_start()
            .returning(|| Err(BridgeError::OperationFailed("device busy".into())));

        let mut player = PlayerState::new(native);
        player.set_source(&DataSource::url("http://x/a.mp3")).unwrap();
        player.prepare().unwrap();

        assert!(matches!(player.start(), Err(PlaybackError::Native(_))));
        assert_eq!(player.state(), Prepared);
    }

    #[test]
    fn test_seek_round_trip_restores_state() {
        let mut player = prepared_player();
        player.start().unwrap();
        player.pause().unwrap();

        player.seek_to(5_000).unwrap();
        assert_eq!(player.state(), Preparing);
        assert_eq!(player.previous_state(), Some(Paused));

        let folded = player.fold(&event(&player, NativeEventKind::SeekCompleted)).unwrap();
        assert_eq!((folded.from, folded.to), (Preparing, Paused));
        assert_eq!(player.previous_state(), None);
    }

    #[test]
    fn test_seek_while_seeking_is_illegal() {
        let mut player = prepared_player();
        player.seek_to(1).unwrap();
        assert!(player.seek_to(2).unwrap_err().is_illegal_state());
    }

    #[test]
    fn test_stray_seek_complete_keeps_state() {
        let mut player = prepared_player();
        let folded = player.fold(&event(&player, NativeEventKind::SeekCompleted)).unwrap();
        assert!(!folded.changed());
        assert_eq!(player.state(), Prepared);
    }

    #[test]
    fn test_stale_callback_is_ignored() {
        let mut native = MockNative::new();
        native.expect_set_source().returning(|_, _| Ok(()));
        native.expect_prepare_async().returning(|| Ok(()));
        native.expect_reset().times(1).return_const(());

        let mut player = PlayerState::new(native);
        player.set_source(&DataSource::url("http://x/a.mp3")).unwrap();
        player.prepare_async().unwrap();
        let old = event(&player, NativeEventKind::Prepared);

        player.reset().unwrap();
        assert_eq!(player.generation(), 1);
        assert!(player.fold(&old).is_none());
        assert_eq!(player.state(), Idle);
    }

    #[test]
    fn test_completion_cleanup_stops_and_resets() {
        let mut player = prepared_player();
        player.start().unwrap();
        let generation = player.generation();

        player.fold(&event(&player, NativeEventKind::PlaybackCompleted));
        assert_eq!(player.state(), PlaybackCompleted);

        assert_eq!(
            player.finish_completion(generation),
            vec![(PlaybackCompleted, Stopped), (Stopped, Idle)]
        );
        assert_eq!(player.state(), Idle);
        assert!(player.finish_completion(generation).is_empty());
    }

    #[test]
    fn test_completion_cleanup_resets_after_listener_stop() {
        let mut player = prepared_player();
        player.start().unwrap();
        let generation = player.generation();

        player.fold(&event(&player, NativeEventKind::PlaybackCompleted));
        player.stop().unwrap();

        assert_eq!(player.finish_completion(generation), vec![(Stopped, Idle)]);
        assert_eq!(player.state(), Idle);
        assert_eq!(player.generation(), generation + 1);
    }

    #[test]
    fn test_completion_cleanup_skipped_for_new_cycle() {
        let mut player = prepared_player();
        player.start().unwrap();
        let generation = player.generation();

        player.fold(&event(&player, NativeEventKind::PlaybackCompleted));
        player.reset().unwrap();
        player.set_source(&DataSource::url("http://x/b.mp3")).unwrap();

        assert!(player.finish_completion(generation).is_empty());
        assert_eq!(player.state(), Initialized);
    }

    #[test]
    fn test_queries_outside_defined_states_read_zero() {
        let player = PlayerState::new(MockNative::new());
        assert_eq!(player.duration(), 0);
        assert_eq!(player.current_position(), 0);

        let mut native = MockNative::new();
        native.expect_set_source().returning(|_, _| Ok(()));
        native.expect_prepare().returning(|| Ok(()));
        native.expect_duration().return_const(180_000u64);
        let mut player = PlayerState::new(native);
        player.set_source(&DataSource::url("http://x/a.mp3")).unwrap();
        player.prepare().unwrap();
        assert_eq!(player.duration(), 180_000);
        assert_eq!(player.current_position(), 0);
    }

    #[test]
    fn test_release_is_terminal_and_idempotent() {
        let mut native = MockNative::new();
        native.expect_release().times(1).return_const(());
        native.expect_set_volume().with(eq(0.5), eq(0.5)).never();

        let mut player = PlayerState::new(native);
        player.release().unwrap();
        player.release().unwrap();

        assert_eq!(player.state(), Released);
        assert!(player.reset().unwrap_err().is_illegal_state());
        assert!(player.set_volume(0.5, 0.5).is_err());
    }

    #[test]
    fn test_operation_table_shape() {
        assert!(Operation::Reset.is_legal_in(Error));
        assert!(!Operation::Reset.is_legal_in(Released));
        assert!(Operation::Release.is_legal_in(Released));
        assert!(!Operation::SetVolume.is_legal_in(Error));
        assert_eq!(Operation::SeekTo.to_string(), "seek_to");
    }
}
