//! Legality table tests for the player state machine.
//!
//! Every (state, operation) pair is exercised against a fresh machine driven
//! into that state. Legal pairs must land in the documented state; illegal
//! pairs must fail with `IllegalState`, keep the state and never reach the
//! native player.

mod common;

use bridge_traits::{DataSource, NativeEventKind, PlaybackState};
use common::FakePlayer;
use core_playback::{Operation, PlayerState};
use PlaybackState::*;

fn driven_to(target: PlaybackState) -> (PlayerState<FakePlayer>, FakePlayer) {
    let native = FakePlayer::new().with_duration(60_000);
    let mut player = PlayerState::new(native.clone());
    let source = DataSource::url("http://x/a.mp3");

    match target {
        Idle => {}
        Initialized => player.set_source(&source).unwrap(),
        Preparing => {
            player.set_source(&source).unwrap();
            player.prepare_async().unwrap();
        }
        Prepared => {
            player.set_source(&source).unwrap();
            player.prepare().unwrap();
        }
        Started => {
            player.set_source(&source).unwrap();
            player.prepare().unwrap();
            player.start().unwrap();
        }
        Paused => {
            player.set_source(&source).unwrap();
            player.prepare().unwrap();
            player.start().unwrap();
            player.pause().unwrap();
        }
        Stopped => {
            player.set_source(&source).unwrap();
            player.prepare().unwrap();
            player.stop().unwrap();
        }
        PlaybackCompleted => {
            player.set_source(&source).unwrap();
            player.prepare().unwrap();
            player.start().unwrap();
            player.fold(&native.event(NativeEventKind::PlaybackCompleted));
        }
        Error => {
            player.set_source(&source).unwrap();
            player.fold(&native.event(NativeEventKind::Error { what: 1, extra: 0 }));
        }
        Released => player.release().unwrap(),
    }

    assert_eq!(player.state(), target, "fixture failed to reach {target}");
    native.clear_calls();
    (player, native)
}

fn expected_legal(operation: Operation) -> Vec<PlaybackState> {
    match operation {
        Operation::SetSource => vec![Idle],
        Operation::Prepare | Operation::PrepareAsync => vec![Initialized, Stopped],
        Operation::Start => vec![Prepared, Started, Paused, PlaybackCompleted],
        Operation::Pause => vec![Started, Paused],
        Operation::Stop => vec![Prepared, Started, Stopped, Paused, PlaybackCompleted],
        Operation::SeekTo => vec![Prepared, Started, Paused, PlaybackCompleted],
        Operation::Reset => PlaybackState::ALL
            .into_iter()
            .filter(|s| *s != Released)
            .collect(),
        Operation::Release => PlaybackState::ALL.to_vec(),
        Operation::SetVolume => PlaybackState::ALL
            .into_iter()
            .filter(|s| !matches!(s, Error | Released))
            .collect(),
    }
}

fn expected_result(operation: Operation, from: PlaybackState) -> PlaybackState {
    match operation {
        Operation::SetSource => Initialized,
        Operation::Prepare => Prepared,
        Operation::PrepareAsync => Preparing,
        Operation::Start => Started,
        Operation::Pause => Paused,
        Operation::Stop => Stopped,
        Operation::SeekTo => Preparing,
        Operation::Reset => Idle,
        Operation::Release => Released,
        Operation::SetVolume => from,
    }
}

fn run(player: &mut PlayerState<FakePlayer>, operation: Operation) -> core_playback::Result<()> {
    match operation {
        Operation::SetSource => player.set_source(&DataSource::url("http://x/b.mp3")),
        Operation::Prepare => player.prepare(),
        Operation::PrepareAsync => player.prepare_async(),
        Operation::Start => player.start(),
        Operation::Pause => player.pause(),
        Operation::Stop => player.stop(),
        Operation::SeekTo => player.seek_to(1_000),
        Operation::Reset => player.reset(),
        Operation::Release => player.release(),
        Operation::SetVolume => player.set_volume(0.5, 0.5),
    }
}

#[test]
fn test_legality_table_for_every_pair() {
    for state in PlaybackState::ALL {
        for operation in Operation::ALL {
            let (mut player, native) = driven_to(state);
            let legal = expected_legal(operation).contains(&state);
            assert_eq!(
                operation.is_legal_in(state),
                legal,
                "table mismatch for {operation} in {state}"
            );

            let result = run(&mut player, operation);
            if legal {
                assert!(result.is_ok(), "{operation} in {state} failed: {result:?}");
                assert_eq!(
                    player.state(),
                    expected_result(operation, state),
                    "{operation} from {state}"
                );
            } else {
                let err = result.expect_err("illegal call accepted");
                assert!(err.is_illegal_state(), "{operation} in {state}: {err}");
                assert_eq!(player.state(), state, "{operation} moved {state}");
                assert!(
                    native.calls().is_empty(),
                    "{operation} in {state} reached native: {:?}",
                    native.calls()
                );
            }
        }
    }
}

#[test]
fn test_position_defined_states() {
    for state in PlaybackState::ALL {
        let (player, native) = driven_to(state);
        native.set_position(5_000);
        let defined = matches!(state, Started | Paused | Stopped | PlaybackCompleted);
        assert_eq!(
            player.current_position(),
            if defined { 5_000 } else { 0 },
            "position in {state}"
        );
    }
}

#[test]
fn test_duration_defined_states() {
    for state in PlaybackState::ALL {
        let (player, _native) = driven_to(state);
        let defined = matches!(state, Prepared | Started | Paused | PlaybackCompleted);
        assert_eq!(
            player.duration(),
            if defined { 60_000 } else { 0 },
            "duration in {state}"
        );
    }
}

#[test]
fn test_seek_restores_each_seekable_state() {
    for state in [Prepared, Started, Paused, PlaybackCompleted] {
        let (mut player, native) = driven_to(state);
        player.seek_to(2_000).unwrap();
        assert_eq!(player.state(), Preparing);

        player.fold(&native.event(NativeEventKind::SeekCompleted));
        assert_eq!(player.state(), state);
        assert!(native.calls().contains(&"seek_to:2000".to_string()));
    }
}

#[test]
fn test_released_ignores_callbacks() {
    let (mut player, native) = driven_to(Released);
    assert!(player
        .fold(&native.event(NativeEventKind::Prepared))
        .is_none());
    assert_eq!(player.state(), Released);
}
