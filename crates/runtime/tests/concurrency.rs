use client_backend_core::{CombatActionClient, Endpoint, MockCombatBackend};
use combat_core::{
    ActionKind, CombatError, EnginePhase, InvalidAction, LocationId, TimingScore, TurnResolution,
    Winner,
};
use combat_runtime::{CombatRuntime, Event, RuntimeError, Topic, TurnEvent};

fn exchange(turn_number: u32, enemy_hp: i64) -> TurnResolution {
    TurnResolution {
        player_hp: 90,
        enemy_hp,
        turn_number,
        actions: vec![],
        ended: false,
        winner: None,
    }
}

async fn gated_runtime() -> (MockCombatBackend, CombatRuntime) {
    let backend = MockCombatBackend::default().gated();
    let runtime = CombatRuntime::builder()
        .client(backend.clone())
        .build()
        .await
        .expect("Runtime should build with a client");
    (backend, runtime)
}

/// Waits until the backend has answered `count` turns. The completion is queued
/// for the worker by then, ahead of any later command.
async fn wait_for_turns(backend: &MockCombatBackend, count: usize) {
    while backend.completed_turns() < count {
        tokio::task::yield_now().await;
    }
}

fn superseded<T>(result: Result<T, RuntimeError>) -> bool {
    matches!(
        result,
        Err(RuntimeError::Combat(CombatError::InvalidAction(
            InvalidAction::Superseded
        )))
    )
}

#[tokio::test]
async fn late_failure_after_abandon_leaves_next_battle_alone() {
    let (backend, runtime) = gated_runtime().await;
    backend.push_turn(TurnResolution {
        ended: true,
        winner: None,
        ..exchange(2, 0)
    });
    let handle = runtime.handle();

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("First battle");

    let submitter = handle.clone();
    let submit = tokio::spawn(async move {
        submitter
            .submit_action(ActionKind::Attack, TimingScore::MAX)
            .await
    });
    backend.turn_requested().await;

    // Player leaves for good and starts another battle before the old
    // response arrives.
    handle.abandon().await.expect("Abandon");
    let second = handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Second battle");

    assert!(superseded(submit.await.expect("submit task")));

    backend.release_turn();
    wait_for_turns(&backend, 1).await;

    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Active);
    let session = snapshot.session.expect("second battle still installed");
    assert_eq!(session.session_id, second.session_id);
    assert_eq!(session.turn_number, 1);
    assert_eq!(session.enemy_hp, 50);
    assert!(snapshot.in_flight.is_none());
}

#[tokio::test]
async fn late_success_after_abandon_is_discarded() {
    let (backend, runtime) = gated_runtime().await;
    backend.push_turn(TurnResolution {
        player_hp: 90,
        enemy_hp: 0,
        turn_number: 2,
        actions: vec![],
        ended: true,
        winner: Some(Winner::Player),
    });
    let handle = runtime.handle();

    let session = handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");

    let submitter = handle.clone();
    let submit = tokio::spawn(async move {
        submitter
            .submit_action(ActionKind::Attack, TimingScore::MAX)
            .await
    });
    backend.turn_requested().await;

    // Same backend session picked up again before the old turn answers
    handle.abandon().await.expect("Abandon");
    let resumed = handle.resume().await.expect("Resume");
    assert_eq!(resumed.as_ref(), Some(&session));
    assert!(superseded(submit.await.expect("submit task")));

    let mut turns = handle.subscribe(Topic::Turn);
    backend.release_turn();
    wait_for_turns(&backend, 1).await;

    // The backend accepted the turn; the engine must still ignore it
    let backend_session = backend
        .get_active_session()
        .await
        .expect("Backend lookup")
        .expect("backend session");
    assert_eq!(backend_session.enemy_hp, 0);

    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Active);
    assert!(snapshot.in_flight.is_none());
    let current = snapshot.session.expect("resumed session");
    assert_eq!(current.session_id, session.session_id);
    assert_eq!(current.turn_number, 1);
    assert_eq!((current.player_hp, current.enemy_hp), (100, 50));
    assert_eq!(current.winner, None);
    assert!(turns.try_recv().is_err());
}

#[tokio::test]
async fn dropped_caller_result_is_still_applied() {
    let (backend, runtime) = gated_runtime().await;
    backend.push_turn(exchange(2, 35));
    let handle = runtime.handle();
    let mut turns = handle.subscribe(Topic::Turn);

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");

    let submitter = handle.clone();
    let submit = tokio::spawn(async move {
        submitter
            .submit_action(ActionKind::Attack, TimingScore::new(0.7))
            .await
    });
    backend.turn_requested().await;

    // Battle view goes away without tearing the battle down
    submit.abort();
    assert!(submit.await.expect_err("aborted").is_cancelled());

    backend.release_turn();
    wait_for_turns(&backend, 1).await;

    let snapshot = handle.snapshot().await.expect("Snapshot");
    let session = snapshot.session.expect("session");
    assert_eq!(session.turn_number, 2);
    assert_eq!(session.enemy_hp, 35);
    assert!(snapshot.in_flight.is_none());

    match turns.try_recv() {
        Ok(Event::Turn(TurnEvent::Resolved { outcome, .. })) => {
            assert_eq!(outcome.turn_number, 2)
        }
        other => panic!("expected a resolved turn event, got {other:?}"),
    }
}

#[tokio::test]
async fn second_submit_while_turn_in_flight_is_rejected() {
    let (backend, runtime) = gated_runtime().await;
    backend.push_turn(exchange(2, 40));
    let handle = runtime.handle();

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");

    let submitter = handle.clone();
    let first = tokio::spawn(async move {
        submitter
            .submit_action(ActionKind::Attack, TimingScore::MAX)
            .await
    });
    backend.turn_requested().await;

    let err = handle
        .submit_action(ActionKind::Defend, TimingScore::MAX)
        .await
        .expect_err("Only one turn at a time");
    assert!(matches!(
        err,
        RuntimeError::Combat(CombatError::InvalidAction(InvalidAction::TurnInFlight))
    ));

    backend.release_turn();
    let outcome = first
        .await
        .expect("submit task")
        .expect("First submit resolves");
    assert_eq!(outcome.turn_number, 2);
    assert_eq!(backend.calls(Endpoint::Action), 1);
}

#[tokio::test]
async fn reset_is_refused_while_a_turn_is_in_flight() {
    let (backend, runtime) = gated_runtime().await;
    backend.push_turn(exchange(2, 40));
    let handle = runtime.handle();

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");

    let submitter = handle.clone();
    let submit = tokio::spawn(async move {
        submitter
            .submit_action(ActionKind::Attack, TimingScore::MAX)
            .await
    });
    backend.turn_requested().await;

    let err = handle.reset().await.expect_err("Active is not terminal");
    assert!(matches!(
        err,
        RuntimeError::Combat(CombatError::InvalidAction(InvalidAction::NotTerminal {
            phase: EnginePhase::Active
        }))
    ));

    backend.release_turn();
    submit
        .await
        .expect("submit task")
        .expect("Turn unaffected by refused reset");
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_calls() {
    let (backend, runtime) = gated_runtime().await;
    backend.push_turn(exchange(2, 20));
    let handle = runtime.handle();

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");

    let submit = tokio::spawn(async move {
        handle
            .submit_action(ActionKind::Attack, TimingScore::MAX)
            .await
    });
    backend.turn_requested().await;

    let shutdown = tokio::spawn(runtime.shutdown());
    backend.release_turn();

    let outcome = submit
        .await
        .expect("submit task")
        .expect("Turn completes during shutdown");
    assert_eq!(outcome.enemy_hp, 20);
    shutdown
        .await
        .expect("shutdown task")
        .expect("Worker exits cleanly");
}
