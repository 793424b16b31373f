use client_backend_core::{Endpoint, MockCombatBackend};
use combat_core::{
    ActionKind, ActionLogEntry, CombatError, EnginePhase, FailedStep, InvalidAction, Loadable,
    LocationId, PerformerId, TurnResolution, Winner, resolve,
};
use combat_runtime::{
    CombatRuntime, Event, ResumeOutcome, RuntimeError, SessionEvent, SettlementEvent, Topic,
};

fn entry(turn: u32, performer: &str, kind: ActionKind, damage: u32) -> ActionLogEntry {
    ActionLogEntry {
        turn_number: turn,
        performer_id: PerformerId::new(performer),
        action_kind: kind,
        damage_dealt: Some(damage),
    }
}

fn opening_exchange() -> TurnResolution {
    TurnResolution {
        player_hp: 92,
        enemy_hp: 30,
        turn_number: 2,
        actions: vec![
            entry(1, "player", ActionKind::Attack, 20),
            entry(1, "enemy", ActionKind::Attack, 8),
        ],
        ended: false,
        winner: None,
    }
}

fn finishing_blow() -> TurnResolution {
    TurnResolution {
        player_hp: 92,
        enemy_hp: -5,
        turn_number: 3,
        actions: vec![entry(2, "player", ActionKind::Attack, 35)],
        ended: true,
        winner: Some(Winner::Player),
    }
}

async fn runtime_with(backend: &MockCombatBackend) -> CombatRuntime {
    CombatRuntime::builder()
        .client(backend.clone())
        .build()
        .await
        .expect("Runtime should build with a client")
}

/// Both runtimes are in `phase` with identical engine state.
async fn assert_same_state(runtimes: [&CombatRuntime; 2], phase: EnginePhase) {
    let started = runtimes[0].handle().snapshot().await.expect("Snapshot");
    let resumed = runtimes[1].handle().snapshot().await.expect("Snapshot");
    assert_eq!(started.phase, phase);
    assert_eq!(started, resumed);
}

fn combat_error(err: RuntimeError) -> CombatError {
    match err {
        RuntimeError::Combat(err) => err,
        other => panic!("expected a combat error, got {other:?}"),
    }
}

/// Start a battle, trade blows until the enemy falls, acknowledge the end,
/// and collect the rewards.
#[tokio::test]
async fn test_complete_battle_scenario() {
    let backend = MockCombatBackend::default();
    backend.push_turn(opening_exchange());
    backend.push_turn(finishing_blow());

    let runtime = runtime_with(&backend).await;
    let handle = runtime.handle();

    // Start
    let session = handle
        .start(LocationId::new("arena"), 3)
        .await
        .expect("Start should succeed");
    assert_eq!((session.player_hp, session.enemy_hp), (100, 50));
    assert_eq!(session.turn_number, 1);

    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Active);

    // Turn 1: perfect timing
    let outcome = handle
        .submit_action(ActionKind::Attack, resolve(0.0))
        .await
        .expect("First action should resolve");
    assert_eq!(outcome.turn_number, 2);
    assert_eq!((outcome.player_hp, outcome.enemy_hp), (92, 30));
    assert!(!outcome.ended);

    // Turn 2: the enemy falls; negative HP is clamped
    let outcome = handle
        .submit_action(ActionKind::Attack, resolve(90.0))
        .await
        .expect("Second action should resolve");
    assert!(outcome.ended);
    assert_eq!(outcome.enemy_hp, 0);
    assert_eq!(outcome.winner, Some(Winner::Player));

    let submitted = backend.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].timing_score.value(), 1.0);
    assert!((submitted[1].timing_score.value() - 0.5).abs() < 1e-9);
    assert_eq!(submitted[1].session_id, session.session_id);

    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Ending);
    let recent = snapshot.session.expect("session kept while ending").recent_actions;
    assert_eq!(recent.len(), 3);

    // Further actions are rejected locally
    let err = handle
        .submit_action(ActionKind::Defend, resolve(0.0))
        .await
        .expect_err("No actions after the battle ended");
    assert_eq!(
        combat_error(err),
        CombatError::InvalidAction(InvalidAction::SessionEnded)
    );
    assert_eq!(backend.calls(Endpoint::Action), 2);

    // End and claim
    handle.end_combat(true).await.expect("End should succeed");
    handle.end_combat(true).await.expect("End is idempotent");
    assert_eq!(backend.calls(Endpoint::End), 1);

    let rewards = handle.claim_rewards().await.expect("Claim should succeed");
    assert!(rewards.is_win());
    assert_eq!(rewards.currency("gold"), 100);

    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Settled);
    assert_eq!(snapshot.settlement, Loadable::Loaded(rewards));

    // Back to idle for the next battle
    handle.reset().await.expect("Reset from Settled");
    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Idle);
    assert!(snapshot.session.is_none());

    drop(handle);
    runtime.shutdown().await.expect("Runtime should shut down");
}

#[tokio::test]
async fn submit_while_idle_is_rejected_without_a_request() {
    let backend = MockCombatBackend::default();
    let runtime = runtime_with(&backend).await;
    let handle = runtime.handle();

    let err = handle
        .submit_action(ActionKind::Attack, resolve(0.0))
        .await
        .expect_err("Idle engine has no session");
    assert_eq!(
        combat_error(err),
        CombatError::InvalidAction(InvalidAction::NotActive {
            phase: EnginePhase::Idle
        })
    );
    assert_eq!(backend.calls(Endpoint::Action), 0);
    assert_eq!(
        handle.snapshot().await.expect("Snapshot").phase,
        EnginePhase::Idle
    );
}

#[tokio::test]
async fn failed_start_can_be_retried() {
    let backend = MockCombatBackend::default();
    backend.fail_next(
        Endpoint::Start,
        CombatError::NetworkUnavailable("connection reset".into()),
    );
    let runtime = runtime_with(&backend).await;
    let handle = runtime.handle();

    let err = handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect_err("First start fails");
    assert!(combat_error(err).is_retryable());

    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Failed);
    assert_eq!(
        snapshot.failure.map(|failure| failure.step),
        Some(FailedStep::Start)
    );

    let session = handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Retry should succeed");
    assert_eq!(session.session_id.as_str(), "mock-1");
    assert_eq!(
        handle.snapshot().await.expect("Snapshot").phase,
        EnginePhase::Active
    );
    assert_eq!(backend.calls(Endpoint::Start), 2);
}

#[tokio::test]
async fn start_is_rejected_while_a_session_is_active() {
    let backend = MockCombatBackend::default();
    let runtime = runtime_with(&backend).await;
    let handle = runtime.handle();

    let session = handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");
    let err = handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect_err("Second start is rejected");
    assert_eq!(
        combat_error(err),
        CombatError::InvalidAction(InvalidAction::SessionInProgress {
            session_id: session.session_id
        })
    );
    assert_eq!(backend.calls(Endpoint::Start), 1);

    let err = handle.reset().await.expect_err("Reset needs a terminal phase");
    assert!(combat_error(err).is_invalid_action());
}

#[tokio::test]
async fn claim_is_issued_once() {
    let backend = MockCombatBackend::default();
    backend.push_turn(finishing_blow());
    let runtime = runtime_with(&backend).await;
    let handle = runtime.handle();

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");
    handle
        .submit_action(ActionKind::Attack, resolve(0.0))
        .await
        .expect("Action");
    handle.end_combat(true).await.expect("End");

    let (first, second) = tokio::join!(handle.claim_rewards(), handle.claim_rewards());
    let first = first.expect("First claim");
    let second = second.expect("Concurrent claim");
    let third = handle.claim_rewards().await.expect("Repeat claim");

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(backend.calls(Endpoint::Claim), 1);
}

#[tokio::test]
async fn failed_claim_keeps_session_for_retry() {
    let backend = MockCombatBackend::default();
    backend.push_turn(finishing_blow());
    backend.fail_next(Endpoint::Claim, CombatError::server(503, "maintenance"));
    let runtime = runtime_with(&backend).await;
    let handle = runtime.handle();

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");
    handle
        .submit_action(ActionKind::Attack, resolve(0.0))
        .await
        .expect("Action");
    handle.end_combat(true).await.expect("End");

    let err = handle.claim_rewards().await.expect_err("Claim fails once");
    assert_eq!(combat_error(err), CombatError::server(503, "maintenance"));

    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Failed);
    assert!(snapshot.session.is_some());
    assert!(matches!(snapshot.settlement, Loadable::Failed(_)));

    let rewards = handle.claim_rewards().await.expect("Claim retry");
    assert!(rewards.is_win());
    assert_eq!(backend.calls(Endpoint::Claim), 2);
    assert_eq!(
        handle.snapshot().await.expect("Snapshot").phase,
        EnginePhase::Settled
    );
}

#[tokio::test]
async fn conflict_during_turn_fails_the_session() {
    let backend = MockCombatBackend::default();
    backend.fail_next(
        Endpoint::Action,
        CombatError::SessionConflict("session expired".into()),
    );
    let runtime = runtime_with(&backend).await;
    let handle = runtime.handle();

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");
    let err = handle
        .submit_action(ActionKind::Defend, resolve(45.0))
        .await
        .expect_err("Conflict surfaces");
    assert!(combat_error(err).requires_reset());

    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Failed);

    handle.reset().await.expect("Reset from Failed");
    assert_eq!(
        handle.snapshot().await.expect("Snapshot").phase,
        EnginePhase::Idle
    );
}

#[tokio::test]
async fn transient_turn_failure_keeps_session_active() {
    let backend = MockCombatBackend::default();
    backend.fail_next(
        Endpoint::Action,
        CombatError::NetworkUnavailable("timed out".into()),
    );
    backend.push_turn(opening_exchange());
    let runtime = runtime_with(&backend).await;
    let handle = runtime.handle();

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");
    handle
        .submit_action(ActionKind::Attack, resolve(0.0))
        .await
        .expect_err("Network drop");

    let snapshot = handle.snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Active);
    assert_eq!(snapshot.session.expect("session").turn_number, 1);

    let outcome = handle
        .submit_action(ActionKind::Attack, resolve(0.0))
        .await
        .expect("Retry resolves");
    assert_eq!(outcome.turn_number, 2);
}

#[tokio::test]
async fn resumed_session_matches_a_started_one() {
    let started_backend = MockCombatBackend::default();
    started_backend.push_turn(opening_exchange());
    started_backend.push_turn(finishing_blow());
    let started = runtime_with(&started_backend).await;
    let session = started
        .handle()
        .start(LocationId::new("arena"), 2)
        .await
        .expect("Start");

    // Same session, held by the backend of a fresh process
    let resumed_backend = MockCombatBackend::default();
    resumed_backend.push_turn(opening_exchange());
    resumed_backend.push_turn(finishing_blow());
    resumed_backend.set_active_session(session.clone());
    let resumed = runtime_with(&resumed_backend).await;

    let outcome = resumed.resumption().check().await.expect("Resume check");
    assert_eq!(outcome, ResumeOutcome::Resumed(session));

    let runtimes = [&started, &resumed];
    assert_same_state(runtimes, EnginePhase::Active).await;

    for turn in [2, 3] {
        let mut outcomes = Vec::new();
        for runtime in runtimes {
            outcomes.push(
                runtime
                    .handle()
                    .submit_action(ActionKind::Attack, resolve(0.0))
                    .await
                    .expect("Action"),
            );
        }
        assert_eq!(outcomes[0], outcomes[1]);
        assert_eq!(outcomes[0].turn_number, turn);
    }
    assert_same_state(runtimes, EnginePhase::Ending).await;

    for runtime in runtimes {
        runtime.handle().end_combat(true).await.expect("End");
    }
    assert_same_state(runtimes, EnginePhase::RewardsPending).await;

    let mut rewards = Vec::new();
    for runtime in runtimes {
        rewards.push(runtime.handle().claim_rewards().await.expect("Claim"));
    }
    assert_eq!(rewards[0], rewards[1]);
    assert!(rewards[0].is_win());
    assert_same_state(runtimes, EnginePhase::Settled).await;

    assert_eq!(started_backend.calls(Endpoint::Claim), 1);
    assert_eq!(resumed_backend.calls(Endpoint::Claim), 1);
}

#[tokio::test]
async fn resumption_without_backend_session_stays_idle() {
    let backend = MockCombatBackend::default();
    let runtime = runtime_with(&backend).await;

    let outcome = runtime.resumption().check().await.expect("Resume check");
    assert_eq!(outcome, ResumeOutcome::NoActiveSession);
    assert!(!outcome.is_resumed());
    assert_eq!(
        runtime.handle().snapshot().await.expect("Snapshot").phase,
        EnginePhase::Idle
    );
}

#[tokio::test]
async fn failed_resumption_leaves_engine_unchanged() {
    let backend = MockCombatBackend::default();
    backend.fail_next(Endpoint::ActiveSession, CombatError::Unauthenticated);
    let runtime = runtime_with(&backend).await;

    let err = runtime
        .resumption()
        .check()
        .await
        .expect_err("Lookup fails");
    assert_eq!(combat_error(err), CombatError::Unauthenticated);

    let snapshot = runtime.handle().snapshot().await.expect("Snapshot");
    assert_eq!(snapshot.phase, EnginePhase::Idle);
    assert!(snapshot.in_flight.is_none());
}

#[tokio::test]
async fn lifecycle_events_follow_the_phases() {
    let backend = MockCombatBackend::default();
    backend.push_turn(finishing_blow());
    let runtime = runtime_with(&backend).await;
    let handle = runtime.handle();
    let mut sessions = handle.subscribe(Topic::Session);
    let mut settlement = handle.subscribe(Topic::Settlement);

    handle
        .start(LocationId::new("arena"), 1)
        .await
        .expect("Start");
    handle
        .submit_action(ActionKind::Attack, resolve(0.0))
        .await
        .expect("Action");
    handle.end_combat(true).await.expect("End");
    handle.claim_rewards().await.expect("Claim");

    let mut phases = Vec::new();
    let mut started = 0;
    let mut ended = 0;
    while let Ok(event) = sessions.try_recv() {
        match event {
            Event::Session(SessionEvent::PhaseChanged { from, to }) => phases.push((from, to)),
            Event::Session(SessionEvent::Started { .. }) => started += 1,
            Event::Session(SessionEvent::Ended { winner, .. }) => {
                assert_eq!(winner, Some(Winner::Player));
                ended += 1;
            }
            _ => {}
        }
    }
    assert_eq!(
        phases,
        vec![
            (EnginePhase::Idle, EnginePhase::Starting),
            (EnginePhase::Starting, EnginePhase::Active),
            (EnginePhase::Active, EnginePhase::Ending),
            (EnginePhase::Ending, EnginePhase::RewardsPending),
            (EnginePhase::RewardsPending, EnginePhase::Settled),
        ]
    );
    assert_eq!((started, ended), (1, 1));

    let mut statuses = Vec::new();
    while let Ok(Event::Settlement(SettlementEvent::StatusChanged { status })) =
        settlement.try_recv()
    {
        statuses.push(status);
    }
    assert_eq!(statuses.len(), 2);
    assert!(statuses[0].is_loading());
    assert!(statuses[1].loaded().is_some());
}

#[tokio::test]
async fn builder_requires_a_client() {
    let result = CombatRuntime::builder().build().await;
    assert!(matches!(result, Err(RuntimeError::MissingClient)));
}
