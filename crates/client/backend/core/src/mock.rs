//! In-memory combat backend for tests and offline development.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use combat_core::{
    CombatError, CombatRewards, CombatSession, CombatStats, Enemy, SessionId, TurnResolution,
};
use tokio::sync::{Notify, Semaphore};

use crate::traits::{CombatActionClient, Endpoint};
use crate::types::{
    ClaimRewardsRequest, EndCombatRequest, StartCombatRequest, StartCombatResponse,
    SubmitActionRequest,
};

/// Mock backend that simulates the authoritative server in memory.
///
/// Turn outcomes are scripted with [`push_turn`](Self::push_turn); failures are
/// injected per endpoint with [`fail_next`](Self::fail_next) and consumed
/// before any scripted success. Claims are deduplicated per session like the
/// real backend. Clones share state.
#[derive(Clone)]
pub struct MockCombatBackend {
    state: Arc<Mutex<MockState>>,
    turn_gate: Option<Arc<Semaphore>>,
    turn_arrived: Arc<Notify>,
}

struct MockState {
    next_session: u64,
    start_template: StartCombatResponse,
    reward_template: CombatRewards,
    turns: VecDeque<TurnResolution>,
    failures: HashMap<Endpoint, VecDeque<CombatError>>,
    calls: HashMap<Endpoint, usize>,
    submitted: Vec<SubmitActionRequest>,
    completed_turns: usize,
    active: Option<CombatSession>,
    ended: HashMap<SessionId, bool>,
    granted: HashMap<SessionId, CombatRewards>,
}

impl MockCombatBackend {
    pub fn new(reward_template: CombatRewards) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                next_session: 0,
                start_template: StartCombatResponse {
                    session_id: SessionId::new(""),
                    enemy: Enemy {
                        name: "Training Dummy".into(),
                        level: 1,
                        stats: CombatStats {
                            atk_power: 4,
                            atk_accuracy: 50,
                            def_power: 2,
                            def_accuracy: 10,
                        },
                    },
                    player_stats: CombatStats {
                        atk_power: 10,
                        atk_accuracy: 80,
                        def_power: 5,
                        def_accuracy: 30,
                    },
                    player_hp: 100,
                    enemy_hp: 50,
                },
                reward_template,
                turns: VecDeque::new(),
                failures: HashMap::new(),
                calls: HashMap::new(),
                submitted: Vec::new(),
                completed_turns: 0,
                active: None,
                ended: HashMap::new(),
                granted: HashMap::new(),
            })),
            turn_gate: None,
            turn_arrived: Arc::new(Notify::new()),
        }
    }

    /// Holds every `submit_action` until [`release_turn`](Self::release_turn) is called.
    #[must_use]
    pub fn gated(mut self) -> Self {
        self.turn_gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Overrides the enemy and HP values returned by `start_combat`.
    pub fn set_start(&self, enemy: Enemy, player_hp: i64, enemy_hp: i64) {
        let mut state = self.lock();
        state.start_template.enemy = enemy;
        state.start_template.player_hp = player_hp;
        state.start_template.enemy_hp = enemy_hp;
    }

    pub fn push_turn(&self, resolution: TurnResolution) {
        self.lock().turns.push_back(resolution);
    }

    pub fn fail_next(&self, endpoint: Endpoint, error: CombatError) {
        self.lock()
            .failures
            .entry(endpoint)
            .or_default()
            .push_back(error);
    }

    /// Seeds a backend-held session, as if started by an earlier process.
    pub fn set_active_session(&self, session: CombatSession) {
        self.lock().active = Some(session);
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    pub fn submitted(&self) -> Vec<SubmitActionRequest> {
        self.lock().submitted.clone()
    }

    pub fn release_turn(&self) {
        if let Some(gate) = &self.turn_gate {
            gate.add_permits(1);
        }
    }

    /// Number of `submit_action` calls that have produced a result.
    pub fn completed_turns(&self) -> usize {
        self.lock().completed_turns
    }

    /// Waits until a gated `submit_action` has reached the backend.
    pub async fn turn_requested(&self) {
        self.turn_arrived.notified().await;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call and pops an injected failure, if any.
    fn record(&self, endpoint: Endpoint) -> Result<(), CombatError> {
        let mut state = self.lock();
        *state.calls.entry(endpoint).or_default() += 1;
        match state.failures.get_mut(&endpoint).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn expect_session(state: &MockState, session_id: &SessionId) -> Result<(), CombatError> {
        match &state.active {
            Some(active) if &active.session_id == session_id => Ok(()),
            _ if state.ended.contains_key(session_id) => Ok(()),
            _ => Err(CombatError::SessionConflict(format!(
                "no active session {session_id}"
            ))),
        }
    }
}

impl Default for MockCombatBackend {
    fn default() -> Self {
        Self::new(CombatRewards {
            result: combat_core::CombatResult::Win,
            currencies: [("gold".to_string(), 100)].into_iter().collect(),
            items: Vec::new(),
            materials: Vec::new(),
            experience: Some(25),
        })
    }
}

#[async_trait]
impl CombatActionClient for MockCombatBackend {
    async fn start_combat(&self, request: &StartCombatRequest) -> Result<CombatSession, CombatError> {
        self.record(Endpoint::Start)?;

        let mut state = self.lock();
        state.next_session += 1;
        let mut response = state.start_template.clone();
        response.session_id = SessionId::new(format!("mock-{}", state.next_session));

        let session = response.into_session(request.location_id.clone());
        state.active = Some(session.clone());
        Ok(session)
    }

    async fn submit_action(
        &self,
        request: &SubmitActionRequest,
    ) -> Result<TurnResolution, CombatError> {
        self.record(Endpoint::Action)?;
        self.lock().submitted.push(request.clone());

        if let Some(gate) = &self.turn_gate {
            self.turn_arrived.notify_one();
            let permit = gate
                .acquire()
                .await
                .map_err(|_| CombatError::NetworkUnavailable("mock gate closed".into()))?;
            permit.forget();
        }

        let mut state = self.lock();
        state.completed_turns += 1;
        Self::expect_session(&state, &request.session_id)?;

        let resolution = state.turns.pop_front().ok_or_else(|| {
            CombatError::server(500, "mock backend has no scripted turn")
        })?;

        if let Some(active) = state.active.as_mut() {
            active.apply_resolution(&resolution);
        }
        Ok(resolution)
    }

    async fn end_combat(&self, request: &EndCombatRequest) -> Result<(), CombatError> {
        self.record(Endpoint::End)?;

        let mut state = self.lock();
        Self::expect_session(&state, &request.session_id)?;
        if state
            .active
            .as_ref()
            .is_some_and(|s| s.session_id == request.session_id)
        {
            state.active = None;
        }
        state.ended.insert(request.session_id.clone(), request.won);
        Ok(())
    }

    async fn claim_rewards(
        &self,
        request: &ClaimRewardsRequest,
    ) -> Result<CombatRewards, CombatError> {
        self.record(Endpoint::Claim)?;

        let mut state = self.lock();
        if !state.ended.contains_key(&request.session_id) {
            return Err(CombatError::SessionConflict(format!(
                "session {} has not ended",
                request.session_id
            )));
        }

        let template = state.reward_template.clone();
        let grant = state
            .granted
            .entry(request.session_id.clone())
            .or_insert(template);
        Ok(grant.clone())
    }

    async fn get_active_session(&self) -> Result<Option<CombatSession>, CombatError> {
        self.record(Endpoint::ActiveSession)?;
        Ok(self.lock().active.clone())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}
