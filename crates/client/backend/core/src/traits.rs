//! Combat backend gateway trait.

use async_trait::async_trait;
use combat_core::{CombatError, CombatRewards, CombatSession, TurnResolution};

use crate::types::{ClaimRewardsRequest, EndCombatRequest, StartCombatRequest, SubmitActionRequest};

/// Backend endpoints consumed by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Endpoint {
    Start,
    Action,
    End,
    Claim,
    ActiveSession,
}

/// Request/response gateway to the authoritative combat backend.
///
/// Implementations own no business state. Every request issued after start
/// carries the backend session id so stale or duplicate submissions can be
/// rejected server-side. Implementations must not retry.
#[async_trait]
pub trait CombatActionClient: Send + Sync {
    /// Start a battle at a location. The returned session is `Active`.
    async fn start_combat(&self, request: &StartCombatRequest) -> Result<CombatSession, CombatError>;

    /// Submit one timed action and return the backend's resolution of the turn.
    async fn submit_action(
        &self,
        request: &SubmitActionRequest,
    ) -> Result<TurnResolution, CombatError>;

    /// Acknowledge the terminal state. Idempotent by session id on the backend.
    async fn end_combat(&self, request: &EndCombatRequest) -> Result<(), CombatError>;

    /// Claim the grant for a finished battle. Repeat calls return the same grant.
    async fn claim_rewards(
        &self,
        request: &ClaimRewardsRequest,
    ) -> Result<CombatRewards, CombatError>;

    /// Look up the caller's active battle, if the backend holds one.
    async fn get_active_session(&self) -> Result<Option<CombatSession>, CombatError>;

    /// Human-readable backend name for logs (e.g. "http", "mock").
    fn backend_name(&self) -> &str;
}
