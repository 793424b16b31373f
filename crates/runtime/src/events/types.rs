//! Event types for different topics.

use combat_core::{
    CombatError, CombatRewards, CombatSession, EnginePhase, FailedStep, Loadable, SessionId,
    TurnOutcome, Winner,
};

/// Battle lifecycle events.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new battle was started on the backend.
    Started { session: CombatSession },

    /// A backend-held battle was installed after a restart.
    Resumed { session: CombatSession },

    /// The engine moved between phases.
    PhaseChanged { from: EnginePhase, to: EnginePhase },

    /// The backend acknowledged the end of the battle.
    Ended {
        session_id: SessionId,
        winner: Option<Winner>,
    },

    /// A backend step failed and can be retried or reset.
    Failed { step: FailedStep, error: CombatError },

    /// The engine returned to idle.
    Cleared,
}

/// Events related to turn resolution.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// The backend resolved a submitted action.
    Resolved {
        session_id: SessionId,
        outcome: TurnOutcome,
    },

    /// A submitted action was rejected; the session stays as it was unless a
    /// [`SessionEvent::Failed`] follows.
    Rejected { error: CombatError },
}

/// Reward settlement status changes.
#[derive(Debug, Clone)]
pub enum SettlementEvent {
    StatusChanged { status: Loadable<CombatRewards> },
}
