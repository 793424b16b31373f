//! Lifecycle phases and in-flight bookkeeping.

use serde::Serialize;

use crate::error::CombatError;
use crate::session::SessionId;

/// Lifecycle phase of the engine.
///
/// ```text
/// Idle → Starting → Active → Ending → RewardsPending → Settled
///          └──────────┴────────┴──────────┴──→ Failed
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnginePhase {
    #[default]
    Idle,
    Starting,
    Active,
    Ending,
    RewardsPending,
    Settled,
    Failed,
}

impl EnginePhase {
    /// Phases from which [`reset`](super::CombatEngine::reset) is allowed.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Failed)
    }

    /// Phases in which a backend session exists locally.
    pub const fn has_session(self) -> bool {
        matches!(
            self,
            Self::Active | Self::Ending | Self::RewardsPending | Self::Settled
        )
    }
}

/// Step that was being attempted when the engine entered [`EnginePhase::Failed`].
///
/// Retrying the matching operation resumes from this step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailedStep {
    Start,
    Turn,
    End,
    Claim,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub step: FailedStep,
    pub error: CombatError,
}

/// Backend operation currently awaiting a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, strum::Display, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InFlight {
    Start,
    Turn,
    End,
    Claim,
    Resume,
}

/// Tag issued when a backend call begins.
///
/// A completion is applied only if its ticket still matches the engine's
/// generation and session; anything else is a late response for a session
/// that was reset, abandoned, or replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub(crate) generation: u64,
    pub(crate) session_id: Option<SessionId>,
    pub(crate) operation: InFlight,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn operation(&self) -> InFlight {
        self.operation
    }
}
