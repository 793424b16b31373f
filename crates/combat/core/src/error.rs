//! Error taxonomy for combat operations.
//!
//! [`CombatError`] is the closed set of failures the engine surfaces to
//! callers. Backend gateways classify transport and HTTP failures into it, and
//! the engine adds its own local rejections under [`CombatError::InvalidAction`].
//!
//! # Recovery Classes
//!
//! - **Retryable**: `NetworkUnavailable`, `ServerError` (same operation may succeed later)
//! - **Re-authenticate**: `Unauthenticated` (never retried automatically)
//! - **Reset required**: `SessionConflict` (local session no longer matches backend)
//! - **No-op**: `InvalidAction` (rejected action, session untouched)
//! - **Contract bug**: `Decoding` (malformed response, always logged loudly)

use thiserror::Error;

use crate::engine::EnginePhase;
use crate::session::SessionId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombatError {
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("caller is not authenticated")]
    Unauthenticated,

    #[error("session conflict: {0}")]
    SessionConflict(String),

    #[error("invalid action: {0}")]
    InvalidAction(#[from] InvalidAction),

    #[error("server error {code}: {message}")]
    ServerError { code: u16, message: String },

    #[error("malformed backend response: {0}")]
    Decoding(String),
}

impl CombatError {
    /// Returns true if the caller may retry the same operation unchanged.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkUnavailable(_) | Self::ServerError { .. })
    }

    /// Returns true for rejected actions, whether rejected locally or by the backend.
    pub const fn is_invalid_action(&self) -> bool {
        matches!(self, Self::InvalidAction(_))
    }

    /// Returns true if the session must be reset before the player can continue.
    pub const fn requires_reset(&self) -> bool {
        matches!(self, Self::SessionConflict(_) | Self::Decoding(_))
    }

    pub fn server(code: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
        }
    }
}

/// Reasons an action was not applied.
///
/// Only [`InvalidAction::Backend`] originates from the server; every other
/// variant is a client-side fast-path rejection that leaves engine state as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAction {
    #[error("backend rejected the action: {0}")]
    Backend(String),

    #[error("operation not allowed while {phase}")]
    NotActive { phase: EnginePhase },

    #[error("session has already ended")]
    SessionEnded,

    #[error("a turn is already being resolved")]
    TurnInFlight,

    #[error("session {session_id} is already in progress")]
    SessionInProgress { session_id: SessionId },

    #[error("{operation} is already in flight")]
    OperationInFlight { operation: &'static str },

    #[error("reset is only allowed from a terminal phase (currently {phase})")]
    NotTerminal { phase: EnginePhase },

    #[error("response belongs to a superseded session")]
    Superseded,
}
