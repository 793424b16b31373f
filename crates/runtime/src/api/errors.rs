//! Unified error types surfaced by the runtime API.
//!
//! Wraps engine and backend failures together with worker coordination
//! failures so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use combat_core::CombatError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error("engine worker command channel closed")]
    CommandChannelClosed,

    #[error("engine worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("engine worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("runtime requires a combat backend client before building")]
    MissingClient,
}

impl RuntimeError {
    /// The combat error behind this failure, if it came from the engine or backend.
    pub fn combat(&self) -> Option<&CombatError> {
        match self {
            RuntimeError::Combat(err) => Some(err),
            _ => None,
        }
    }
}
