//! Restart-time lookup of a battle the backend still holds.

use combat_core::CombatSession;
use tracing::info;

use crate::api::{EngineHandle, Result};

/// Result of a resumption check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The engine now holds the backend's session, as if it had just started.
    Resumed(CombatSession),
    /// Nothing to resume; the engine is unchanged.
    NoActiveSession,
}

impl ResumeOutcome {
    pub fn is_resumed(&self) -> bool {
        matches!(self, ResumeOutcome::Resumed(_))
    }
}

/// Asks the backend for an active battle and installs it in the engine.
///
/// Run once on launch before offering a new battle. Valid while the engine is
/// idle or failed; a failed lookup leaves the engine untouched.
pub struct SessionResumption {
    handle: EngineHandle,
}

impl SessionResumption {
    pub fn new(handle: EngineHandle) -> Self {
        Self { handle }
    }

    pub async fn check(&self) -> Result<ResumeOutcome> {
        match self.handle.resume().await? {
            Some(session) => {
                info!(
                    session_id = %session.session_id,
                    turn = session.turn_number,
                    "Resumed combat session from backend"
                );
                Ok(ResumeOutcome::Resumed(session))
            }
            None => {
                info!("No active combat session to resume");
                Ok(ResumeOutcome::NoActiveSession)
            }
        }
    }
}
