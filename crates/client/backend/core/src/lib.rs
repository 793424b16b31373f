//! Backend gateway abstraction for combat sessions.
//!
//! This crate defines how the combat runtime talks to the authoritative game
//! backend without committing to a transport.
//!
//! # Architecture
//!
//! ```text
//! CombatActionClient (trait)
//!   ├── start_combat / submit_action / end_combat / claim_rewards
//!   └── get_active_session (resumption)
//!
//! Implementations:
//!   ├── client-backend-http  (reqwest, production)
//!   └── MockCombatBackend    (in-memory, feature = "mock")
//! ```
//!
//! Gateways shape requests and classify failures into
//! [`combat_core::CombatError`]. They never retry; retry policy belongs to the
//! caller because only some calls are idempotent.

pub mod traits;
pub mod types;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use traits::{CombatActionClient, Endpoint};
pub use types::{
    ActiveSessionPayload, ClaimRewardsRequest, EndCombatRequest, StartCombatRequest,
    StartCombatResponse, SubmitActionRequest, SubmitActionResponse,
};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockCombatBackend;
