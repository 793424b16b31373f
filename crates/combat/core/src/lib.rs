//! Combat session model and lifecycle rules shared by the runtime and clients.
//!
//! `combat-core` holds everything about a battle that does not touch the
//! network: the [`CombatSession`] snapshot, the reward payloads, the
//! [`TimingCurve`] used to score dial gestures, and the synchronous
//! [`CombatEngine`] state machine. Backend calls are driven by the runtime,
//! which feeds their results back through the engine's `complete_*` methods.
pub mod engine;
pub mod error;
pub mod rewards;
pub mod session;
pub mod settlement;
pub mod timing;

pub use engine::{
    ClaimStep, CombatEngine, EndStep, EnginePhase, EngineSnapshot, FailedStep, Failure, InFlight,
    Ticket, TurnOutcome,
};
pub use error::{CombatError, InvalidAction};
pub use rewards::{CombatResult, CombatRewards, ItemDrop, MaterialDrop};
pub use session::{
    ActionKind, ActionLogEntry, CombatSession, CombatStats, Enemy, LocationId, PerformerId,
    RecentActions, SessionId, SessionState, TurnResolution, Winner, DEFAULT_RECENT_ACTIONS,
};
pub use settlement::{Loadable, RewardSettlement};
pub use timing::{TimingCurve, TimingScore, resolve};
