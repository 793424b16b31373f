//! Runtime orchestration for a combat session.
//!
//! This crate hosts a [`combat_core::CombatEngine`] inside a background worker
//! that issues backend calls through a
//! [`CombatActionClient`](client_backend_core::CombatActionClient). Consumers
//! embed [`CombatRuntime`] to drive a battle through [`EngineHandle`] and
//! subscribe to events.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`resumption`] restores a backend-held battle after a restart
//! - `workers` keeps background tasks internal to the crate
pub mod api;
pub mod events;
pub mod resumption;
pub mod runtime;

mod workers;

pub use api::{EngineHandle, Result, RuntimeError};
pub use events::{Event, EventBus, SessionEvent, SettlementEvent, Topic, TurnEvent};
pub use resumption::{ResumeOutcome, SessionResumption};
pub use runtime::{CombatRuntime, RuntimeBuilder, RuntimeConfig};
