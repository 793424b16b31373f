//! Worker tasks that back the runtime orchestration.
//!
//! The engine worker owns the combat engine and issues backend calls on its
//! behalf.

mod engine;

pub use engine::{Command, EngineWorker, Reply};
