//! Terminal client for the combat runtime.
//!
//! ```text
//! stdin ─→ ArenaCommand ─→ BattleDriver ─→ EngineHandle ─→ engine worker ─→ backend
//!                                                              │
//!                                            event log  ←──────┘
//! ```
//!
//! The binary is the composition root: it reads [`ArenaConfig`], sets up
//! logging, builds the HTTP client and the runtime, and then hands each prompt
//! line to the [`BattleDriver`].

pub mod command;
pub mod config;
pub mod driver;
pub mod logging;

pub use command::{ArenaCommand, ParseCommandError};
pub use config::ArenaConfig;
pub use driver::{BattleDriver, Flow, spawn_event_log};
