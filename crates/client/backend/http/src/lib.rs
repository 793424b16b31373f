//! HTTP gateway to the combat backend.
//!
//! [`HttpCombatClient`] implements
//! [`CombatActionClient`](client_backend_core::CombatActionClient) over JSON
//! and bearer-token auth. Failures are classified into
//! [`combat_core::CombatError`] by [`classify`]; nothing here retries.

pub mod classify;
pub mod client;
pub mod config;

pub use client::HttpCombatClient;
pub use config::{BackendRoutes, ConfigError, HttpBackendConfig};
