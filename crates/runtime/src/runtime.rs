//! High-level runtime orchestrator.
//!
//! The runtime owns the engine worker, wires up command/event channels, and
//! exposes a builder-based API for clients to drive a battle.

use std::env;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use client_backend_core::CombatActionClient;
use combat_core::{CombatEngine, DEFAULT_RECENT_ACTIONS};

use crate::api::{EngineHandle, Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::resumption::SessionResumption;
use crate::workers::{Command, EngineWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Capacity of the session's recent action log
    pub recent_actions: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 100,
            command_buffer_size: 32,
            recent_actions: DEFAULT_RECENT_ACTIONS,
        }
    }
}

impl RuntimeConfig {
    /// Construct configuration from process environment variables.
    ///
    /// - `COMBAT_EVENT_BUFFER` - Per-topic event capacity (default: 100)
    /// - `COMBAT_COMMAND_BUFFER` - Command queue size (default: 32)
    /// - `COMBAT_RECENT_ACTIONS` - Recent action log capacity (default: 10)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(capacity) = read_env::<usize>("COMBAT_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }

        if let Some(capacity) = read_env::<usize>("COMBAT_COMMAND_BUFFER") {
            config.command_buffer_size = capacity.max(1);
        }

        if let Some(capacity) = read_env::<usize>("COMBAT_RECENT_ACTIONS") {
            config.recent_actions = capacity.max(1);
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

/// Main runtime that hosts one combat engine.
///
/// Design: the runtime owns the worker; [`EngineHandle`] provides a cloneable
/// façade for clients.
pub struct CombatRuntime {
    handle: EngineHandle,
    worker_handle: JoinHandle<()>,
}

impl CombatRuntime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    pub fn resumption(&self) -> SessionResumption {
        SessionResumption::new(self.handle())
    }

    /// Shutdown the runtime gracefully
    ///
    /// Waits for the worker to finish in-flight backend calls. Outstanding
    /// handle clones keep the worker alive until they are dropped too.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.handle);

        self.worker_handle.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`CombatRuntime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    client: Option<Arc<dyn CombatActionClient>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            client: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the backend gateway (required)
    pub fn client(mut self, client: impl CombatActionClient + 'static) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Set a backend gateway that is shared with other owners
    pub fn shared_client(mut self, client: Arc<dyn CombatActionClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the runtime and spawn its worker
    pub async fn build(self) -> Result<CombatRuntime> {
        let client = self.client.ok_or(RuntimeError::MissingClient)?;

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);

        let handle = EngineHandle::new(command_tx, event_bus.clone());

        let engine = CombatEngine::new(self.config.recent_actions);
        let worker = EngineWorker::new(engine, client, command_rx, event_bus);

        let worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        Ok(CombatRuntime {
            handle,
            worker_handle,
        })
    }
}
