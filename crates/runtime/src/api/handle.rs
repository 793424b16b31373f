//! Cloneable façade for issuing commands to the engine worker.
//!
//! [`EngineHandle`] hides channel plumbing and offers async helpers for each
//! battle operation plus topic subscriptions for observers.
//!
//! Dropping a returned future does not cancel the backend call behind it: the
//! worker still applies the result, the caller just never sees it. Use
//! [`EngineHandle::abandon`] to discard late results.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use combat_core::{
    ActionKind, CombatRewards, CombatSession, EngineSnapshot, LocationId, TimingScore,
    TurnOutcome,
};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::{Command, Reply};

/// Client-facing handle to interact with the combat engine
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl EngineHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    /// Start a battle at `location_id`.
    pub async fn start(
        &self,
        location_id: LocationId,
        recommended_level: u32,
    ) -> Result<CombatSession> {
        self.request(|reply| Command::Start {
            location_id,
            recommended_level,
            reply,
        })
        .await
    }

    /// Submit one timed action for the current turn.
    pub async fn submit_action(
        &self,
        kind: ActionKind,
        timing_score: TimingScore,
    ) -> Result<TurnOutcome> {
        self.request(|reply| Command::SubmitAction {
            kind,
            timing_score,
            reply,
        })
        .await
    }

    /// Acknowledge the end of a battle that reached a terminal state.
    pub async fn end_combat(&self, won: bool) -> Result<()> {
        self.request(|reply| Command::EndCombat { won, reply }).await
    }

    /// Claim the rewards of an acknowledged battle.
    ///
    /// Repeat calls return the cached grant without another request.
    pub async fn claim_rewards(&self) -> Result<CombatRewards> {
        self.request(|reply| Command::ClaimRewards { reply }).await
    }

    /// Look up a backend-held session and install it. `None` when the backend
    /// has no active battle for this player.
    pub async fn resume(&self) -> Result<Option<CombatSession>> {
        self.request(|reply| Command::Resume { reply }).await
    }

    /// Return to idle from `Settled` or `Failed`.
    pub async fn reset(&self) -> Result<()> {
        self.request(|reply| Command::Reset { reply }).await
    }

    /// Tear the battle down from any phase.
    pub async fn abandon(&self) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::Abandon { reply: reply_tx })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Query the current engine state (read-only snapshot)
    pub async fn snapshot(&self) -> Result<EngineSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Session` - Lifecycle, phase changes, and failures
    /// - `Topic::Turn` - Resolved and rejected actions
    /// - `Topic::Settlement` - Reward claim status
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        let result = reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?;
        Ok(result?)
    }
}
