//! Line-oriented battle driver.
//!
//! Turns [`ArenaCommand`]s into engine calls and renders the results as plain
//! text. Combat errors are shown to the player and the prompt continues; only
//! runtime plumbing failures end the session.

use std::fmt::Write as _;

use combat_core::{
    CombatError, CombatRewards, CombatSession, EngineSnapshot, Loadable, TimingCurve,
    TurnOutcome, Winner,
};
use combat_runtime::{
    EngineHandle, Event, RuntimeError, SessionEvent, SettlementEvent, Topic, TurnEvent,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::command::{ArenaCommand, HELP};
use crate::config::ArenaConfig;

/// What the prompt should do after a command.
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue(String),
    Quit,
}

pub struct BattleDriver {
    handle: EngineHandle,
    curve: TimingCurve,
    config: ArenaConfig,
}

impl BattleDriver {
    pub fn new(handle: EngineHandle, config: ArenaConfig) -> Self {
        Self {
            handle,
            curve: config.timing_curve(),
            config,
        }
    }

    /// Runs one command. `Err` only for failures of the runtime itself.
    pub async fn execute(&self, command: ArenaCommand) -> Result<Flow, RuntimeError> {
        match self.dispatch(command).await {
            Ok(flow) => Ok(flow),
            Err(RuntimeError::Combat(err)) => Ok(Flow::Continue(render_error(&err))),
            Err(err) => Err(err),
        }
    }

    async fn dispatch(&self, command: ArenaCommand) -> Result<Flow, RuntimeError> {
        let text = match command {
            ArenaCommand::Start {
                location_id,
                recommended_level,
            } => {
                let location_id = location_id.unwrap_or_else(|| self.config.location_id.clone());
                let level = recommended_level.unwrap_or(self.config.recommended_level);
                let session = self.handle.start(location_id, level).await?;
                render_session(&session)
            }
            ArenaCommand::Act { kind, angle } => {
                let score = self.curve.resolve(angle);
                let outcome = self.handle.submit_action(kind, score).await?;
                format!("{kind} at {angle}° (timing {score})\n{}", render_outcome(&outcome))
            }
            ArenaCommand::End => {
                let won = self.player_won().await?;
                self.handle.end_combat(won).await?;
                format!("Battle over: {}. Type `claim` for rewards.", if won { "victory" } else { "defeat" })
            }
            ArenaCommand::Claim => render_rewards(&self.handle.claim_rewards().await?),
            ArenaCommand::Status => render_snapshot(&self.handle.snapshot().await?),
            ArenaCommand::Reset => {
                self.handle.reset().await?;
                "Back at the menu. Type `start` for a new battle.".to_string()
            }
            ArenaCommand::Abandon => {
                self.handle.abandon().await?;
                "Battle abandoned.".to_string()
            }
            ArenaCommand::Help => HELP.to_string(),
            ArenaCommand::Quit => return Ok(Flow::Quit),
        };
        Ok(Flow::Continue(text))
    }

    /// Outcome to acknowledge, read from the engine's recorded winner.
    async fn player_won(&self) -> Result<bool, RuntimeError> {
        let snapshot = self.handle.snapshot().await?;
        Ok(snapshot.session.is_some_and(|session| match session.winner {
            Some(winner) => winner == Winner::Player,
            None => session.enemy_hp == 0 && session.player_hp > 0,
        }))
    }
}

pub fn render_session(session: &CombatSession) -> String {
    let mut out = format!(
        "Battle {} at {}: you ({}/{} HP) vs {} lv{} ({}/{} HP), turn {}",
        session.session_id,
        session.location_id,
        session.player_hp,
        session.player_max_hp,
        session.enemy.name,
        session.enemy.level,
        session.enemy_hp,
        session.enemy_max_hp,
        session.turn_number,
    );
    for entry in session.recent_actions.iter() {
        let _ = write!(
            out,
            "\n  turn {}: {} {}",
            entry.turn_number, entry.performer_id, entry.action_kind
        );
        if let Some(damage) = entry.damage_dealt {
            let _ = write!(out, " for {damage}");
        }
    }
    out
}

pub fn render_outcome(outcome: &TurnOutcome) -> String {
    let mut out = String::new();
    for entry in &outcome.actions {
        let _ = write!(out, "  {} {}", entry.performer_id, entry.action_kind);
        match entry.damage_dealt {
            Some(damage) => {
                let _ = writeln!(out, " for {damage}");
            }
            None => out.push('\n'),
        }
    }
    let _ = write!(
        out,
        "Turn {}: you {} HP, enemy {} HP",
        outcome.turn_number, outcome.player_hp, outcome.enemy_hp
    );
    if outcome.ended {
        let verdict = match outcome.winner {
            Some(Winner::Player) => "You win!",
            Some(Winner::Enemy) => "You were defeated.",
            None => "The battle is over.",
        };
        let _ = write!(out, "\n{verdict} Type `end` to finish.");
    }
    out
}

pub fn render_rewards(rewards: &CombatRewards) -> String {
    let mut out = format!("Rewards ({:?}):", rewards.result);
    for (code, amount) in &rewards.currencies {
        let _ = write!(out, "\n  {amount} {code}");
    }
    if let Some(experience) = rewards.experience {
        let _ = write!(out, "\n  {experience} xp");
    }
    for item in &rewards.items {
        let _ = write!(out, "\n  item: {} [{}]", item.name, item.rarity);
    }
    for material in &rewards.materials {
        let _ = write!(out, "\n  material: {} x{}", material.name, material.quantity);
    }
    out
}

pub fn render_snapshot(snapshot: &EngineSnapshot) -> String {
    let mut out = format!("Phase: {}", snapshot.phase);
    if let Some(op) = snapshot.in_flight {
        let _ = write!(out, " ({op} in flight)");
    }
    if let Some(failure) = &snapshot.failure {
        let _ = write!(out, "\nLast {} failed: {}", failure.step, failure.error);
    }
    if let Some(session) = &snapshot.session {
        let _ = write!(out, "\n{}", render_session(session));
    }
    match &snapshot.settlement {
        Loadable::Idle => {}
        Loadable::Loading => out.push_str("\nRewards: claiming..."),
        Loadable::Loaded(rewards) => {
            let _ = write!(out, "\n{}", render_rewards(rewards));
        }
        Loadable::Failed(err) => {
            let _ = write!(out, "\nRewards: claim failed ({err})");
        }
    }
    out
}

fn render_error(err: &CombatError) -> String {
    let hint = if err.is_retryable() {
        " Try again."
    } else if err.requires_reset() {
        " Type `reset` to return to the menu."
    } else if matches!(err, CombatError::Unauthenticated) {
        " Sign in again and restart."
    } else {
        ""
    };
    format!("! {err}.{hint}")
}

/// Logs engine events until the runtime shuts down.
pub fn spawn_event_log(handle: &EngineHandle) -> JoinHandle<()> {
    let mut sessions = handle.subscribe(Topic::Session);
    let mut turns = handle.subscribe(Topic::Turn);
    let mut settlement = handle.subscribe(Topic::Settlement);

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                event = sessions.recv() => event,
                event = turns.recv() => event,
                event = settlement.recv() => event,
            };
            match received {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event log lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &Event) {
    match event {
        Event::Session(SessionEvent::Started { session }) => {
            tracing::info!(session_id = %session.session_id, enemy = %session.enemy.name, "Battle started");
        }
        Event::Session(SessionEvent::Resumed { session }) => {
            tracing::info!(session_id = %session.session_id, turn = session.turn_number, "Battle resumed");
        }
        Event::Session(SessionEvent::PhaseChanged { from, to }) => {
            tracing::debug!(%from, %to, "Phase changed");
        }
        Event::Session(SessionEvent::Ended { session_id, winner }) => {
            tracing::info!(%session_id, ?winner, "Battle acknowledged");
        }
        Event::Session(SessionEvent::Failed { step, error }) => {
            tracing::warn!(%step, %error, "Battle step failed");
        }
        Event::Session(SessionEvent::Cleared) => tracing::info!("Engine cleared"),
        Event::Turn(TurnEvent::Resolved { session_id, outcome }) => {
            tracing::info!(
                %session_id,
                turn = outcome.turn_number,
                player_hp = outcome.player_hp,
                enemy_hp = outcome.enemy_hp,
                "Turn resolved"
            );
        }
        Event::Turn(TurnEvent::Rejected { error }) => {
            tracing::debug!(%error, "Action rejected");
        }
        Event::Settlement(SettlementEvent::StatusChanged { status }) => match status {
            Loadable::Loaded(rewards) => {
                tracing::info!(result = ?rewards.result, "Rewards granted")
            }
            Loadable::Failed(error) => tracing::warn!(%error, "Reward claim failed"),
            Loadable::Loading => tracing::debug!("Claiming rewards"),
            Loadable::Idle => {}
        },
    }
}
