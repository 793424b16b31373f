//! Wire types for the combat backend.
//!
//! JSON uses camelCase keys. Response types convert into the domain types of
//! [`combat_core`]; HP values stay signed until they reach the session, which
//! clamps them.

use combat_core::{
    ActionKind, ActionLogEntry, CombatSession, CombatStats, DEFAULT_RECENT_ACTIONS, Enemy,
    LocationId, SessionId, SessionState, TimingScore, TurnResolution, Winner,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCombatRequest {
    pub location_id: LocationId,
    pub recommended_level: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCombatResponse {
    pub session_id: SessionId,
    pub enemy: Enemy,
    pub player_stats: CombatStats,
    pub player_hp: i64,
    pub enemy_hp: i64,
}

impl StartCombatResponse {
    pub fn into_session(self, location_id: LocationId) -> CombatSession {
        CombatSession::new(
            self.session_id,
            location_id,
            self.enemy,
            self.player_stats,
            self.player_hp,
            self.enemy_hp,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitActionRequest {
    pub session_id: SessionId,
    pub action_kind: ActionKind,
    pub timing_score: TimingScore,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitActionResponse {
    pub player_hp: i64,
    pub enemy_hp: i64,
    pub turn_number: u32,
    #[serde(default)]
    pub action_log: Vec<ActionLogEntry>,
    #[serde(default)]
    pub ended: bool,
    #[serde(default)]
    pub winner: Option<Winner>,
}

impl From<SubmitActionResponse> for TurnResolution {
    fn from(response: SubmitActionResponse) -> Self {
        Self {
            player_hp: response.player_hp,
            enemy_hp: response.enemy_hp,
            turn_number: response.turn_number,
            actions: response.action_log,
            ended: response.ended,
            winner: response.winner,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndCombatRequest {
    pub session_id: SessionId,
    pub won: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRewardsRequest {
    pub session_id: SessionId,
}

/// Backend-held session returned by the active-session lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionPayload {
    pub session_id: SessionId,
    pub location_id: LocationId,
    pub enemy: Enemy,
    pub player_stats: CombatStats,
    pub player_hp: i64,
    pub enemy_hp: i64,
    #[serde(default)]
    pub player_max_hp: Option<i64>,
    #[serde(default)]
    pub enemy_max_hp: Option<i64>,
    #[serde(default = "first_turn")]
    pub turn_number: u32,
    #[serde(default)]
    pub recent_actions: Vec<ActionLogEntry>,
    #[serde(default)]
    pub state: SessionState,
    #[serde(default)]
    pub winner: Option<Winner>,
}

fn first_turn() -> u32 {
    1
}

impl ActiveSessionPayload {
    /// Rebuilds the local session through the same path a started battle takes:
    /// a fresh session at the max HP, then the backend's current turn applied on top.
    ///
    /// The whole backend log is kept; the engine trims it to its own capacity
    /// when the session is installed.
    pub fn into_session(self) -> CombatSession {
        let player_max = self.player_max_hp.unwrap_or(self.player_hp);
        let enemy_max = self.enemy_max_hp.unwrap_or(self.enemy_hp);

        let mut session = CombatSession::new(
            self.session_id,
            self.location_id,
            self.enemy,
            self.player_stats,
            player_max.max(self.player_hp),
            enemy_max.max(self.enemy_hp),
        )
        .with_log_capacity(DEFAULT_RECENT_ACTIONS.max(self.recent_actions.len()));

        session.apply_resolution(&TurnResolution {
            player_hp: self.player_hp,
            enemy_hp: self.enemy_hp,
            turn_number: self.turn_number,
            actions: self.recent_actions,
            ended: self.state == SessionState::Ended,
            winner: self.winner,
        });
        session
    }
}
