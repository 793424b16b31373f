//! Battle snapshot types.
//!
//! A [`CombatSession`] is the local copy of one backend-issued battle. Its HP
//! and turn counter are only ever overwritten with backend values through
//! [`CombatSession::apply_resolution`]; nothing in the client computes damage.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of log entries kept in [`RecentActions`].
pub const DEFAULT_RECENT_ACTIONS: usize = 10;

/// Backend-issued battle identifier, stable for the battle's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encounter source supplied by location discovery.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of whoever performed a logged action (player or enemy id).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformerId(pub String);

impl PerformerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for PerformerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatStats {
    pub atk_power: u32,
    pub atk_accuracy: u32,
    pub def_power: u32,
    pub def_accuracy: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub level: u32,
    pub stats: CombatStats,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionKind {
    Attack,
    Defend,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Winner {
    Player,
    Enemy,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    #[default]
    NotStarted,
    Active,
    Ended,
}

/// One entry in the recent action log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogEntry {
    /// Turn this entry was resolved in. Ordering is carried here, not by timing.
    #[serde(default)]
    pub turn_number: u32,
    pub performer_id: PerformerId,
    pub action_kind: ActionKind,
    #[serde(default)]
    pub damage_dealt: Option<u32>,
}

/// Bounded, append-only log; the oldest entry is evicted first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentActions {
    capacity: usize,
    entries: VecDeque<ActionLogEntry>,
}

impl RecentActions {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: ActionLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ActionLogEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&ActionLogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RecentActions {
    fn default() -> Self {
        Self::new(DEFAULT_RECENT_ACTIONS)
    }
}

/// Backend outcome of one submitted action.
///
/// HP values are signed because they are taken verbatim from the response;
/// they are clamped when applied to a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnResolution {
    pub player_hp: i64,
    pub enemy_hp: i64,
    pub turn_number: u32,
    pub actions: Vec<ActionLogEntry>,
    pub ended: bool,
    pub winner: Option<Winner>,
}

/// Local snapshot of one battle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSession {
    pub session_id: SessionId,
    pub location_id: LocationId,
    pub enemy: Enemy,
    /// Stats captured at session start; equipment changes mid-battle do not apply.
    pub player_stats: CombatStats,
    pub player_hp: u32,
    pub enemy_hp: u32,
    pub player_max_hp: u32,
    pub enemy_max_hp: u32,
    pub turn_number: u32,
    pub recent_actions: RecentActions,
    pub state: SessionState,
    pub winner: Option<Winner>,
}

impl CombatSession {
    /// Builds a freshly started session from backend-provided values.
    pub fn new(
        session_id: SessionId,
        location_id: LocationId,
        enemy: Enemy,
        player_stats: CombatStats,
        player_hp: i64,
        enemy_hp: i64,
    ) -> Self {
        let player_hp = clamp_hp(player_hp);
        let enemy_hp = clamp_hp(enemy_hp);
        let mut session = Self {
            session_id,
            location_id,
            enemy,
            player_stats,
            player_hp,
            enemy_hp,
            player_max_hp: player_hp,
            enemy_max_hp: enemy_hp,
            turn_number: 1,
            recent_actions: RecentActions::default(),
            state: SessionState::Active,
            winner: None,
        };
        session.settle_terminal(None);
        session
    }

    /// Replaces the action log with an empty one of the given capacity,
    /// keeping the newest entries.
    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        let mut log = RecentActions::new(capacity);
        log.extend(self.recent_actions.iter().cloned());
        self.recent_actions = log;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.state == SessionState::Ended || self.player_hp == 0 || self.enemy_hp == 0
    }

    /// Overwrites HP/turn with backend values and appends the returned log entries.
    pub fn apply_resolution(&mut self, resolution: &TurnResolution) {
        self.player_hp = clamp_hp(resolution.player_hp);
        self.enemy_hp = clamp_hp(resolution.enemy_hp);
        self.turn_number = resolution.turn_number;
        self.recent_actions.extend(resolution.actions.iter().cloned().map(|mut entry| {
            if entry.turn_number == 0 {
                entry.turn_number = resolution.turn_number;
            }
            entry
        }));

        if resolution.ended {
            self.state = SessionState::Ended;
        }
        self.settle_terminal(resolution.winner);
    }

    /// Marks the session ended if either side is at 0 HP and records the winner.
    ///
    /// An explicit backend winner wins over the HP inference.
    fn settle_terminal(&mut self, reported: Option<Winner>) {
        if self.player_hp == 0 || self.enemy_hp == 0 {
            self.state = SessionState::Ended;
        }
        if self.state != SessionState::Ended {
            return;
        }
        self.winner = reported.or(self.winner).or_else(|| {
            if self.enemy_hp == 0 {
                Some(Winner::Player)
            } else if self.player_hp == 0 {
                Some(Winner::Enemy)
            } else {
                None
            }
        });
    }
}

fn clamp_hp(hp: i64) -> u32 {
    u32::try_from(hp.max(0)).unwrap_or(u32::MAX)
}
