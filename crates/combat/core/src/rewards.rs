//! Post-battle reward payloads.
//!
//! Rewards are only ever decoded from a backend `end`/`claim` response. There
//! is deliberately no constructor that derives them from combat state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CombatResult {
    Win,
    Loss,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDrop {
    pub id: String,
    #[serde(alias = "displayName")]
    pub name: String,
    pub rarity: String,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDrop {
    pub id: String,
    #[serde(alias = "displayName")]
    pub name: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatRewards {
    pub result: CombatResult,
    /// Currency code to balance delta (e.g. `"gold" -> 120`).
    #[serde(default)]
    pub currencies: BTreeMap<String, i64>,
    #[serde(default)]
    pub items: Vec<ItemDrop>,
    #[serde(default)]
    pub materials: Vec<MaterialDrop>,
    #[serde(default)]
    pub experience: Option<u64>,
}

impl CombatRewards {
    pub fn is_win(&self) -> bool {
        self.result == CombatResult::Win
    }

    pub fn currency(&self, code: &str) -> i64 {
        self.currencies.get(code).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_grant() {
        let json = r#"{
            "result": "win",
            "currencies": {"gold": 120, "gems": 2},
            "items": [{"id": "sword-1", "displayName": "Rusty Sword", "rarity": "common", "style": "blade"}],
            "materials": [{"id": "hide", "name": "Wolf Hide", "quantity": 3}],
            "experience": 45
        }"#;

        let rewards: CombatRewards = serde_json::from_str(json).unwrap();
        assert!(rewards.is_win());
        assert_eq!(rewards.currency("gold"), 120);
        assert_eq!(rewards.currency("silver"), 0);
        assert_eq!(rewards.items[0].name, "Rusty Sword");
        assert_eq!(rewards.materials[0].quantity, 3);
        assert_eq!(rewards.experience, Some(45));
    }

    #[test]
    fn loss_with_no_drops() {
        let rewards: CombatRewards = serde_json::from_str(r#"{"result":"loss"}"#).unwrap();
        assert!(!rewards.is_win());
        assert!(rewards.items.is_empty());
        assert!(rewards.experience.is_none());
    }
}
