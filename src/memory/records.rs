//! Turn records and session statistics

use crate::actions::catalog::ActionKind;
use crate::core::types::ResourceCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of short-term memory. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: u32,
    pub wall_time: DateTime<Utc>,
    pub game_time: f64,
    pub action_id: Option<u32>,
    pub action_kind: Option<ActionKind>,
    pub description: String,
    pub my_units: usize,
    pub my_buildings: usize,
    pub enemy_units: usize,
    pub resources: ResourceCounts,
    /// Free text, empty when nothing notable happened
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub reward: f64,
}

impl TurnRecord {
    pub fn new(turn: u32, description: impl Into<String>) -> Self {
        Self {
            turn,
            wall_time: Utc::now(),
            game_time: 0.0,
            action_id: None,
            action_kind: None,
            description: description.into(),
            my_units: 0,
            my_buildings: 0,
            enemy_units: 0,
            resources: ResourceCounts::default(),
            outcome: String::new(),
            reward: 0.0,
        }
    }

    /// `"Turn T: <description> → <outcome or ok>"`
    pub fn summary_line(&self) -> String {
        let outcome = if self.outcome.is_empty() {
            "ok"
        } else {
            self.outcome.as_str()
        };
        format!("Turn {}: {} → {}", self.turn, self.description, outcome)
    }
}

/// Running totals for the current game, folded over every recorded turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_turns: u32,
    pub total_reward: f64,
    pub units_trained: u32,
    pub buildings_built: u32,
    pub attacks_launched: u32,
    pub attacks_succeeded: u32,
    pub peak_units: usize,
    pub peak_resources: u64,
}

impl SessionStats {
    /// Fold `record` in. `previous` is the turn recorded just before it, used
    /// to judge whether an attack made on that turn thinned the enemy.
    pub fn observe(&mut self, record: &TurnRecord, previous: Option<&TurnRecord>) {
        self.total_turns += 1;
        self.total_reward += record.reward;
        self.peak_units = self.peak_units.max(record.my_units);
        self.peak_resources = self.peak_resources.max(record.resources.total());

        if let Some(prev) = previous {
            let attacked = prev.action_kind.map(|k| k.is_attack()).unwrap_or(false);
            if attacked && record.enemy_units < prev.enemy_units {
                self.attacks_succeeded += 1;
            }
        }

        match record.action_kind {
            Some(kind) if kind.is_training() => self.units_trained += 1,
            Some(kind) if kind.is_construction() => self.buildings_built += 1,
            Some(kind) if kind.is_attack() => self.attacks_launched += 1,
            _ => {}
        }
    }

    /// Fraction of launched attacks that succeeded, `None` before any attack
    pub fn attack_success_rate(&self) -> Option<f64> {
        if self.attacks_launched == 0 {
            None
        } else {
            Some(self.attacks_succeeded as f64 / self.attacks_launched as f64)
        }
    }
}

/// One line of `game_history.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub timestamp: DateTime<Utc>,
    pub turns: u32,
    pub total_reward: f64,
    pub peak_units: usize,
    pub outcome: String,
    pub strategy: String,
}
