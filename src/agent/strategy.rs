//! High-level strategic postures

use crate::actions::catalog::ActionCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Economy,
    Military,
    Defense,
    Attack,
}

/// Fixed per-strategy data
#[derive(Debug, Clone, Copy)]
pub struct StrategyProfile {
    pub description: &'static str,
    /// Actions in these categories get the strategy boost
    pub preferred: &'static [ActionCategory],
}

impl Strategy {
    /// Vocabulary order, also the order replies are matched in
    pub const ALL: [Strategy; 4] = [
        Strategy::Economy,
        Strategy::Military,
        Strategy::Defense,
        Strategy::Attack,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Economy => "economy",
            Strategy::Military => "military",
            Strategy::Defense => "defense",
            Strategy::Attack => "attack",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn profile(&self) -> StrategyProfile {
        match self {
            Strategy::Economy => StrategyProfile {
                description: "Focus on building economy - workers, resources, infrastructure",
                preferred: &[ActionCategory::Economy, ActionCategory::Build],
            },
            Strategy::Military => StrategyProfile {
                description: "Focus on military - train soldiers, prepare for attack",
                preferred: &[ActionCategory::Military, ActionCategory::Build],
            },
            Strategy::Defense => StrategyProfile {
                description: "Defensive posture - protect base, counter enemy threats",
                preferred: &[ActionCategory::Defense, ActionCategory::Military],
            },
            Strategy::Attack => StrategyProfile {
                description: "Aggressive attack - push to destroy enemy",
                preferred: &[ActionCategory::Military],
            },
        }
    }

    /// One-line pitch shown in the strategic prompt
    pub fn recommendation(&self) -> &'static str {
        match self {
            Strategy::Economy => "Build up workers and resources (recommended when workers < 15)",
            Strategy::Military => "Train soldiers and prepare army (recommended when economy stable)",
            Strategy::Defense => "Protect base from enemy attacks (recommended when under threat)",
            Strategy::Attack => "Launch offensive against enemy (recommended when army is strong)",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Economy
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_uppercase())
    }
}

/// Active strategy and when it was last (re)chosen.
///
/// `chosen_at == None` means no plan has been made yet, so the next turn
/// plans immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyState {
    pub current: Strategy,
    pub chosen_at: Option<u32>,
}

impl StrategyState {
    pub fn new(initial: Strategy) -> Self {
        Self {
            current: initial,
            chosen_at: None,
        }
    }

    pub fn is_due(&self, turn: u32, interval: u32) -> bool {
        match self.chosen_at {
            None => true,
            Some(last) => turn.saturating_sub(last) >= interval,
        }
    }

    /// Turns until the next plan; 0 when one is due
    pub fn turns_until_due(&self, turn: u32, interval: u32) -> u32 {
        match self.chosen_at {
            None => 0,
            Some(last) => interval.saturating_sub(turn.saturating_sub(last)),
        }
    }

    /// Record a planning result. Returns the previous strategy if it changed.
    pub fn apply(&mut self, strategy: Strategy, turn: u32) -> Option<Strategy> {
        let previous = self.current;
        self.current = strategy;
        self.chosen_at = Some(turn);
        (previous != strategy).then_some(previous)
    }
}
