//! Commands sent to the game
//!
//! Pure data. [`Command::to_wire`] produces the JSON shape the RL interface
//! expects (`walk` for moves, `construct` for builds).

use crate::core::types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Train {
        building: EntityId,
        template: String,
    },
    Move {
        units: Vec<EntityId>,
        x: f64,
        z: f64,
    },
    Attack {
        units: Vec<EntityId>,
        target: EntityId,
    },
    Gather {
        units: Vec<EntityId>,
        target: EntityId,
    },
    Build {
        units: Vec<EntityId>,
        template: String,
        x: f64,
        z: f64,
    },
}

fn ids(units: &[EntityId]) -> Vec<u64> {
    units.iter().map(|id| id.0).collect()
}

impl Command {
    /// Wire payload for one command issued by `player`
    pub fn to_wire(&self, player: u32) -> Value {
        match self {
            Command::Train { building, template } => json!({
                "player": player,
                "type": "train",
                "entities": [building.0],
                "template": template,
            }),
            Command::Move { units, x, z } => json!({
                "player": player,
                "type": "walk",
                "entities": ids(units),
                "x": x,
                "z": z,
            }),
            Command::Attack { units, target } => json!({
                "player": player,
                "type": "attack",
                "entities": ids(units),
                "target": target.0,
            }),
            Command::Gather { units, target } => json!({
                "player": player,
                "type": "gather",
                "entities": ids(units),
                "target": target.0,
            }),
            Command::Build {
                units,
                template,
                x,
                z,
            } => json!({
                "player": player,
                "type": "construct",
                "entities": ids(units),
                "template": template,
                "x": x,
                "z": z,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_uses_walk_on_the_wire() {
        let cmd = Command::Move {
            units: vec![EntityId(1), EntityId(2)],
            x: 10.0,
            z: -5.0,
        };
        let wire = cmd.to_wire(1);
        assert_eq!(wire["type"], "walk");
        assert_eq!(wire["entities"], json!([1, 2]));
        assert_eq!(wire["player"], 1);
        assert_eq!(wire["z"], -5.0);
    }

    #[test]
    fn test_build_uses_construct_on_the_wire() {
        let cmd = Command::Build {
            units: vec![EntityId(7)],
            template: "structures/athen/house".into(),
            x: 1.0,
            z: 2.0,
        };
        let wire = cmd.to_wire(2);
        assert_eq!(wire["type"], "construct");
        assert_eq!(wire["template"], "structures/athen/house");
    }

    #[test]
    fn test_train_targets_single_building() {
        let cmd = Command::Train {
            building: EntityId(42),
            template: "units/athen/support_female_citizen".into(),
        };
        assert_eq!(cmd.to_wire(1)["entities"], json!([42]));
    }
}
