//! Per-turn view of the game world
//!
//! A [`GameStateSnapshot`] is built fresh from the raw RL-interface payload
//! every turn and never mutated afterwards. Only derived summaries outlive
//! the turn (see `memory`).

use crate::core::types::{EntityId, Position, ResourceCounts};
use crate::game::classify::{BuildingRole, EntityClassifier};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Owner id of the environment (trees, animals, mines)
pub const GAIA_OWNER: u64 = 0;

/// A unit or building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub owner: u64,
    pub template: String,
    /// Human-readable name derived from the template
    pub display_name: String,
    pub health: u32,
    pub position: Position,
    /// Units only; always false for buildings
    pub idle: bool,
    pub is_building: bool,
}

impl Entity {
    /// Unit owned by player 1, idle=false, at the origin
    pub fn unit(id: u64, template: &str) -> Self {
        Self {
            id: EntityId(id),
            owner: 1,
            template: template.to_string(),
            display_name: display_name(template),
            health: 100,
            position: Position::default(),
            idle: false,
            is_building: false,
        }
    }

    /// Building owned by player 1 at the origin
    pub fn building(id: u64, template: &str) -> Self {
        Self {
            is_building: true,
            ..Self::unit(id, template)
        }
    }

    pub fn at(mut self, x: f64, z: f64) -> Self {
        self.position = Position::new(x, z);
        self
    }

    pub fn idle(mut self) -> Self {
        self.idle = true;
        self
    }

    pub fn owned_by(mut self, owner: u64) -> Self {
        self.owner = owner;
        self
    }
}

/// Readable name from a template path: last segment, rank suffix dropped,
/// underscores as spaces.
pub fn display_name(template: &str) -> String {
    let mut name = template.rsplit('/').next().unwrap_or(template);
    for suffix in ["_a", "_b", "_c", "_e"] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped;
            break;
        }
    }
    name.replace('_', " ")
}

/// Immutable per-turn fact base
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    /// Game clock in seconds
    pub time: f64,
    pub my_units: Vec<Entity>,
    pub my_buildings: Vec<Entity>,
    pub enemy_units: Vec<Entity>,
    pub enemy_buildings: Vec<Entity>,
    /// Owner-0 entities: resource nodes and wildlife
    pub gaia: Vec<Entity>,
    pub resources: ResourceCounts,
    pub population: u32,
    pub population_limit: u32,
    /// Our civilization code, when the game reported it
    pub civ: Option<String>,
}

impl GameStateSnapshot {
    /// Normalize a raw RL-interface state.
    ///
    /// `entities` may be an object keyed by id or an array. Positions may be
    /// `[x, z]` or `{"x":..,"z":..}`. Entities without a template are skipped.
    pub fn from_raw(raw: &Value, player_id: u32, classifier: &dyn EntityClassifier) -> Self {
        let mut snapshot = Self {
            time: raw.get("timeElapsed").and_then(Value::as_f64).unwrap_or(0.0),
            ..Self::default()
        };

        let entities: Vec<&Value> = match raw.get("entities") {
            Some(Value::Object(map)) => map.values().collect(),
            Some(Value::Array(list)) => list.iter().collect(),
            _ => Vec::new(),
        };

        let me = player_id as u64;
        for raw_entity in entities {
            let Some(entity) = parse_entity(raw_entity, classifier) else {
                continue;
            };

            match (entity.owner, entity.is_building) {
                (GAIA_OWNER, _) => snapshot.gaia.push(entity),
                (owner, true) if owner == me => snapshot.my_buildings.push(entity),
                (owner, false) if owner == me => snapshot.my_units.push(entity),
                (_, true) => snapshot.enemy_buildings.push(entity),
                (_, false) => snapshot.enemy_units.push(entity),
            }
        }

        let player = raw
            .get("players")
            .and_then(Value::as_array)
            .and_then(|players| players.get(player_id as usize));
        if let Some(player) = player {
            if let Some(counts) = player.get("resourceCounts") {
                let read = |key: &str| {
                    counts
                        .get(key)
                        .and_then(Value::as_f64)
                        .map(|v| v.max(0.0) as u32)
                        .unwrap_or(0)
                };
                snapshot.resources =
                    ResourceCounts::new(read("food"), read("wood"), read("stone"), read("metal"));
            }
            snapshot.population = read_u32(player.get("popCount"));
            snapshot.population_limit = read_u32(player.get("popLimit"));
            snapshot.civ = player
                .get("civ")
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        tracing::debug!(
            "Parsed: {} units, {} buildings, vs {} enemy units",
            snapshot.my_units.len(),
            snapshot.my_buildings.len(),
            snapshot.enemy_units.len()
        );

        snapshot
    }

    pub fn workers<'a>(
        &'a self,
        classifier: &'a dyn EntityClassifier,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        self.my_units.iter().filter(move |u| classifier.is_worker(u))
    }

    pub fn idle_workers<'a>(
        &'a self,
        classifier: &'a dyn EntityClassifier,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        self.workers(classifier).filter(|u| u.idle)
    }

    pub fn military<'a>(
        &'a self,
        classifier: &'a dyn EntityClassifier,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        self.my_units.iter().filter(move |u| !classifier.is_worker(u))
    }

    /// First civic-center-like building, else the first building, else `None`
    pub fn primary_base(&self, classifier: &dyn EntityClassifier) -> Option<&Entity> {
        self.my_buildings
            .iter()
            .find(|b| classifier.building_role(b) == Some(BuildingRole::CivicCenter))
            .or_else(|| self.my_buildings.first())
    }

    pub fn has_building_role(&self, classifier: &dyn EntityClassifier, role: BuildingRole) -> bool {
        self.my_buildings
            .iter()
            .any(|b| classifier.building_role(b) == Some(role))
    }

    pub fn find_my_building(&self, id: EntityId) -> Option<&Entity> {
        self.my_buildings.iter().find(|b| b.id == id)
    }

    /// Nothing left to command
    pub fn is_wiped_out(&self) -> bool {
        self.my_units.is_empty() && self.my_buildings.is_empty()
    }
}

fn read_u32(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_f64)
        .map(|v| v.max(0.0) as u32)
        .unwrap_or(0)
}

fn parse_position(value: Option<&Value>) -> Position {
    match value {
        Some(Value::Array(pair)) if pair.len() >= 2 => Position::new(
            pair[0].as_f64().unwrap_or(0.0),
            pair[1].as_f64().unwrap_or(0.0),
        ),
        Some(Value::Object(map)) => Position::new(
            map.get("x").and_then(Value::as_f64).unwrap_or(0.0),
            map.get("z").and_then(Value::as_f64).unwrap_or(0.0),
        ),
        _ => Position::default(),
    }
}

fn parse_entity(raw: &Value, classifier: &dyn EntityClassifier) -> Option<Entity> {
    let template = raw.get("template").and_then(Value::as_str)?;
    if template.is_empty() {
        return None;
    }
    let id = raw.get("id").and_then(Value::as_u64)?;
    let is_building = classifier.is_building_template(template);

    Some(Entity {
        id: EntityId(id),
        owner: raw.get("owner").and_then(Value::as_u64).unwrap_or(GAIA_OWNER),
        template: template.to_string(),
        display_name: display_name(template),
        health: raw
            .get("hitpoints")
            .and_then(Value::as_f64)
            .map(|hp| hp.max(0.0) as u32)
            .unwrap_or(100),
        position: parse_position(raw.get("position")),
        idle: !is_building && raw.get("idle").and_then(Value::as_bool).unwrap_or(false),
        is_building,
    })
}
