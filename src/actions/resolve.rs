//! Turning a chosen action into concrete game commands
//!
//! Resolution happens against the snapshot the action was generated from.
//! Target lookups that come up empty yield no commands rather than an error.

use crate::actions::catalog::ActionKind;
use crate::core::types::{EntityId, Position, Resource};
use crate::game::classify::EntityClassifier;
use crate::game::command::Command;
use crate::game::knowledge::{structure_template, unit_template, StructureKind, UnitRole};
use crate::game::snapshot::{Entity, GameStateSnapshot};
use ordered_float::OrderedFloat;
use rand::Rng;

/// Half-width of the square around the base where new structures go
pub const BUILD_JITTER: i32 = 30;
/// Distance from base for a gather move when no resource node is visible
pub const GATHER_FALLBACK_OFFSET: f64 = 50.0;

pub struct CommandResolver<'a> {
    classifier: &'a dyn EntityClassifier,
    civ: &'a str,
}

impl<'a> CommandResolver<'a> {
    pub fn new(classifier: &'a dyn EntityClassifier, civ: &'a str) -> Self {
        Self { classifier, civ }
    }

    pub fn resolve<R: Rng + ?Sized>(
        &self,
        kind: &ActionKind,
        snapshot: &GameStateSnapshot,
        rng: &mut R,
    ) -> Vec<Command> {
        match *kind {
            ActionKind::Gather { resource } => self.gather(resource, snapshot),
            ActionKind::Train { building, role } => self.train(building, role, snapshot),
            ActionKind::Build { structure } => self.build(structure, snapshot, rng),
            ActionKind::AttackNearest => {
                let units: Vec<&Entity> = snapshot.military(self.classifier).collect();
                attack(&units, snapshot)
            }
            ActionKind::AllOutAttack => {
                let units: Vec<&Entity> = snapshot.my_units.iter().collect();
                attack(&units, snapshot)
            }
            ActionKind::DefendBase => self.defend(snapshot),
            ActionKind::Wait => Vec::new(),
        }
    }

    fn gather(&self, resource: Resource, snapshot: &GameStateSnapshot) -> Vec<Command> {
        let idle: Vec<&Entity> = snapshot.idle_workers(self.classifier).collect();
        if idle.is_empty() {
            return Vec::new();
        }
        let units = ids(&idle);
        let base = snapshot.primary_base(self.classifier);

        let origin = Position::centroid(idle.iter().map(|u| &u.position))
            .or_else(|| base.map(|b| b.position))
            .unwrap_or_default();
        let node = nearest(
            snapshot
                .gaia
                .iter()
                .filter(|e| self.classifier.resource_of(e) == Some(resource)),
            origin,
        );

        if let Some(node) = node {
            return vec![Command::Gather {
                units,
                target: node.id,
            }];
        }

        // No visible node: walk towards where that resource usually lies
        let Some(base) = base else {
            return Vec::new();
        };
        let (dx, dz) = match resource {
            Resource::Food => (GATHER_FALLBACK_OFFSET, 0.0),
            Resource::Wood => (-GATHER_FALLBACK_OFFSET, 0.0),
            Resource::Stone => (0.0, GATHER_FALLBACK_OFFSET),
            Resource::Metal => (0.0, -GATHER_FALLBACK_OFFSET),
        };
        let target = base.position.offset(dx, dz);
        vec![Command::Move {
            units,
            x: target.x,
            z: target.z,
        }]
    }

    fn train(&self, building: EntityId, role: UnitRole, snapshot: &GameStateSnapshot) -> Vec<Command> {
        if snapshot.find_my_building(building).is_none() {
            return Vec::new();
        }
        vec![Command::Train {
            building,
            template: unit_template(self.civ, role),
        }]
    }

    fn build<R: Rng + ?Sized>(
        &self,
        structure: StructureKind,
        snapshot: &GameStateSnapshot,
        rng: &mut R,
    ) -> Vec<Command> {
        let Some(worker) = snapshot.workers(self.classifier).next() else {
            return Vec::new();
        };
        let Some(base) = snapshot.primary_base(self.classifier) else {
            return Vec::new();
        };

        let site = base.position.offset(
            rng.gen_range(-BUILD_JITTER..=BUILD_JITTER) as f64,
            rng.gen_range(-BUILD_JITTER..=BUILD_JITTER) as f64,
        );
        vec![Command::Build {
            units: vec![worker.id],
            template: structure_template(self.civ, structure),
            x: site.x,
            z: site.z,
        }]
    }

    fn defend(&self, snapshot: &GameStateSnapshot) -> Vec<Command> {
        let military: Vec<&Entity> = snapshot.military(self.classifier).collect();
        let Some(base) = snapshot.primary_base(self.classifier) else {
            return Vec::new();
        };
        if military.is_empty() {
            return Vec::new();
        }
        vec![Command::Move {
            units: ids(&military),
            x: base.position.x,
            z: base.position.z,
        }]
    }
}

fn ids(units: &[&Entity]) -> Vec<EntityId> {
    units.iter().map(|u| u.id).collect()
}

fn nearest<'e>(candidates: impl Iterator<Item = &'e Entity>, origin: Position) -> Option<&'e Entity> {
    candidates.min_by_key(|e| OrderedFloat(e.position.distance(&origin)))
}

/// Send `units` at the enemy unit closest to their centroid
fn attack(units: &[&Entity], snapshot: &GameStateSnapshot) -> Vec<Command> {
    let Some(center) = Position::centroid(units.iter().map(|u| &u.position)) else {
        return Vec::new();
    };
    let Some(target) = nearest(snapshot.enemy_units.iter(), center) else {
        return Vec::new();
    };
    vec![Command::Attack {
        units: ids(units),
        target: target.id,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::classify::KeywordClassifier;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    fn base_snapshot() -> GameStateSnapshot {
        GameStateSnapshot {
            my_units: vec![
                Entity::unit(1, "units/athen/support_female_citizen").at(10.0, 10.0).idle(),
                Entity::unit(2, "units/athen/infantry_spearman_b").at(20.0, 20.0),
            ],
            my_buildings: vec![Entity::building(100, "structures/athen/civil_centre").at(100.0, 100.0)],
            ..Default::default()
        }
    }

    #[test]
    fn test_gather_targets_nearest_matching_node() {
        let mut snap = base_snapshot();
        snap.gaia = vec![
            Entity::unit(50, "gaia/tree/oak").owned_by(0).at(500.0, 500.0),
            Entity::unit(51, "gaia/tree/pine").owned_by(0).at(15.0, 15.0),
            Entity::unit(52, "gaia/rock/large").owned_by(0).at(11.0, 11.0),
        ];
        let resolver = CommandResolver::new(&KeywordClassifier, "athen");
        let cmds = resolver.resolve(&ActionKind::Gather { resource: Resource::Wood }, &snap, &mut rng());
        assert_eq!(
            cmds,
            vec![Command::Gather {
                units: vec![EntityId(1)],
                target: EntityId(51)
            }]
        );
    }

    #[test]
    fn test_gather_without_node_moves_from_base() {
        let snap = base_snapshot();
        let resolver = CommandResolver::new(&KeywordClassifier, "athen");
        let cmds = resolver.resolve(&ActionKind::Gather { resource: Resource::Metal }, &snap, &mut rng());
        assert_eq!(
            cmds,
            vec![Command::Move {
                units: vec![EntityId(1)],
                x: 100.0,
                z: 50.0
            }]
        );
    }

    #[test]
    fn test_gather_without_node_or_base_is_empty() {
        let mut snap = base_snapshot();
        snap.my_buildings.clear();
        let resolver = CommandResolver::new(&KeywordClassifier, "athen");
        assert!(resolver
            .resolve(&ActionKind::Gather { resource: Resource::Food }, &snap, &mut rng())
            .is_empty());
    }

    #[test]
    fn test_train_requires_building_to_exist() {
        let snap = base_snapshot();
        let resolver = CommandResolver::new(&KeywordClassifier, "spart");
        let kind = ActionKind::Train {
            building: EntityId(100),
            role: UnitRole::Worker,
        };
        assert_eq!(
            resolver.resolve(&kind, &snap, &mut rng()),
            vec![Command::Train {
                building: EntityId(100),
                template: "units/spart/support_female_citizen".into()
            }]
        );

        let gone = ActionKind::Train {
            building: EntityId(999),
            role: UnitRole::Worker,
        };
        assert!(resolver.resolve(&gone, &snap, &mut rng()).is_empty());
    }

    #[test]
    fn test_build_places_near_base() {
        let snap = base_snapshot();
        let resolver = CommandResolver::new(&KeywordClassifier, "athen");
        let cmds = resolver.resolve(
            &ActionKind::Build {
                structure: StructureKind::House,
            },
            &snap,
            &mut rng(),
        );
        match cmds.as_slice() {
            [Command::Build { units, template, x, z }] => {
                assert_eq!(units, &vec![EntityId(1)]);
                assert_eq!(template, "structures/athen/house");
                assert!((70.0..=130.0).contains(x));
                assert!((70.0..=130.0).contains(z));
            }
            other => panic!("unexpected commands: {:?}", other),
        }
    }

    #[test]
    fn test_attack_picks_enemy_nearest_to_army() {
        let mut snap = base_snapshot();
        snap.enemy_units = vec![
            Entity::unit(60, "units/spart/infantry_spearman_b").owned_by(2).at(300.0, 300.0),
            Entity::unit(61, "units/spart/infantry_spearman_b").owned_by(2).at(25.0, 25.0),
        ];
        let resolver = CommandResolver::new(&KeywordClassifier, "athen");

        let cmds = resolver.resolve(&ActionKind::AttackNearest, &snap, &mut rng());
        assert_eq!(
            cmds,
            vec![Command::Attack {
                units: vec![EntityId(2)],
                target: EntityId(61)
            }]
        );

        let cmds = resolver.resolve(&ActionKind::AllOutAttack, &snap, &mut rng());
        assert_eq!(
            cmds,
            vec![Command::Attack {
                units: vec![EntityId(1), EntityId(2)],
                target: EntityId(61)
            }]
        );
    }

    #[test]
    fn test_defend_moves_military_to_base() {
        let snap = base_snapshot();
        let resolver = CommandResolver::new(&KeywordClassifier, "athen");
        assert_eq!(
            resolver.resolve(&ActionKind::DefendBase, &snap, &mut rng()),
            vec![Command::Move {
                units: vec![EntityId(2)],
                x: 100.0,
                z: 100.0
            }]
        );
    }

    #[test]
    fn test_wait_is_empty() {
        let resolver = CommandResolver::new(&KeywordClassifier, "athen");
        assert!(resolver
            .resolve(&ActionKind::Wait, &base_snapshot(), &mut rng())
            .is_empty());
    }
}
