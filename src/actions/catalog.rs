//! Action definitions and catalog
//!
//! Each turn the [`ActionCatalogBuilder`] enumerates every action that makes
//! sense for the current snapshot, scores it, and hands the sorted catalog to
//! the decision engine. Actions carry an [`ActionKind`] tag rather than a
//! captured closure; commands are resolved from the tag against the snapshot
//! only when the action is executed.

use crate::core::types::{EntityId, Resource, ResourceCounts};
use crate::game::classify::{BuildingRole, EntityClassifier};
use crate::game::knowledge::{self, format_cost, CostItem, CostTable, StructureKind, UnitRole};
use crate::game::snapshot::GameStateSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Stable tag identifying what an action does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionKind {
    Gather { resource: Resource },
    Train { building: EntityId, role: UnitRole },
    Build { structure: StructureKind },
    AttackNearest,
    AllOutAttack,
    DefendBase,
    Wait,
}

impl ActionKind {
    pub fn is_training(&self) -> bool {
        matches!(self, ActionKind::Train { .. })
    }

    pub fn is_construction(&self) -> bool {
        matches!(self, ActionKind::Build { .. })
    }

    pub fn is_attack(&self) -> bool {
        matches!(self, ActionKind::AttackNearest | ActionKind::AllOutAttack)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Economy,
    Military,
    Defense,
    Build,
    Misc,
}

impl ActionCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ActionCategory::Economy => "ECONOMY",
            ActionCategory::Military => "MILITARY",
            ActionCategory::Defense => "DEFENSE",
            ActionCategory::Build => "BUILD",
            ActionCategory::Misc => "MISC",
        }
    }
}

/// A candidate action for the current turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredAction {
    /// Turn-local id; not stable across turns
    pub id: u32,
    pub name: String,
    pub description: String,
    pub category: ActionCategory,
    /// Higher is preferred
    pub priority: i32,
    pub requirement: Option<ResourceCounts>,
    pub kind: ActionKind,
}

/// All scored actions for one turn, sorted by descending priority.
///
/// Never empty: the builder always appends a wait action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionCatalog {
    actions: Vec<ScoredAction>,
}

impl ActionCatalog {
    fn from_generated(mut actions: Vec<ScoredAction>) -> Self {
        sort_by_priority(&mut actions);
        Self { actions }
    }

    pub fn actions(&self) -> &[ScoredAction] {
        &self.actions
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredAction> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Highest-priority action; ties go to the first generated
    pub fn top(&self) -> &ScoredAction {
        &self.actions[0]
    }

    pub fn get(&self, id: u32) -> Option<&ScoredAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.actions.iter().map(|a| a.id).collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ScoredAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Add `amount` to every action in `categories`, then re-sort
    pub fn boost(&mut self, categories: &[ActionCategory], amount: i32) {
        for action in &mut self.actions {
            if categories.contains(&action.category) {
                action.priority += amount;
            }
        }
        sort_by_priority(&mut self.actions);
    }

    /// Numbered list for the tactical prompt
    pub fn format_for_prompt(&self) -> String {
        let mut lines = Vec::with_capacity(self.actions.len() * 2);
        for action in &self.actions {
            let cost = action
                .requirement
                .as_ref()
                .map(|c| format!(" (cost: {})", format_cost(c)))
                .unwrap_or_default();
            lines.push(format!(
                "{}: [{}] {}{}",
                action.id,
                action.category.label(),
                action.name,
                cost
            ));
            lines.push(format!("    {}", action.description));
        }
        lines.join("\n")
    }
}

fn sort_by_priority(actions: &mut [ScoredAction]) {
    // Ids follow generation order, so the tiebreak keeps the first generated ahead
    actions.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
}

/// Stock below this raises a gather action's priority
pub const LOW_STOCK_THRESHOLD: u32 = 100;
/// Below this many workers, worker training is urgent
pub const WORKER_TARGET: usize = 10;
/// Build a house once population is this close to the cap
pub const HOUSING_MARGIN: u32 = 3;

struct Generated {
    next_id: u32,
    actions: Vec<ScoredAction>,
}

impl Generated {
    fn push(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        category: ActionCategory,
        priority: i32,
        requirement: Option<ResourceCounts>,
        kind: ActionKind,
    ) {
        let id = self.next_id;
        self.next_id += 1;
        self.actions.push(ScoredAction {
            id,
            name: name.into(),
            description: description.into(),
            category,
            priority,
            requirement,
            kind,
        });
    }
}

/// Enumerates and scores the legal actions for a snapshot.
///
/// Deterministic: the output depends only on the snapshot, the civilization
/// and the cost table.
#[derive(Debug)]
pub struct ActionCatalogBuilder {
    classifier: Arc<dyn EntityClassifier>,
    costs: CostTable,
    span: tracing::Span,
}

impl ActionCatalogBuilder {
    pub fn new(classifier: Arc<dyn EntityClassifier>) -> Self {
        Self {
            classifier,
            costs: CostTable::default(),
            span: tracing::info_span!("component", name = "action_catalog"),
        }
    }

    pub fn with_costs(mut self, costs: CostTable) -> Self {
        self.costs = costs;
        self
    }

    pub fn classifier(&self) -> &dyn EntityClassifier {
        self.classifier.as_ref()
    }

    pub fn costs(&self) -> &CostTable {
        &self.costs
    }

    pub fn build(&self, snapshot: &GameStateSnapshot, civ: &str) -> ActionCatalog {
        let _guard = self.span.enter();
        let mut out = Generated {
            next_id: 0,
            actions: Vec::new(),
        };

        self.economy_actions(snapshot, &mut out);
        self.training_actions(snapshot, civ, &mut out);
        self.building_actions(snapshot, &mut out);
        self.military_actions(snapshot, &mut out);

        out.push(
            "Wait",
            "Do nothing this turn",
            ActionCategory::Misc,
            1,
            None,
            ActionKind::Wait,
        );

        let catalog = ActionCatalog::from_generated(out.actions);
        tracing::debug!("Generated {} actions", catalog.len());
        catalog
    }

    fn affordable(&self, item: CostItem, snapshot: &GameStateSnapshot) -> bool {
        self.costs.can_afford(item, &snapshot.resources)
    }

    fn economy_actions(&self, snapshot: &GameStateSnapshot, out: &mut Generated) {
        let idle = snapshot.idle_workers(self.classifier()).count();
        if idle == 0 {
            return;
        }

        for resource in Resource::ALL {
            let mut priority = if resource == Resource::Food { 8 } else { 6 };
            if snapshot.resources.get(resource) < LOW_STOCK_THRESHOLD {
                priority += 2;
            }

            out.push(
                format!("Gather {}", resource.title()),
                format!("Send {} idle workers to gather {}", idle, resource),
                ActionCategory::Economy,
                priority,
                None,
                ActionKind::Gather { resource },
            );
        }
    }

    fn training_actions(&self, snapshot: &GameStateSnapshot, civ: &str, out: &mut Generated) {
        let worker_count = snapshot.workers(self.classifier()).count();

        for building in &snapshot.my_buildings {
            let Some(role) = self.classifier.building_role(building) else {
                continue;
            };

            let (unit, name, category, priority) = match role {
                BuildingRole::CivicCenter => {
                    let priority = if worker_count < WORKER_TARGET { 7 } else { 4 };
                    (UnitRole::Worker, "Train Worker", ActionCategory::Economy, priority)
                }
                BuildingRole::Barracks => {
                    (UnitRole::Infantry, "Train Spearman", ActionCategory::Military, 5)
                }
                BuildingRole::Stable => {
                    (UnitRole::Cavalry, "Train Cavalry", ActionCategory::Military, 5)
                }
            };

            let item = CostItem::Unit(unit);
            if !self.affordable(item, snapshot) {
                continue;
            }

            out.push(
                name,
                format!(
                    "Train {} from {}",
                    knowledge::unit_template(civ, unit),
                    building.display_name
                ),
                category,
                priority,
                self.costs.cost(item),
                ActionKind::Train {
                    building: building.id,
                    role: unit,
                },
            );
        }
    }

    fn building_actions(&self, snapshot: &GameStateSnapshot, out: &mut Generated) {
        if snapshot.workers(self.classifier()).next().is_none() {
            return;
        }

        let house = CostItem::Structure(StructureKind::House);
        let near_cap = snapshot.population_limit.saturating_sub(snapshot.population) <= HOUSING_MARGIN;
        if near_cap && self.affordable(house, snapshot) {
            out.push(
                "Build House",
                format!(
                    "Build house (pop: {}/{})",
                    snapshot.population, snapshot.population_limit
                ),
                ActionCategory::Build,
                9,
                self.costs.cost(house),
                ActionKind::Build {
                    structure: StructureKind::House,
                },
            );
        }

        let barracks = CostItem::Structure(StructureKind::Barracks);
        let has_barracks = snapshot.has_building_role(self.classifier(), BuildingRole::Barracks);
        if !has_barracks && self.affordable(barracks, snapshot) {
            out.push(
                "Build Barracks",
                "Build barracks to train military",
                ActionCategory::Build,
                6,
                self.costs.cost(barracks),
                ActionKind::Build {
                    structure: StructureKind::Barracks,
                },
            );
        }
    }

    fn military_actions(&self, snapshot: &GameStateSnapshot, out: &mut Generated) {
        let military = snapshot.military(self.classifier()).count();
        if military == 0 {
            return;
        }

        if !snapshot.enemy_units.is_empty() {
            out.push(
                "Attack Enemy",
                format!("Attack nearest enemy with {} military units", military),
                ActionCategory::Military,
                5,
                None,
                ActionKind::AttackNearest,
            );
            out.push(
                "All-Out Attack",
                format!("Attack with ALL {} units (risky!)", snapshot.my_units.len()),
                ActionCategory::Military,
                3,
                None,
                ActionKind::AllOutAttack,
            );
        }

        if !snapshot.my_buildings.is_empty() {
            out.push(
                "Defend Base",
                format!("Move {} military units to defend base", military),
                ActionCategory::Defense,
                4,
                None,
                ActionKind::DefendBase,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::classify::KeywordClassifier;
    use crate::game::snapshot::Entity;

    fn builder() -> ActionCatalogBuilder {
        ActionCatalogBuilder::new(Arc::new(KeywordClassifier))
    }

    fn worker(id: u64) -> Entity {
        Entity::unit(id, "units/athen/support_female_citizen")
    }

    fn soldier(id: u64) -> Entity {
        Entity::unit(id, "units/athen/infantry_spearman_b")
    }

    #[test]
    fn test_empty_snapshot_only_waits() {
        let catalog = builder().build(&GameStateSnapshot::default(), "athen");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.top().kind, ActionKind::Wait);
        assert_eq!(catalog.top().priority, 1);
    }

    #[test]
    fn test_house_check_at_population_boundary() {
        let mut snapshot = GameStateSnapshot {
            my_units: vec![worker(1)],
            resources: ResourceCounts::new(u32::MAX, u32::MAX, u32::MAX, u32::MAX),
            population: u32::MAX,
            population_limit: u32::MAX,
            ..Default::default()
        };
        let catalog = builder().build(&snapshot, "athen");
        assert_eq!(catalog.find_by_name("Build House").unwrap().priority, 9);

        snapshot.population = 16;
        snapshot.population_limit = 20;
        assert!(builder().build(&snapshot, "athen").find_by_name("Build House").is_none());

        snapshot.population = 17;
        assert!(builder().build(&snapshot, "athen").find_by_name("Build House").is_some());
    }

    #[test]
    fn test_idle_workers_produce_gather_actions() {
        let snapshot = GameStateSnapshot {
            my_units: vec![worker(1).idle(), worker(2)],
            resources: ResourceCounts::new(500, 50, 500, 500),
            population_limit: 100,
            ..Default::default()
        };
        let catalog = builder().build(&snapshot, "athen");

        let food = catalog.find_by_name("Gather Food").unwrap();
        let wood = catalog.find_by_name("Gather Wood").unwrap();
        let stone = catalog.find_by_name("Gather Stone").unwrap();
        assert_eq!(food.priority, 8);
        assert_eq!(wood.priority, 8); // 6 + low-stock bonus
        assert_eq!(stone.priority, 6);
        assert!(food.description.contains("1 idle workers"));
    }

    #[test]
    fn test_worker_training_priority_depends_on_worker_count() {
        let mut snapshot = GameStateSnapshot {
            my_buildings: vec![Entity::building(100, "structures/athen/civil_centre")],
            my_units: (0..3).map(worker).collect(),
            resources: ResourceCounts::new(100, 0, 0, 0),
            population_limit: 100,
            ..Default::default()
        };
        let catalog = builder().build(&snapshot, "athen");
        assert_eq!(catalog.find_by_name("Train Worker").unwrap().priority, 7);

        snapshot.my_units = (0..10).map(worker).collect();
        let catalog = builder().build(&snapshot, "athen");
        assert_eq!(catalog.find_by_name("Train Worker").unwrap().priority, 4);
    }

    #[test]
    fn test_training_requires_affordability() {
        let snapshot = GameStateSnapshot {
            my_buildings: vec![
                Entity::building(100, "structures/athen/barracks"),
                Entity::building(101, "structures/athen/stable"),
            ],
            resources: ResourceCounts::new(60, 40, 0, 0),
            ..Default::default()
        };
        let catalog = builder().build(&snapshot, "athen");
        assert!(catalog.find_by_name("Train Spearman").is_some());
        assert!(catalog.find_by_name("Train Cavalry").is_none());
    }

    #[test]
    fn test_catalog_sorted_with_sequential_ids() {
        let snapshot = GameStateSnapshot {
            my_units: vec![worker(1).idle(), soldier(2)],
            my_buildings: vec![Entity::building(100, "structures/athen/civil_centre")],
            enemy_units: vec![soldier(50).owned_by(2)],
            resources: ResourceCounts::new(1000, 1000, 1000, 1000),
            population: 2,
            population_limit: 20,
            ..Default::default()
        };
        let catalog = builder().build(&snapshot, "athen");

        let mut ids = catalog.ids();
        ids.sort();
        assert_eq!(ids, (0..catalog.len() as u32).collect::<Vec<_>>());

        let priorities: Vec<i32> = catalog.iter().map(|a| a.priority).collect();
        assert!(priorities.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_boost_resorts_and_breaks_ties_by_generation() {
        let snapshot = GameStateSnapshot {
            my_units: vec![worker(1).idle()],
            resources: ResourceCounts::new(500, 500, 500, 500),
            population_limit: 100,
            ..Default::default()
        };
        let mut catalog = builder().build(&snapshot, "athen");
        catalog.boost(&[ActionCategory::Misc], 10);
        assert_eq!(catalog.top().kind, ActionKind::Wait);
        assert_eq!(catalog.top().priority, 11);

        // Wood, stone and metal all tie at 6 and keep generation order
        let tied: Vec<&str> = catalog
            .iter()
            .filter(|a| a.priority == 6)
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(tied, vec!["Gather Wood", "Gather Stone", "Gather Metal"]);
    }

    #[test]
    fn test_format_for_prompt() {
        let snapshot = GameStateSnapshot {
            my_units: vec![worker(1)],
            resources: ResourceCounts::new(0, 100, 0, 0),
            population: 5,
            population_limit: 5,
            ..Default::default()
        };
        let catalog = builder().build(&snapshot, "athen");
        let text = catalog.format_for_prompt();
        assert!(text.contains("0: [BUILD] Build House (cost: 100 wood)"));
        assert!(text.contains("    Build house (pop: 5/5)"));
        assert!(text.contains("[MISC] Wait"));
    }
}
