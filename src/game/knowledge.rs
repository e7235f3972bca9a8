//! Civilization templates and costs
//!
//! Template strings are the game's entity paths, e.g.
//! `units/athen/infantry_spearman_b`. Costs are approximate per-item prices
//! used only for affordability gating.

use crate::core::types::{Resource, ResourceCounts};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Trainable unit roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitRole {
    Worker,
    Infantry,
    Cavalry,
}

impl UnitRole {
    /// Key into the per-civ template table
    pub fn template_key(&self) -> &'static str {
        match self {
            UnitRole::Worker => "female_citizen",
            UnitRole::Infantry => "infantry_spearman",
            UnitRole::Cavalry => "cavalry",
        }
    }
}

/// Constructible structures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    House,
    Barracks,
    CivicCenter,
    Storehouse,
    Farmstead,
    Field,
}

impl StructureKind {
    fn template_suffix(&self) -> &'static str {
        match self {
            StructureKind::House => "house",
            StructureKind::Barracks => "barracks",
            StructureKind::CivicCenter => "civil_centre",
            StructureKind::Storehouse => "storehouse",
            StructureKind::Farmstead => "farmstead",
            StructureKind::Field => "field",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StructureKind::House => "House",
            StructureKind::Barracks => "Barracks",
            StructureKind::CivicCenter => "Civic Center",
            StructureKind::Storehouse => "Storehouse",
            StructureKind::Farmstead => "Farmstead",
            StructureKind::Field => "Field",
        }
    }
}

const CIV_UNITS: &[(&str, &[(&str, &str)])] = &[
    (
        "mace",
        &[
            ("female_citizen", "units/mace/support_female_citizen"),
            ("infantry_spearman", "units/mace/infantry_spearman_b"),
            ("infantry_pikeman", "units/mace/infantry_pikeman_b"),
            ("cavalry", "units/mace/cavalry_spearman_b"),
        ],
    ),
    (
        "athen",
        &[
            ("female_citizen", "units/athen/support_female_citizen"),
            ("infantry_spearman", "units/athen/infantry_spearman_b"),
            ("infantry_slinger", "units/athen/infantry_slinger_b"),
            ("cavalry", "units/athen/cavalry_javelinist_b"),
        ],
    ),
    (
        "spart",
        &[
            ("female_citizen", "units/spart/support_female_citizen"),
            ("infantry_spearman", "units/spart/infantry_spearman_b"),
            ("infantry_pikeman", "units/spart/infantry_pikeman_b"),
        ],
    ),
    (
        "rome",
        &[
            ("female_citizen", "units/rome/support_female_citizen"),
            ("infantry_swordsman", "units/rome/infantry_swordsman_b"),
            ("infantry_spearman", "units/rome/infantry_spearman_b"),
        ],
    ),
    (
        "pers",
        &[
            ("female_citizen", "units/pers/support_female_citizen"),
            ("infantry_spearman", "units/pers/infantry_spearman_b"),
            ("cavalry", "units/pers/cavalry_spearman_b"),
        ],
    ),
    (
        "default",
        &[
            ("female_citizen", "units/mace/support_female_citizen"),
            ("infantry_spearman", "units/mace/infantry_spearman_b"),
        ],
    ),
];

pub const DEFAULT_CIV: &str = "mace";

fn civ_table(civ: &str) -> &'static [(&'static str, &'static str)] {
    let civ = civ.to_lowercase();
    CIV_UNITS
        .iter()
        .find(|(name, _)| *name == civ)
        .or_else(|| CIV_UNITS.iter().find(|(name, _)| *name == "default"))
        .map(|(_, units)| *units)
        .unwrap_or(&[])
}

/// Unit template for a civilization.
///
/// Unknown civs use the default table; roles the civ lacks fall back to its
/// worker template.
pub fn unit_template(civ: &str, role: UnitRole) -> String {
    let table = civ_table(civ);
    let lookup = |key: &str| {
        table
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, template)| template.to_string())
    };
    lookup(role.template_key())
        .or_else(|| lookup(UnitRole::Worker.template_key()))
        .unwrap_or_default()
}

pub fn structure_template(civ: &str, kind: StructureKind) -> String {
    format!("structures/{}/{}", civ.to_lowercase(), kind.template_suffix())
}

/// Priced items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CostItem {
    Unit(UnitRole),
    Structure(StructureKind),
}

/// Per-item resource costs
#[derive(Debug, Clone)]
pub struct CostTable {
    costs: HashMap<CostItem, ResourceCounts>,
}

impl Default for CostTable {
    fn default() -> Self {
        let mut costs = HashMap::new();
        costs.insert(CostItem::Unit(UnitRole::Worker), ResourceCounts::new(50, 0, 0, 0));
        costs.insert(CostItem::Unit(UnitRole::Infantry), ResourceCounts::new(50, 35, 0, 0));
        costs.insert(CostItem::Unit(UnitRole::Cavalry), ResourceCounts::new(100, 50, 0, 0));
        costs.insert(CostItem::Structure(StructureKind::House), ResourceCounts::new(0, 100, 0, 0));
        costs.insert(
            CostItem::Structure(StructureKind::Barracks),
            ResourceCounts::new(0, 150, 100, 0),
        );
        costs.insert(
            CostItem::Structure(StructureKind::Farmstead),
            ResourceCounts::new(0, 100, 0, 0),
        );
        Self { costs }
    }
}

impl CostTable {
    /// Empty table: everything is free
    pub fn empty() -> Self {
        Self {
            costs: HashMap::new(),
        }
    }

    pub fn with_cost(mut self, item: CostItem, cost: ResourceCounts) -> Self {
        self.costs.insert(item, cost);
        self
    }

    pub fn cost(&self, item: CostItem) -> Option<ResourceCounts> {
        self.costs.get(&item).copied()
    }

    /// Every priced resource must be in stock; unpriced items are always affordable
    pub fn can_afford(&self, item: CostItem, stock: &ResourceCounts) -> bool {
        match self.costs.get(&item) {
            Some(cost) => Resource::ALL.iter().all(|&r| stock.get(r) >= cost.get(r)),
            None => true,
        }
    }
}

/// Render a cost as `"50 food, 35 wood"`, skipping zero entries
pub fn format_cost(cost: &ResourceCounts) -> String {
    Resource::ALL
        .iter()
        .filter(|&&r| cost.get(r) > 0)
        .map(|&r| format!("{} {}", cost.get(r), r))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_template_known_civ() {
        assert_eq!(
            unit_template("athen", UnitRole::Cavalry),
            "units/athen/cavalry_javelinist_b"
        );
        assert_eq!(
            unit_template("ATHEN", UnitRole::Worker),
            "units/athen/support_female_citizen"
        );
    }

    #[test]
    fn test_unit_template_missing_role_falls_back_to_worker() {
        assert_eq!(
            unit_template("rome", UnitRole::Cavalry),
            "units/rome/support_female_citizen"
        );
    }

    #[test]
    fn test_unit_template_unknown_civ_uses_default() {
        assert_eq!(
            unit_template("atlantis", UnitRole::Infantry),
            "units/mace/infantry_spearman_b"
        );
    }

    #[test]
    fn test_structure_template() {
        assert_eq!(
            structure_template("spart", StructureKind::House),
            "structures/spart/house"
        );
        assert_eq!(
            structure_template("mace", StructureKind::CivicCenter),
            "structures/mace/civil_centre"
        );
    }

    #[test]
    fn test_can_afford_checks_every_resource() {
        let costs = CostTable::default();
        let barracks = CostItem::Structure(StructureKind::Barracks);
        assert!(!costs.can_afford(barracks, &ResourceCounts::new(0, 500, 99, 0)));
        assert!(costs.can_afford(barracks, &ResourceCounts::new(0, 150, 100, 0)));
    }

    #[test]
    fn test_unpriced_item_is_affordable() {
        let costs = CostTable::empty();
        assert!(costs.can_afford(
            CostItem::Unit(UnitRole::Cavalry),
            &ResourceCounts::default()
        ));
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(&ResourceCounts::new(50, 35, 0, 0)), "50 food, 35 wood");
    }
}
