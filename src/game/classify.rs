//! Entity role classification
//!
//! The game exposes no authoritative role field, only template paths. These
//! heuristics match keywords in names and templates. They are pluggable
//! through [`EntityClassifier`] because a template that happens to contain a
//! worker keyword will be misclassified.

use crate::core::types::Resource;
use crate::game::snapshot::Entity;
use std::fmt;

/// What a building can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildingRole {
    CivicCenter,
    Barracks,
    Stable,
}

pub trait EntityClassifier: fmt::Debug + Send + Sync {
    /// Whether a template path names a structure
    fn is_building_template(&self, template: &str) -> bool;

    /// Workers gather and construct; everything else that is ours is military
    fn is_worker(&self, entity: &Entity) -> bool;

    fn building_role(&self, entity: &Entity) -> Option<BuildingRole>;

    /// Resource yielded by a gaia entity, if any
    fn resource_of(&self, entity: &Entity) -> Option<Resource>;
}

const BUILDING_KEYWORDS: &[&str] = &[
    "house",
    "barracks",
    "stable",
    "tower",
    "wall",
    "gate",
    "centre",
    "center",
    "farm",
    "dock",
    "market",
    "temple",
    "fortress",
    "storehouse",
    "farmstead",
    "field",
];

const WORKER_KEYWORDS: &[&str] = &["female", "citizen"];
const CIVIC_KEYWORDS: &[&str] = &["civil", "centre", "center"];

const FOOD_KEYWORDS: &[&str] = &["fruit", "berry", "bush", "fish", "field", "farm", "hunt"];
const WOOD_KEYWORDS: &[&str] = &["tree", "wood"];
const STONE_KEYWORDS: &[&str] = &["rock", "stone"];
const METAL_KEYWORDS: &[&str] = &["/ore", "ore_", "metal", "mine"];

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    keywords.iter().any(|k| haystack.contains(k))
}

/// Keyword-matching classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl EntityClassifier for KeywordClassifier {
    fn is_building_template(&self, template: &str) -> bool {
        contains_any(template, BUILDING_KEYWORDS)
    }

    fn is_worker(&self, entity: &Entity) -> bool {
        !entity.is_building && contains_any(&entity.display_name, WORKER_KEYWORDS)
    }

    fn building_role(&self, entity: &Entity) -> Option<BuildingRole> {
        if !entity.is_building {
            return None;
        }
        let name = &entity.display_name;
        if contains_any(name, CIVIC_KEYWORDS) {
            Some(BuildingRole::CivicCenter)
        } else if contains_any(name, &["barracks"]) {
            Some(BuildingRole::Barracks)
        } else if contains_any(name, &["stable"]) {
            Some(BuildingRole::Stable)
        } else {
            None
        }
    }

    fn resource_of(&self, entity: &Entity) -> Option<Resource> {
        let template = &entity.template;
        if contains_any(template, METAL_KEYWORDS) {
            Some(Resource::Metal)
        } else if contains_any(template, STONE_KEYWORDS) {
            Some(Resource::Stone)
        } else if contains_any(template, WOOD_KEYWORDS) {
            Some(Resource::Wood)
        } else if contains_any(template, FOOD_KEYWORDS) {
            Some(Resource::Food)
        } else {
            None
        }
    }
}
