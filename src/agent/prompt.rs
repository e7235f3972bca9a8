//! Prompt text for the two decision phases

use crate::actions::catalog::ActionCatalog;
use crate::agent::strategy::Strategy;
use crate::game::classify::EntityClassifier;
use crate::game::snapshot::GameStateSnapshot;

/// Characters of the strategies file included in the strategic prompt
pub const KNOWLEDGE_EXCERPT_CHARS: usize = 500;

/// Worker / military split used in both prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceCounts {
    pub workers: usize,
    pub military: usize,
}

impl ForceCounts {
    pub fn of(snapshot: &GameStateSnapshot, classifier: &dyn EntityClassifier) -> Self {
        let workers = snapshot.workers(classifier).count();
        Self {
            workers,
            military: snapshot.my_units.len() - workers,
        }
    }
}

pub fn strategic_prompt(
    turn: u32,
    snapshot: &GameStateSnapshot,
    forces: ForceCounts,
    recent_history: &str,
    strategies_knowledge: &str,
) -> String {
    let res = &snapshot.resources;
    let excerpt: String = strategies_knowledge
        .chars()
        .take(KNOWLEDGE_EXCERPT_CHARS)
        .collect();

    let options: Vec<String> = Strategy::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {} - {}", i + 1, s, s.recommendation()))
        .collect();

    format!(
        "You are the strategic commander for a 0 A.D. game.

## Current Game Status (Turn {turn})

**Resources:**
- Food: {food}
- Wood: {wood}
- Stone: {stone}
- Metal: {metal}

**Population:** {pop}/{limit}
- Workers: {workers}
- Military: {military}

**Buildings:** {buildings}

**Enemy Status:**
- Visible enemy units: {enemy_units}
- Visible enemy buildings: {enemy_buildings}

**Recent History:**
{recent_history}

**Known Strategies:**
{excerpt}

**Available Strategies:**
{options}

Based on the current game state, which strategy should we focus on?

Reply with ONLY one word: ECONOMY, MILITARY, DEFENSE, or ATTACK",
        food = res.food,
        wood = res.wood,
        stone = res.stone,
        metal = res.metal,
        pop = snapshot.population,
        limit = snapshot.population_limit,
        workers = forces.workers,
        military = forces.military,
        buildings = snapshot.my_buildings.len(),
        enemy_units = snapshot.enemy_units.len(),
        enemy_buildings = snapshot.enemy_buildings.len(),
        options = options.join("\n"),
    )
}

pub fn tactical_prompt(
    turn: u32,
    strategy: Strategy,
    snapshot: &GameStateSnapshot,
    forces: ForceCounts,
    catalog: &ActionCatalog,
) -> String {
    let res = &snapshot.resources;
    let profile = strategy.profile();
    let preferred: Vec<&str> = profile.preferred.iter().map(|c| c.label()).collect();

    format!(
        "Turn {turn} | Strategy: {strategy}
Resources: F={food} W={wood} S={stone} M={metal}
Units: {workers} workers, {military} military | Pop: {pop}/{limit}
Enemy: {enemies} units visible

Current Strategy: {strategy}
{description}

Prioritize [{preferred}] actions for {strategy} strategy.

Available Actions:
{actions}

Choose the best action number for our {strategy} strategy.
Reply with ONLY the action number:",
        food = res.food,
        wood = res.wood,
        stone = res.stone,
        metal = res.metal,
        workers = forces.workers,
        military = forces.military,
        pop = snapshot.population,
        limit = snapshot.population_limit,
        enemies = snapshot.enemy_units.len(),
        description = profile.description,
        preferred = preferred.join(", "),
        actions = catalog.format_for_prompt(),
    )
}
