//! Two-phase decision engine
//!
//! Each call to [`DecisionEngine::decide`] is one turn:
//!
//! 1. Strategic planning, when due: ask the model for a posture and fall back
//!    to economy if the reply names none.
//! 2. Tactical execution, every turn: build the catalog, boost the actions the
//!    posture prefers, ask the model for an action id and fall back to the top
//!    action if the reply is unusable.
//!
//! Model failures never leave this module. The engine always returns a
//! decision, possibly one with no commands.

use crate::actions::catalog::{ActionCatalogBuilder, ActionKind};
use crate::actions::resolve::CommandResolver;
use crate::agent::prompt::{strategic_prompt, tactical_prompt, ForceCounts};
use crate::agent::strategy::{Strategy, StrategyState};
use crate::core::config::AgentSettings;
use crate::core::error::{BismarckError, Result};
use crate::game::classify::EntityClassifier;
use crate::game::command::Command;
use crate::game::knowledge::DEFAULT_CIV;
use crate::game::snapshot::GameStateSnapshot;
use crate::llm::gateway::{Choices, LlmGateway};
use crate::llm::parser::parse_strategy;
use crate::memory::knowledge::KnowledgeCategory;
use crate::memory::records::TurnRecord;
use crate::memory::store::MemoryStore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::Instrument;

/// Flat priority bonus for actions in the active strategy's categories
pub const STRATEGY_BOOST: i32 = 3;
/// Recent turns shown in the strategic prompt
pub const HISTORY_TURNS: usize = 5;

/// Outcome of one turn
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub commands: Vec<Command>,
    /// Name of the chosen action
    pub description: String,
    pub action_id: u32,
    pub kind: ActionKind,
    pub strategy: Strategy,
    /// False when the model's reply was unusable and the top action was taken
    pub from_model: bool,
}

pub struct DecisionEngine {
    gateway: LlmGateway,
    memory: MemoryStore,
    classifier: Arc<dyn EntityClassifier>,
    catalog_builder: ActionCatalogBuilder,
    strategy: StrategyState,
    initial_strategy: Strategy,
    interval: u32,
    turn: u32,
    civ_override: Option<String>,
    rng: ChaCha8Rng,
    span: tracing::Span,
}

impl DecisionEngine {
    pub fn new(
        gateway: LlmGateway,
        memory: MemoryStore,
        classifier: Arc<dyn EntityClassifier>,
        settings: &AgentSettings,
    ) -> Result<Self> {
        let initial_strategy = Strategy::from_name(&settings.initial_strategy).ok_or_else(|| {
            BismarckError::Config(format!("unknown strategy '{}'", settings.initial_strategy))
        })?;
        if settings.strategic_interval == 0 {
            return Err(BismarckError::Config("strategic_interval must be at least 1".into()));
        }

        Ok(Self {
            gateway,
            memory,
            catalog_builder: ActionCatalogBuilder::new(classifier.clone()),
            classifier,
            strategy: StrategyState::new(initial_strategy),
            initial_strategy,
            interval: settings.strategic_interval,
            turn: 0,
            civ_override: None,
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            span: tracing::info_span!("component", name = "decision_engine"),
        })
    }

    /// Use this civilization instead of the one the game reports
    pub fn with_civ(mut self, civ: Option<String>) -> Self {
        self.civ_override = civ;
        self
    }

    pub fn with_catalog_builder(mut self, builder: ActionCatalogBuilder) -> Self {
        self.catalog_builder = builder;
        self
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy.current
    }

    pub fn strategy_state(&self) -> &StrategyState {
        &self.strategy
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    pub fn classifier(&self) -> &dyn EntityClassifier {
        self.classifier.as_ref()
    }

    /// Civilization for template lookups: override, then game, then default
    pub fn civ_for(&self, snapshot: &GameStateSnapshot) -> String {
        self.civ_override
            .clone()
            .or_else(|| snapshot.civ.clone())
            .unwrap_or_else(|| DEFAULT_CIV.to_string())
    }

    /// Decide this turn's commands
    pub async fn decide(&mut self, snapshot: &GameStateSnapshot) -> Decision {
        let span = self.span.clone();
        self.decide_turn(snapshot).instrument(span).await
    }

    async fn decide_turn(&mut self, snapshot: &GameStateSnapshot) -> Decision {
        self.turn += 1;

        if self.strategy.is_due(self.turn, self.interval) {
            tracing::info!("=== Phase 1: Strategic Planning ===");
            self.plan_strategy(snapshot).await;
        }

        tracing::info!("=== Phase 2: Tactical ({}) ===", self.strategy.current);
        self.execute_tactics(snapshot).await
    }

    async fn plan_strategy(&mut self, snapshot: &GameStateSnapshot) {
        let knowledge = self
            .memory
            .knowledge(Some(KnowledgeCategory::Strategies))
            .unwrap_or_else(|e| {
                tracing::warn!("Could not read strategies: {}", e);
                String::new()
            });
        let prompt = strategic_prompt(
            self.turn,
            snapshot,
            ForceCounts::of(snapshot, self.classifier.as_ref()),
            &self.memory.recent_summary(HISTORY_TURNS),
            &knowledge,
        );
        tracing::debug!("Strategic prompt:\n{}", prompt);

        let chosen = match self.gateway.complete(&prompt).await {
            Ok(reply) => parse_strategy(&reply).unwrap_or_else(|| {
                tracing::warn!("No strategy in reply '{}', defaulting to economy", reply.trim());
                Strategy::Economy
            }),
            Err(e) => {
                tracing::warn!("Strategic planning failed ({}), defaulting to economy", e);
                Strategy::Economy
            }
        };

        if let Some(previous) = self.strategy.apply(chosen, self.turn) {
            tracing::info!("Strategy changed: {} → {}", previous, chosen);
            self.memory.set_strategy(chosen.name());
        }
    }

    async fn execute_tactics(&mut self, snapshot: &GameStateSnapshot) -> Decision {
        let civ = self.civ_for(snapshot);
        let strategy = self.strategy.current;

        let mut catalog = self.catalog_builder.build(snapshot, &civ);
        catalog.boost(strategy.profile().preferred, STRATEGY_BOOST);

        let prompt = tactical_prompt(
            self.turn,
            strategy,
            snapshot,
            ForceCounts::of(snapshot, self.classifier.as_ref()),
            &catalog,
        );
        tracing::debug!("Tactical prompt:\n{}", prompt);

        let ids = catalog.ids();
        let picked = self
            .gateway
            .try_choose_number(&prompt, Choices::Ids(&ids))
            .await;

        let action = match picked.and_then(|id| catalog.get(id)) {
            Some(action) => action,
            None => {
                let top = catalog.top();
                tracing::warn!("Falling back to top action {}: {}", top.id, top.name);
                top
            }
        };

        let resolver = CommandResolver::new(self.classifier.as_ref(), &civ);
        let commands = resolver.resolve(&action.kind, snapshot, &mut self.rng);
        tracing::info!(
            "Turn {}: action {} ({}) → {} commands",
            self.turn,
            action.id,
            action.name,
            commands.len()
        );

        Decision {
            commands,
            description: action.name.clone(),
            action_id: action.id,
            kind: action.kind,
            strategy,
            from_model: picked.is_some(),
        }
    }

    /// Record the state reached after executing `decision`
    pub fn record_turn_result(
        &mut self,
        snapshot: &GameStateSnapshot,
        decision: &Decision,
        reward: f64,
    ) -> Result<()> {
        let record = TurnRecord {
            game_time: snapshot.time,
            action_id: Some(decision.action_id),
            action_kind: Some(decision.kind),
            my_units: snapshot.my_units.len(),
            my_buildings: snapshot.my_buildings.len(),
            enemy_units: snapshot.enemy_units.len(),
            resources: snapshot.resources,
            reward,
            ..TurnRecord::new(self.turn, decision.description.clone())
        };
        self.memory.record_turn(record)
    }

    pub fn status_summary(&self) -> String {
        format!(
            "Turn {} | Strategy: {} | Next eval in {} turns",
            self.turn,
            self.strategy.current,
            self.strategy.turns_until_due(self.turn, self.interval)
        )
    }

    /// Start over for a new game. Memory analyzes the finished session first.
    pub fn reset(&mut self) -> Result<()> {
        self.memory.reset()?;
        self.turn = 0;
        self.strategy = StrategyState::new(self.initial_strategy);
        let _guard = self.span.enter();
        tracing::info!("Decision engine reset for new game");
        Ok(())
    }
}
