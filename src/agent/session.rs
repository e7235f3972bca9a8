//! The game loop
//!
//! Drives one game: decide, step the game, score, record, repeat. Transport
//! errors end the loop and are returned to the caller; everything else is
//! logged and the game goes on.

use crate::agent::engine::DecisionEngine;
use crate::core::config::GameConfig;
use crate::core::error::Result;
use crate::game::snapshot::GameStateSnapshot;
use crate::game::transport::{default_scenario_config, GameTransport};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// How a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing left to command after the grace period
    Defeat,
    /// Turn limit reached
    Completed,
    /// Stopped by the user
    Interrupted,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Defeat => "defeat",
            Outcome::Completed => "completed",
            Outcome::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub turns: u32,
    pub total_reward: f64,
    pub outcome: Outcome,
    pub final_strategy: String,
    pub final_units: usize,
    pub final_buildings: usize,
    pub duration: Duration,
}

impl fmt::Display for EpisodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.duration.as_secs();
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "EPISODE COMPLETE ({})", self.outcome)?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "  Steps:        {}", self.turns)?;
        writeln!(f, "  Total Reward: {:.2}", self.total_reward)?;
        writeln!(f, "  Strategy:     {}", self.final_strategy.to_uppercase())?;
        writeln!(f, "  Final Forces: {} units, {} buildings", self.final_units, self.final_buildings)?;
        writeln!(f, "  Duration:     {}m {}s", secs / 60, secs % 60)?;
        write!(f, "{}", "=".repeat(50))
    }
}

/// Per-turn reward: a little for every unit, a little less for every resource
pub fn turn_reward(snapshot: &GameStateSnapshot) -> f64 {
    snapshot.my_units.len() as f64 * 0.1 + snapshot.resources.total() as f64 * 0.001
}

pub struct GameRunner {
    transport: Box<dyn GameTransport>,
    engine: DecisionEngine,
    config: GameConfig,
    stop: Arc<AtomicBool>,
    span: tracing::Span,
}

impl GameRunner {
    pub fn new(transport: Box<dyn GameTransport>, engine: DecisionEngine, config: GameConfig) -> Self {
        Self {
            transport,
            engine,
            config,
            stop: Arc::new(AtomicBool::new(false)),
            span: tracing::info_span!("component", name = "game_runner"),
        }
    }

    /// Set this flag to stop the loop before the next turn
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Join the running game, or reset the game and memory for a fresh one
    pub async fn start(&mut self, join: bool) -> Result<GameStateSnapshot> {
        if join {
            tracing::info!("Joining existing game...");
            self.transport.step(&[]).await
        } else {
            tracing::info!("Starting new game...");
            let state = self.transport.reset(&default_scenario_config()).await?;
            self.engine.reset()?;
            Ok(state)
        }
    }

    pub async fn run(&mut self, join: bool) -> Result<EpisodeSummary> {
        let span = self.span.clone();
        self.run_game(join).instrument(span).await
    }

    async fn run_game(&mut self, join: bool) -> Result<EpisodeSummary> {
        let started = Instant::now();
        let mut state = self.start(join).await?;
        tracing::info!(
            "Connected! Civ: {}, Units: {}, Buildings: {}",
            self.engine.civ_for(&state).to_uppercase(),
            state.my_units.len(),
            state.my_buildings.len()
        );

        let mut total_reward = 0.0;
        let mut outcome = Outcome::Completed;

        while self.engine.turn() < self.config.max_turns {
            if self.stop.load(Ordering::SeqCst) {
                tracing::info!("Stopped by user");
                outcome = Outcome::Interrupted;
                break;
            }

            let decision = self.engine.decide(&state).await;
            tracing::info!("[{}] → {}", self.engine.status_summary(), decision.description);

            state = match self.transport.step(&decision.commands).await {
                Ok(next) => next,
                Err(e) => {
                    tracing::error!("Game error: {}", e);
                    if let Err(flush) = self.engine.memory_mut().flush_history() {
                        tracing::warn!("Could not flush turn history: {}", flush);
                    }
                    return Err(e);
                }
            };

            let reward = turn_reward(&state);
            total_reward += reward;
            if let Err(e) = self.engine.record_turn_result(&state, &decision, reward) {
                tracing::warn!("Could not record turn: {}", e);
            }

            let turn = self.engine.turn();
            if turn > self.config.game_over_grace_turns && state.is_wiped_out() {
                tracing::info!("Defeat - all forces lost!");
                outcome = Outcome::Defeat;
                break;
            }

            if self.config.progress_every > 0 && turn % self.config.progress_every == 0 {
                self.report_progress(&state);
            }

            if self.config.turn_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.turn_delay_ms)).await;
            }
        }

        if let Err(e) = self.engine.memory_mut().finalize(outcome.as_str()) {
            tracing::warn!("Could not save game summary: {}", e);
        }

        Ok(EpisodeSummary {
            turns: self.engine.turn(),
            total_reward,
            outcome,
            final_strategy: self.engine.strategy().name().to_string(),
            final_units: state.my_units.len(),
            final_buildings: state.my_buildings.len(),
            duration: started.elapsed(),
        })
    }

    fn report_progress(&self, state: &GameStateSnapshot) {
        let workers = state.workers(self.engine.classifier()).count();
        tracing::info!(
            "--- Turn {} Summary --- Workers: {}, Military: {} | Resources: F={}, W={}, S={}, M={} | Strategy: {}",
            self.engine.turn(),
            workers,
            state.my_units.len() - workers,
            state.resources.food,
            state.resources.wood,
            state.resources.stone,
            state.resources.metal,
            self.engine.strategy()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ResourceCounts;
    use crate::game::snapshot::Entity;

    #[test]
    fn test_turn_reward() {
        let snap = GameStateSnapshot {
            my_units: (0..10).map(|i| Entity::unit(i, "units/athen/infantry_spearman_b")).collect(),
            resources: ResourceCounts::new(1000, 500, 0, 500),
            ..Default::default()
        };
        assert!((turn_reward(&snap) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_turn_reward_with_maxed_stock() {
        let snap = GameStateSnapshot {
            resources: ResourceCounts::new(u32::MAX, u32::MAX, u32::MAX, u32::MAX),
            ..Default::default()
        };
        let expected = 4.0 * u32::MAX as f64 * 0.001;
        assert!((turn_reward(&snap) - expected).abs() < 1e-3);
    }

    #[test]
    fn test_outcome_names() {
        assert_eq!(Outcome::Defeat.as_str(), "defeat");
        assert_eq!(Outcome::Completed.to_string(), "completed");
        assert_eq!(Outcome::Interrupted.as_str(), "interrupted");
    }

    #[test]
    fn test_episode_summary_display() {
        let summary = EpisodeSummary {
            turns: 12,
            total_reward: 4.567,
            outcome: Outcome::Completed,
            final_strategy: "military".into(),
            final_units: 8,
            final_buildings: 2,
            duration: Duration::from_secs(125),
        };
        let text = summary.to_string();
        assert!(text.contains("Steps:        12"));
        assert!(text.contains("Total Reward: 4.57"));
        assert!(text.contains("Duration:     2m 5s"));
    }
}
