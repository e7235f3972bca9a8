//! The playing agent: strategy, prompts, decisions and the game loop

pub mod engine;
pub mod prompt;
pub mod session;
pub mod strategy;

pub use engine::{Decision, DecisionEngine};
pub use session::{EpisodeSummary, GameRunner, Outcome};
pub use strategy::{Strategy, StrategyState};
