//! Bismarck - LLM-driven agent for the 0 A.D. RL interface

pub mod actions;
pub mod agent;
pub mod core;
pub mod game;
pub mod llm;
pub mod memory;
