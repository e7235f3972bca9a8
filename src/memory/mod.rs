//! Agent memory: recent turns, session statistics and learned knowledge

pub mod knowledge;
pub mod records;
pub mod store;

pub use knowledge::{KnowledgeBase, KnowledgeCategory};
pub use records::{GameSummary, SessionStats, TurnRecord};
pub use store::MemoryStore;
