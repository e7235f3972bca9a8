//! Candidate actions and their resolution into commands

pub mod catalog;
pub mod resolve;

pub use catalog::{ActionCatalog, ActionCatalogBuilder, ActionCategory, ActionKind, ScoredAction};
pub use resolve::CommandResolver;
