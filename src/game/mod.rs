//! Game-facing types: snapshots, commands, classification and transport

pub mod classify;
pub mod command;
pub mod knowledge;
pub mod snapshot;
pub mod transport;

pub use classify::{BuildingRole, EntityClassifier, KeywordClassifier};
pub use command::Command;
pub use snapshot::{Entity, GameStateSnapshot};
pub use transport::{GameTransport, HttpTransport};
