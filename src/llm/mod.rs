//! Language model access: providers, reply parsing and the retrying gateway

pub mod client;
pub mod gateway;
pub mod parser;

pub use client::{build_provider, CompletionProvider, CompletionRequest, ScriptedProvider};
pub use gateway::{Choices, GatewaySettings, LlmGateway};
pub use parser::{extract_number, parse_strategy};
