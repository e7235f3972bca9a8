//! Agent configuration loaded from TOML
//!
//! Every section is optional in the file; missing keys fall back to the
//! defaults below. `${VAR}` / `$VAR` references are substituted from the
//! environment before parsing so credentials can stay out of the file.

use crate::core::error::{BismarckError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Connection and pacing settings for the game transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub host: String,
    pub port: u16,
    /// Player slot we control (0 is gaia)
    pub player_id: u32,
    /// Per-request timeout. Must be finite; a stuck call otherwise blocks the turn forever.
    pub timeout_secs: u64,
    pub max_turns: u32,
    /// Pause between turns so the game advances
    pub turn_delay_ms: u64,
    /// Override the civilization detected from the game
    pub civ: Option<String>,
    /// Print a progress report every N turns
    pub progress_every: u32,
    /// Turns to play before an empty army counts as defeat
    pub game_over_grace_turns: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 6000,
            player_id: 1,
            timeout_secs: 30,
            max_turns: 200,
            turn_delay_ms: 300,
            civ: None,
            progress_every: 10,
            game_over_grace_turns: 20,
        }
    }
}

impl GameConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Which completion vendor to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Primary,
    Fallback,
}

impl Default for ProviderKind {
    fn default() -> Self {
        Self::Primary
    }
}

/// Endpoint settings for a single vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl ProviderConfig {
    pub fn primary_default() -> Self {
        Self {
            api_url: "https://generativelanguage.googleapis.com/v1beta/models".into(),
            model: "gemini-2.0-flash".into(),
            api_key_env: "GEMINI_API_KEY".into(),
        }
    }

    pub fn fallback_default() -> Self {
        Self {
            api_url: "https://api.anthropic.com/v1/messages".into(),
            model: "claude-sonnet-4-20250514".into(),
            api_key_env: "ANTHROPIC_API_KEY".into(),
        }
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(BismarckError::Config(format!(
                "{} environment variable not set",
                self.api_key_env
            ))),
        }
    }
}

/// LLM call settings shared by both vendors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    /// Base backoff delay; attempt `n` waits `retry_delay_ms * 2^n`
    pub retry_delay_ms: u64,
    pub primary: ProviderConfig,
    pub fallback: ProviderConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Primary,
            temperature: 0.3,
            max_tokens: 50,
            max_retries: 3,
            retry_delay_ms: 1000,
            primary: ProviderConfig::primary_default(),
            fallback: ProviderConfig::fallback_default(),
        }
    }
}

impl LlmConfig {
    pub fn selected(&self) -> &ProviderConfig {
        match self.provider {
            ProviderKind::Primary => &self.primary,
            ProviderKind::Fallback => &self.fallback,
        }
    }
}

/// Decision engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Re-plan strategy every N turns
    pub strategic_interval: u32,
    /// Strategy name in effect before the first plan
    pub initial_strategy: String,
    /// Seed for build placement jitter and default picks
    pub seed: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            strategic_interval: 15,
            initial_strategy: "economy".into(),
            seed: 42,
        }
    }
}

/// Memory store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub dir: PathBuf,
    /// Turns kept in short-term memory after eviction
    pub short_term_window: usize,
    /// Flush the session turn log every N turns
    pub flush_every: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./memory"),
            short_term_window: 20,
            flush_every: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            log_file: None,
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub game: GameConfig,
    pub llm: LlmConfig,
    pub agent: AgentSettings,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

impl AgentConfig {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&substitute_env(&raw))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.agent.strategic_interval == 0 {
            return Err(BismarckError::Config(
                "agent.strategic_interval must be at least 1".into(),
            ));
        }
        if self.llm.max_retries == 0 {
            return Err(BismarckError::Config(
                "llm.max_retries must be at least 1".into(),
            ));
        }
        if self.memory.short_term_window == 0 {
            return Err(BismarckError::Config(
                "memory.short_term_window must be at least 1".into(),
            ));
        }
        if crate::agent::strategy::Strategy::from_name(&self.agent.initial_strategy).is_none() {
            return Err(BismarckError::Config(format!(
                "unknown agent.initial_strategy '{}'",
                self.agent.initial_strategy
            )));
        }
        Ok(())
    }
}

/// Escape a value for the inside of a TOML basic string
fn escape_toml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Replace `${VAR}` and `$VAR` with environment values, escaped so they
/// stay inside the quoted string they are written in
fn substitute_env(raw: &str) -> String {
    let mut vars: Vec<(String, String)> = std::env::vars()
        .map(|(key, value)| (key, escape_toml(&value)))
        .collect();
    // Longest names first so `$HOME_DIR` is not clobbered by `$HOME`
    vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut out = raw.to_string();
    for (key, value) in &vars {
        out = out.replace(&format!("${{{}}}", key), value);
    }
    for (key, value) in &vars {
        out = out.replace(&format!("${}", key), value);
    }
    out
}
