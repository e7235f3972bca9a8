//! HTTP transport to the game's RL interface
//!
//! Start the game with `pyrogenesis --rl-interface=127.0.0.1:6000`. The
//! interface exposes `POST /reset` (scenario config in, state out) and
//! `POST /step` (commands in, state out).

use crate::core::config::GameConfig;
use crate::core::error::{BismarckError, Result};
use crate::game::classify::EntityClassifier;
use crate::game::command::Command;
use crate::game::snapshot::GameStateSnapshot;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Game engine boundary. Failures are fatal to the game loop and never retried.
#[async_trait]
pub trait GameTransport: Send + Sync {
    /// Check the game is reachable
    async fn probe(&self) -> Result<()>;

    /// Start a new game from a scenario config
    async fn reset(&self, config: &Value) -> Result<GameStateSnapshot>;

    /// Apply commands and advance the simulation one step
    async fn step(&self, commands: &[Command]) -> Result<GameStateSnapshot>;
}

pub struct HttpTransport {
    client: Client,
    base_url: String,
    player_id: u32,
    classifier: Arc<dyn EntityClassifier>,
}

impl HttpTransport {
    pub fn new(config: &GameConfig, classifier: Arc<dyn EntityClassifier>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| BismarckError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            player_id: config.player_id,
            classifier,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<GameStateSnapshot> {
        let url = format!("{}/{}", self.base_url, path);
        let request = match body {
            Some(json) => self.client.post(&url).json(json),
            None => self.client.post(&url).body(""),
        };

        let response = request
            .send()
            .await
            .map_err(|e| BismarckError::Transport(format!("{} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BismarckError::Transport(format!(
                "{} returned {}: {}",
                path, status, error_text
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| BismarckError::Transport(format!("{} decode failed: {}", path, e)))?;

        Ok(GameStateSnapshot::from_raw(
            &raw,
            self.player_id,
            self.classifier.as_ref(),
        ))
    }
}

#[async_trait]
impl GameTransport for HttpTransport {
    async fn probe(&self) -> Result<()> {
        let result = self
            .client
            .post(format!("{}/step", self.base_url))
            .body("")
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match result {
            // Any HTTP response, even an error status, means the game is up
            Ok(_) => Ok(()),
            Err(e) => Err(BismarckError::Transport(format!(
                "could not connect to {}: {}",
                self.base_url, e
            ))),
        }
    }

    async fn reset(&self, config: &Value) -> Result<GameStateSnapshot> {
        let snapshot = self.post("reset", Some(config)).await?;
        tracing::info!("Game reset successfully");
        Ok(snapshot)
    }

    async fn step(&self, commands: &[Command]) -> Result<GameStateSnapshot> {
        if commands.is_empty() {
            return self.post("step", None).await;
        }
        let payload = step_payload(commands, self.player_id);
        self.post("step", Some(&payload)).await
    }
}

pub fn step_payload(commands: &[Command], player_id: u32) -> Value {
    json!({
        "commands": commands.iter().map(|c| c.to_wire(player_id)).collect::<Vec<_>>()
    })
}

/// Scenario used when starting a fresh game: us against the built-in AI
pub fn default_scenario_config() -> Value {
    json!({
        "settings": {
            "Name": "AI Game",
            "mapType": "scenario",
            "CheatsEnabled": true,
            "PlayerData": [
                null,
                {"Name": "AI Player", "Civ": "athen", "AI": "", "AIDiff": 3, "Team": -1},
                {"Name": "Enemy", "Civ": "spart", "AI": "petra", "AIDiff": 1, "Team": -1}
            ]
        },
        "map": "maps/scenarios/arcadia",
        "mapType": "scenario"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EntityId;
    use crate::game::classify::KeywordClassifier;

    #[test]
    fn test_step_payload_tags_player() {
        let payload = step_payload(
            &[Command::Attack {
                units: vec![EntityId(1)],
                target: EntityId(9),
            }],
            1,
        );
        let commands = payload["commands"].as_array().unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0]["player"], 1);
        assert_eq!(commands[0]["type"], "attack");
        assert_eq!(commands[0]["target"], 9);
    }

    #[test]
    fn test_default_scenario_has_external_player() {
        let config = default_scenario_config();
        assert_eq!(config["settings"]["PlayerData"][1]["AI"], "");
        assert_eq!(config["settings"]["PlayerData"][2]["AI"], "petra");
    }

    #[test]
    fn test_transport_base_url() {
        let config = GameConfig {
            host: "10.0.0.5".into(),
            port: 6100,
            ..GameConfig::default()
        };
        let transport = HttpTransport::new(&config, Arc::new(KeywordClassifier)).unwrap();
        assert_eq!(transport.base_url(), "http://10.0.0.5:6100");
    }

    #[tokio::test]
    async fn test_step_against_closed_port_is_transport_error() {
        let config = GameConfig {
            host: "127.0.0.1".into(),
            port: 1,
            timeout_secs: 2,
            ..GameConfig::default()
        };
        let transport = HttpTransport::new(&config, Arc::new(KeywordClassifier)).unwrap();
        let result = transport.step(&[]).await;
        assert!(matches!(result, Err(BismarckError::Transport(_))));
    }
}
