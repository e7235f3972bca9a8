//! Async completion providers
//!
//! Two interchangeable vendors sit behind [`CompletionProvider`]: Gemini as
//! the primary and Anthropic as the fallback. Which one is used is decided by
//! configuration; callers only see the trait.

use crate::core::config::{LlmConfig, ProviderConfig, ProviderKind};
use crate::core::error::{BismarckError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// System instruction sent with every request
pub const SYSTEM_INSTRUCTION: &str =
    "You are playing a real-time strategy game. Choose actions by responding with ONLY a number.";

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system: Option<String>,
}

/// A text-completion backend. Errors are `Provider` (transport, auth, empty
/// reply); the gateway decides whether to retry.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| BismarckError::Provider(e.to_string()))
}

/// Google Gemini `generateContent`
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
            api_url,
            model,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Self::new(config.api_key()?, config.api_url.clone(), config.model.clone())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".into()),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system.as_ref().map(|text| GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: text.clone() }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BismarckError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BismarckError::Provider(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let completion: GeminiResponse = response
            .json()
            .await
            .map_err(|e| BismarckError::Provider(e.to_string()))?;

        completion
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| BismarckError::Provider("Empty response".into()))
    }
}

/// Anthropic Messages API
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            api_key,
            api_url,
            model,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Self::new(config.api_key()?, config.api_url.clone(), config.model.clone())
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone(),
            messages: vec![Message {
                role: "user".into(),
                content: request.prompt.clone(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BismarckError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BismarckError::Provider(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| BismarckError::Provider(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| BismarckError::Provider("Empty response".into()))
    }
}

/// Construct the configured provider. A missing API key is a `Config` error.
pub fn build_provider(config: &LlmConfig) -> Result<Box<dyn CompletionProvider>> {
    let provider: Box<dyn CompletionProvider> = match config.provider {
        ProviderKind::Primary => Box::new(GeminiProvider::from_config(&config.primary)?),
        ProviderKind::Fallback => Box::new(AnthropicProvider::from_config(&config.fallback)?),
    };
    tracing::info!("Using {} model: {}", provider.name(), config.selected().model);
    Ok(provider)
}

/// Replays canned replies in order; records every request it receives.
///
/// Drives the agent without a live model. `Err` entries surface as provider
/// errors.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Ok(reply.into()));
        }
    }

    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(message.into()));
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.iter().map(|req| req.prompt.clone()).collect())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self
            .replies
            .lock()
            .map_err(|_| BismarckError::Provider("script lock poisoned".into()))?
            .pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(BismarckError::Provider(message)),
            None => Err(BismarckError::Provider("script exhausted".into())),
        }
    }
}

/// Lets a shared provider be handed to the gateway while a test keeps a handle
#[async_trait]
impl<P: CompletionProvider + ?Sized> CompletionProvider for std::sync::Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        (**self).complete(request).await
    }
}

// Gemini API format
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_endpoint() {
        let provider = GeminiProvider::new(
            "k".into(),
            "https://generativelanguage.googleapis.com/v1beta/models/".into(),
            "gemini-2.0-flash".into(),
        )
        .unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_gemini_request_shape() {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".into()),
                parts: vec![GeminiPart { text: "hi".into() }],
            }],
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: SYSTEM_INSTRUCTION.into(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: 0.3,
                max_output_tokens: 50,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 50);
        assert!(json["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn test_gemini_response_parses_first_candidate() {
        let raw = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"3"}]}}]}"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "3");
    }

    #[test]
    fn test_anthropic_request_omits_missing_system() {
        let body = AnthropicRequest {
            model: "m".into(),
            max_tokens: 50,
            temperature: 0.3,
            system: None,
            messages: vec![Message {
                role: "user".into(),
                content: "pick".into(),
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new(["1", "2"]);
        provider.push_error("boom");
        let request = CompletionRequest {
            prompt: "p".into(),
            temperature: 0.0,
            max_tokens: 5,
            system: None,
        };
        assert_eq!(provider.complete(&request).await.unwrap(), "1");
        assert_eq!(provider.complete(&request).await.unwrap(), "2");
        assert!(matches!(
            provider.complete(&request).await,
            Err(BismarckError::Provider(m)) if m == "boom"
        ));
        assert!(provider.complete(&request).await.is_err());
        assert_eq!(provider.call_count(), 4);
    }

    #[test]
    fn test_build_provider_without_key_is_config_error() {
        let mut config = LlmConfig::default();
        config.provider = ProviderKind::Fallback;
        config.fallback.api_key_env = "BISMARCK_TEST_KEY_THAT_IS_NEVER_SET".into();
        assert!(matches!(
            build_provider(&config),
            Err(BismarckError::Config(_))
        ));
    }
}
