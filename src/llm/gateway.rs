//! Fault-tolerant front for a completion provider
//!
//! Retries recoverable failures with exponential backoff (`delay * 2^attempt`,
//! attempt counted from zero) and never lets a failed number choice reach the
//! caller: [`LlmGateway::choose_number`] always returns something.

use crate::core::config::LlmConfig;
use crate::core::error::{BismarckError, Result};
use crate::llm::client::{CompletionProvider, CompletionRequest, SYSTEM_INSTRUCTION};
use crate::llm::parser::extract_number;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::Instrument;

/// The set of numbers a reply may name
#[derive(Debug, Clone, Copy)]
pub enum Choices<'a> {
    /// Any non-negative number; no default range
    Any,
    /// `0..n`
    Range(u32),
    /// An explicit id set
    Ids(&'a [u32]),
}

impl Choices<'_> {
    pub fn accepts(&self, n: u32) -> bool {
        match self {
            Choices::Any => true,
            Choices::Range(limit) => n < *limit,
            Choices::Ids(ids) => ids.contains(&n),
        }
    }

    /// Uniformly random valid choice, or 0 when no range is known
    fn random_default<R: Rng>(&self, rng: &mut R) -> u32 {
        match self {
            Choices::Range(limit) if *limit > 0 => rng.gen_range(0..*limit),
            Choices::Ids(ids) if !ids.is_empty() => ids[rng.gen_range(0..ids.len())],
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system: Option<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for GatewaySettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system: Some(SYSTEM_INSTRUCTION.to_string()),
        }
    }
}

pub struct LlmGateway {
    provider: Box<dyn CompletionProvider>,
    settings: GatewaySettings,
    rng: ChaCha8Rng,
    span: tracing::Span,
}

impl LlmGateway {
    pub fn new(provider: Box<dyn CompletionProvider>, settings: GatewaySettings, seed: u64) -> Self {
        let span = tracing::info_span!("component", name = "llm_gateway", provider = provider.name());
        Self {
            provider,
            settings,
            rng: ChaCha8Rng::seed_from_u64(seed),
            span,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    fn request(&self, prompt: &str) -> CompletionRequest {
        CompletionRequest {
            prompt: prompt.to_string(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            system: self.settings.system.clone(),
        }
    }

    async fn backoff(&self, attempt: u32) {
        if attempt + 1 >= self.settings.max_retries {
            return;
        }
        let delay = self.settings.retry_delay * 2u32.saturating_pow(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Raw completion with retries on recoverable errors.
    ///
    /// Returns the last error once every attempt has failed; non-recoverable
    /// errors are returned immediately.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = self.request(prompt);
        async {
            let mut last_error = BismarckError::Provider("no attempts made".into());
            for attempt in 0..self.settings.max_retries {
                match self.provider.complete(&request).await {
                    Ok(text) => {
                        tracing::debug!("Response: {}", text);
                        return Ok(text);
                    }
                    Err(e) if e.is_recoverable() => {
                        tracing::error!("API error (attempt {}): {}", attempt + 1, e);
                        last_error = e;
                    }
                    Err(e) => return Err(e),
                }
                self.backoff(attempt).await;
            }
            Err(last_error)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Ask for a number in `choices`, retrying provider and parse failures.
    /// `None` once every attempt has failed.
    pub async fn try_choose_number(&self, prompt: &str, choices: Choices<'_>) -> Option<u32> {
        let request = self.request(prompt);
        async {
            for attempt in 0..self.settings.max_retries {
                match self.provider.complete(&request).await {
                    Ok(text) => {
                        tracing::debug!("Response: {}", text);
                        if let Some(n) = extract_number(&text, |n| choices.accepts(n)) {
                            return Some(n);
                        }
                        let preview: String = text.chars().take(100).collect();
                        tracing::warn!("Could not parse action from: {}", preview);
                    }
                    Err(e) => {
                        tracing::error!("API error (attempt {}): {}", attempt + 1, e);
                    }
                }
                self.backoff(attempt).await;
            }
            None
        }
        .instrument(self.span.clone())
        .await
    }

    /// Like [`try_choose_number`](Self::try_choose_number) but never fails:
    /// after exhausting retries it picks a random valid choice, or 0.
    pub async fn choose_number(&mut self, prompt: &str, choices: Choices<'_>) -> u32 {
        if let Some(n) = self.try_choose_number(prompt, choices).await {
            return n;
        }
        let fallback = choices.random_default(&mut self.rng);
        let _guard = self.span.enter();
        tracing::warn!("Using default action: {}", fallback);
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::ScriptedProvider;
    use std::sync::Arc;

    fn gateway(provider: Arc<ScriptedProvider>, retries: u32) -> LlmGateway {
        let settings = GatewaySettings {
            max_retries: retries,
            retry_delay: Duration::ZERO,
            ..GatewaySettings::default()
        };
        LlmGateway::new(Box::new(provider), settings, 7)
    }

    #[tokio::test]
    async fn test_complete_retries_provider_errors() {
        let provider = Arc::new(ScriptedProvider::default());
        provider.push_error("timeout");
        provider.push_reply("ECONOMY");
        let gw = gateway(provider.clone(), 3);

        assert_eq!(gw.complete("plan").await.unwrap(), "ECONOMY");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_complete_gives_up_after_max_retries() {
        let provider = Arc::new(ScriptedProvider::default());
        let gw = gateway(provider.clone(), 3);
        assert!(matches!(
            gw.complete("plan").await,
            Err(BismarckError::Provider(_))
        ));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_try_choose_retries_unparseable_reply() {
        let provider = Arc::new(ScriptedProvider::new(["hmm, not sure", "Action: 2"]));
        let gw = gateway(provider.clone(), 3);
        assert_eq!(gw.try_choose_number("pick", Choices::Range(5)).await, Some(2));
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_try_choose_rejects_invalid_ids() {
        let provider = Arc::new(ScriptedProvider::new(["9", "9", "9"]));
        let gw = gateway(provider.clone(), 3);
        assert_eq!(gw.try_choose_number("pick", Choices::Ids(&[0, 1, 2])).await, None);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_choose_number_defaults_within_range() {
        let provider = Arc::new(ScriptedProvider::default());
        let mut gw = gateway(provider, 2);
        let n = gw.choose_number("pick", Choices::Range(4)).await;
        assert!(n < 4);
    }

    #[tokio::test]
    async fn test_choose_number_defaults_to_zero_without_range() {
        let provider = Arc::new(ScriptedProvider::default());
        let mut gw = gateway(provider, 1);
        assert_eq!(gw.choose_number("pick", Choices::Any).await, 0);
    }

    #[tokio::test]
    async fn test_request_carries_system_instruction() {
        let provider = Arc::new(ScriptedProvider::new(["1"]));
        let gw = gateway(provider.clone(), 1);
        gw.complete("state").await.unwrap();
        assert_eq!(provider.prompts(), vec!["state".to_string()]);
    }

    #[test]
    fn test_choices_accepts() {
        assert!(Choices::Any.accepts(1000));
        assert!(Choices::Range(3).accepts(2));
        assert!(!Choices::Range(3).accepts(3));
        assert!(Choices::Ids(&[4, 7]).accepts(7));
        assert!(!Choices::Ids(&[4, 7]).accepts(5));
    }
}
