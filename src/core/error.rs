use thiserror::Error;

#[derive(Error, Debug)]
pub enum BismarckError {
    /// Connection or HTTP failure talking to the game. Ends the game loop.
    #[error("Transport error: {0}")]
    Transport(String),

    /// LLM call failure. Recovered by the gateway's retry policy.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Unusable LLM response. Handled exactly like a provider error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing credential or invalid setting. Fatal at startup only.
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BismarckError {
    /// Errors the gateway retries instead of surfacing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BismarckError::Provider(_) | BismarckError::Parse(_))
    }
}

pub type Result<T> = std::result::Result<T, BismarckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(BismarckError::Provider("timeout".into()).is_recoverable());
        assert!(BismarckError::Parse("no digits".into()).is_recoverable());
        assert!(!BismarckError::Transport("refused".into()).is_recoverable());
        assert!(!BismarckError::Config("no key".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = BismarckError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }
}
