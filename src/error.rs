// src/error.rs
use crate::types::ClientState;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum PortfolioError {
    /// Missing or malformed credentials / settings. Nothing is streamed.
    #[error("config error: {0}")]
    Config(String),

    /// The exchange rejected a private request; messages are kept verbatim.
    #[error("API error: {}", .0.join(", "))]
    Auth(Vec<String>),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),

    /// Read failure after streaming has begun.
    #[error("stream error: {0}")]
    Stream(String),

    #[error("client is {actual:?}, expected {expected:?}")]
    State {
        expected: ClientState,
        actual: ClientState,
    },
}

pub type Result<T> = std::result::Result<T, PortfolioError>;

impl From<reqwest::Error> for PortfolioError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<tungstenite::Error> for PortfolioError {
    fn from(e: tungstenite::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for PortfolioError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for PortfolioError {
    fn from(e: serde_urlencoded::ser::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<config::ConfigError> for PortfolioError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<url::ParseError> for PortfolioError {
    fn from(e: url::ParseError) -> Self {
        Self::Config(format!("invalid endpoint url: {}", e))
    }
}

impl From<base64::DecodeError> for PortfolioError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Config(format!("API secret is not valid base64: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_lists_every_message() {
        let err = PortfolioError::Auth(vec![
            "EAPI:Invalid key".to_string(),
            "EGeneral:Permission denied".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "API error: EAPI:Invalid key, EGeneral:Permission denied"
        );
    }

    #[test]
    fn base64_failures_are_config_errors() {
        use base64::Engine;
        let err: PortfolioError = base64::engine::general_purpose::STANDARD
            .decode("%%%")
            .unwrap_err()
            .into();
        assert!(matches!(err, PortfolioError::Config(_)));
    }
}
