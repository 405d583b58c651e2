//! Error types for the Elicit clarification bridge
//!
//! Structured error definitions use thiserror; anyhow errors coming from
//! the edges are folded into [`ElicitError::Other`].

use std::time::Duration;
use thiserror::Error;

/// Main error type for Elicit operations
#[derive(Error, Debug)]
pub enum ElicitError {
    /// A party broke the request/reply alternation
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A bounded wait expired before the counterpart answered
    #[error("No response: timed out after {waited:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: String,
        waited: Duration,
    },

    /// The channel was shut down while waiting
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Every sender of a channel direction is gone
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// The reasoning engine reported an internal failure
    #[error("Reasoning engine failed: {0}")]
    EngineFailed(String),

    /// Operation not allowed in the current session state
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// The session already delivered its final result
    #[error("Session has already produced its final result")]
    SessionTerminated,

    /// The session was marked failed by an earlier error
    #[error("Session failed: {0}")]
    SessionFailed(String),

    /// LLM API request failed
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl ElicitError {
    /// True for failures caused by a counterpart that never answered
    pub fn is_liveness(&self) -> bool {
        matches!(self, ElicitError::Timeout { .. })
    }

    pub(crate) fn timeout(waiting_for: impl Into<String>, waited: Duration) -> Self {
        ElicitError::Timeout {
            waiting_for: waiting_for.into(),
            waited,
        }
    }
}

/// Result type alias for Elicit operations
pub type Result<T> = std::result::Result<T, ElicitError>;

/// Convert anyhow::Error to ElicitError
impl From<anyhow::Error> for ElicitError {
    fn from(err: anyhow::Error) -> Self {
        ElicitError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ElicitError::ProtocolViolation("second request posted".to_string());
        assert_eq!(err.to_string(), "Protocol violation: second request posted");

        let err = ElicitError::timeout("first question", Duration::from_secs(2));
        assert_eq!(
            err.to_string(),
            "No response: timed out after 2s waiting for first question"
        );
    }

    #[test]
    fn test_liveness_classification() {
        assert!(ElicitError::timeout("reply", Duration::from_millis(10)).is_liveness());
        assert!(!ElicitError::SessionTerminated.is_liveness());
        assert!(!ElicitError::EngineFailed("boom".to_string()).is_liveness());
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        assert!(json_err.is_err());

        let err: ElicitError = json_err.unwrap_err().into();
        assert!(matches!(err, ElicitError::Serialization(_)));

        let err: ElicitError = anyhow::anyhow!("edge failure").into();
        assert!(matches!(err, ElicitError::Other(ref msg) if msg == "edge failure"));
    }
}
