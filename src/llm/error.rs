//! Error types for the decision layer client.

use thiserror::Error;

/// Errors produced while asking the decision layer for a routing decision.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// The endpoint answered with a non-success status.
    #[error("decision layer returned status {status}: {body}")]
    HttpStatusNotOk {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The response carried no choices.
    #[error("decision layer response had no choices")]
    EmptyChoices,

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Convenience result alias for decision layer calls.
pub type LlmResult<T> = Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_includes_body() {
        let err = LlmError::HttpStatusNotOk {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "decision layer returned status 503: overloaded"
        );
    }
}
