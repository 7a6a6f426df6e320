//! Error types for the language-model client.

use thiserror::Error;

/// Errors that can occur when calling the chat API.
#[derive(Debug, Error)]
pub enum PromptError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned an error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Rate limited by the API.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Client could not be built from configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Error body returned by the chat API.
#[derive(Debug, serde::Deserialize)]
pub struct ApiErrorResponse {
    pub message: String,
}
