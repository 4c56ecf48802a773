/*!
 * Error types for the wikigloss application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching a template or module body.
///
/// Every variant is retryable. A page that does not exist is not an error,
/// it is reported as `FetchOutcome::NotFound`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The HTTP request could not be sent or the connection dropped
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The fetch did not complete in time
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The API answered with a non-success status
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The API payload could not be understood
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The API asked us to slow down
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
}

impl FetchError {
    /// Whether the transport layer should try the same request again
    pub fn should_retry(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::Timeout(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::ParseError(_) => false,
        }
    }
}

/// Errors raised by the markup scanner on pathological input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// Invocations are nested deeper than the scanner allows
    #[error("Construct nesting exceeds {limit} levels")]
    NestingTooDeep {
        /// The configured depth bound
        limit: usize,
    },
}

/// Errors raised by a single rewrite rule.
///
/// The pipeline never propagates these; the failing rule is skipped for the
/// current iteration and its input passes through unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// The scanner refused the input
    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),

    /// The rule matched a construct it cannot render
    #[error("Rule '{rule}' cannot render '{construct}'")]
    Unsupported {
        /// Rule name
        rule: &'static str,
        /// Offending construct name
        construct: String,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the persistence layer
    #[error("Database error: {0}")]
    Database(String),

    /// Error from a fetcher
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}
