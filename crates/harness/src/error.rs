//! Error types for the search harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Token provider failed: {0}")]
    Token(String),

    #[error("Fixture setup failed: {kind} returned status {status}: {body}")]
    Setup {
        kind: String,
        status: i32,
        body: String,
    },

    #[error("Link resolution failed for '{url}': {reason}")]
    LinkResolution { url: String, reason: String },

    #[error("Pagination stopped after {0} pages without reaching the last page")]
    PageLimit(usize),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl HarnessError {
    /// Whether this error came from a failed expectation rather than from the
    /// harness itself.
    pub fn is_assertion(&self) -> bool {
        matches!(self, HarnessError::AssertionFailed(_))
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
