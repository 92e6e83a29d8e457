//! Error types for E2E testing

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Bridge protocol error: {0}")]
    Bridge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{name} is unreachable after {attempts} attempts: {url}")]
    Unreachable {
        name: String,
        url: String,
        attempts: usize,
    },

    #[error("Session expired: redirected to {url}")]
    SessionExpired { url: String },

    #[error("Seller '{label}' not found in {}", path.display())]
    SellerNotFound { label: String, path: PathBuf },

    #[error("Unknown step. URL={url}")]
    UnknownStep { url: String },

    #[error("Could not advance to {expected} after {attempts} attempt(s), last detected: {observed}")]
    AdvanceFailed {
        expected: String,
        observed: String,
        attempts: usize,
    },

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl E2eError {
    /// Whether the error means the persisted session stopped being valid
    pub fn is_session_expired(&self) -> bool {
        matches!(self, E2eError::SessionExpired { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
