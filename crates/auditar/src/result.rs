//! Result and error types for Auditar.

use thiserror::Error;

/// Result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors that can occur while driving an audit run
#[derive(Debug, Error)]
pub enum AuditError {
    /// Browser process failed to start (fatal to the whole run)
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page-level CDP failure
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation failed
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Expected element or condition never appeared within budget
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Element lookup came back empty
    #[error("Element not found: {what}")]
    ElementNotFound {
        /// Locator description
        what: String,
    },

    /// No persisted session exists; callers fall back to interactive login
    #[error("No saved session found")]
    SessionNotFound,

    /// Screenshot capture failed
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Configuration is missing or malformed
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuditError {
    /// True for failures that abort the whole run rather than one driver.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::BrowserLaunch { .. } | Self::Config { .. })
    }
}
