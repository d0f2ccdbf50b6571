//! Error handling for crumb

use thiserror::Error;

/// Main error type for crumb operations
#[derive(Error, Debug)]
pub enum CrumbError {
    #[error("Cookie extraction error: {0}")]
    CookieExtraction(String),

    #[error("Cookie store locked by a running browser: {0}")]
    StoreLocked(String),

    #[error("Failed to decrypt cookie value: {0}")]
    DecryptionFailed(String),

    #[error("Ciphertext length {0} is not a positive multiple of 16")]
    BadLength(usize),

    #[error("Expiry timestamp outside the representable range: {0}")]
    InvalidTimestamp(String),

    #[error("Binary cookie store parse error at offset {offset}: {reason}")]
    BinaryParsing { offset: usize, reason: String },

    #[error("Unsupported platform: {0}")]
    Unsupported(String),

    #[error("Master secret unavailable: {0}")]
    SecretUnavailable(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl CrumbError {
    /// Whether retrying after closing the owning browser could succeed.
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, CrumbError::StoreLocked(_))
    }
}

/// Result type alias for crumb operations
pub type Result<T> = std::result::Result<T, CrumbError>;
