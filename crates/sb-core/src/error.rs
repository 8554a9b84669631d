//! Error types for sb-core

use thiserror::Error;

/// Main error type for sb-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LLM API error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Knowledge catalog error: {0}")]
    Catalog(String),

    /// A stored row could not be converted into a typed record
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("User not found: {0}")]
    UserNotFound(String),
}

/// Result type alias for sb-core
pub type Result<T> = std::result::Result<T, Error>;
