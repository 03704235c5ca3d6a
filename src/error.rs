use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rankfuse
#[derive(Error, Debug)]
pub enum FuseError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// Unknown normalization mode name
    #[error("Invalid normalization mode '{mode}' (expected one of: reciprocal_rank, relative_score, distribution_based)")]
    InvalidNormalizationMode { mode: String },

    /// Requested result count must be positive
    #[error("Invalid top_k: must be greater than 0")]
    InvalidTopK,

    /// Retriever weights must be positive and finite
    #[error("Invalid weight for retriever '{retriever}': {weight}")]
    InvalidWeight { retriever: String, weight: f64 },

    /// Malformed query input
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Index construction errors
    #[error("Index error: {0}")]
    Index(String),
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for rankfuse operations
pub type Result<T> = std::result::Result<T, FuseError>;
