//! Error types for the schema compilation engine

use thiserror::Error;

use crate::violation::Violations;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema engine errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Enum {name} must declare at least one value")]
    EmptyEnum { name: String },

    #[error("Enum {name} declares value '{value}' more than once")]
    DuplicateEnumValue { name: String, value: String },

    #[error("Model reference not found: {0}")]
    UnresolvedModel(String),

    #[error("Type conflict for {name}: {reason}")]
    TypeConflict { name: String, reason: String },

    #[error("Validation failed:\n{0}")]
    Validation(Violations),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl From<Violations> for SchemaError {
    fn from(violations: Violations) -> Self {
        SchemaError::Validation(violations)
    }
}
