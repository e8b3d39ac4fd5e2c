use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Invalid status transition for unit {unit_id}: {from} -> {to}")]
    InvalidTransition {
        unit_id: i64,
        from: String,
        to: String,
    },

    #[error("Media unit {0} not found")]
    UnitNotFound(i64),

    #[error("{0}")]
    Other(String),
}
