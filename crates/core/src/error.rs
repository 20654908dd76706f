use thiserror::Error;

pub type VoyageResult<T> = Result<T, VoyageError>;

#[derive(Error, Debug)]
pub enum VoyageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("Invalid point amount: {0}")]
    InvalidAmount(i64),

    #[error("Recommendation not found: {0}")]
    RecommendationNotFound(uuid::Uuid),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
