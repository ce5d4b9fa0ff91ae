use thiserror::Error;

use crate::literal::LiteralError;

#[derive(Error, Debug)]
pub enum EventPlanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not recover structured data from model output: {0}")]
    Recovery(String),

    #[error("Invalid literal: {0}")]
    Literal(#[from] LiteralError),

    #[error("Budget allocation does not balance: food ({food}) + entertainment ({entertainment}) + decorations ({decorations}) != total ({total})")]
    AllocationMismatch {
        food: i64,
        entertainment: i64,
        decorations: i64,
        total: i64,
    },

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Product search failed: {0}")]
    ProductSearch(String),

    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EventPlanError>;
