//! Error types for the tabular prediction pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TabularError>;

#[derive(Error, Debug)]
pub enum TabularError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No trained model available; call train() or load() first")]
    NotTrained,

    #[error("Model artifact error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
