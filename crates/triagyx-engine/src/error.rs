//! Engine-level error type wrapping both pipelines.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Tabular(#[from] triagyx_tabular::TabularError),

    #[error(transparent)]
    Vision(#[from] triagyx_vision::VisionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No trained diagnostic model available")]
    NotTrained,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
