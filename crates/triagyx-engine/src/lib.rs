//! triagyx-engine — Unified diagnostic engine.
//!
//! One facade over the tabular symptom ensemble and the imaging pipeline:
//! ranked disease prediction, feature attribution, scan abnormality analysis
//! with regions of interest, class activation saliency and scan embeddings.

pub mod config;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use engine::TriageEngine;
pub use error::{EngineError, Result};
