//! triagyx-common — Shared value types used across all Triagyx crates.
//!
//! Everything here is a plain value object: created per request, never
//! mutated after construction, serializable with the exact field names the
//! external interface promises.

pub mod candidates;
pub mod severity;
pub mod similarity;

pub use candidates::{
    EnsembleResult, FeatureAttribution, ImagingFinding, PredictionCandidate, RoiRegion,
    SaliencyMap,
};
pub use severity::{imaging_severity_label, Severity};
pub use similarity::{compute_similarity, similarity_matrix};
