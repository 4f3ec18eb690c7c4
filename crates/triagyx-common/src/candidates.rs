//! Result value objects shared by the tabular and imaging pipelines.
//!
//! Serde field names match the external interface exactly, so these types
//! serialize straight into the documented JSON payloads.

use serde::{Deserialize, Serialize};

/// One ranked diagnostic candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionCandidate {
    pub disease: String,
    pub confidence: f64,
    /// Ordinal severity level, 1..=5.
    pub severity: u8,
}

/// Blended ensemble output: the top candidates (descending confidence, ties
/// broken by canonical disease order) plus a free-text explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub predictions: Vec<PredictionCandidate>,
    pub explanation: String,
}

/// Bounding box over an image region flagged as diagnostically relevant.
/// Coordinates are pixel indices in the activation-map space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoiRegion {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
    pub confidence: f32,
}

/// Outcome of an imaging analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagingFinding {
    pub abnormality_detected: bool,
    pub confidence: f64,
    pub regions_of_interest: Vec<RoiRegion>,
    /// Four-level imaging severity label.
    pub severity: String,
}

/// Per-feature contribution explanation for a tabular prediction.
///
/// `features` and `values` are parallel, at most 10 entries, ordered by
/// descending absolute contribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub features: Vec<String>,
    pub values: Vec<f64>,
    pub base_value: f64,
    pub prediction_value: f64,
}

/// Spatial importance heatmap over the backbone's last convolutional stage.
/// Row-major, values in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaliencyMap {
    pub values: Vec<Vec<f32>>,
}

impl SaliencyMap {
    pub fn height(&self) -> usize {
        self.values.len()
    }

    pub fn width(&self) -> usize {
        self.values.first().map_or(0, |row| row.len())
    }

    /// Largest value in the map; 0.0 for an empty map.
    pub fn max_value(&self) -> f32 {
        self.values
            .iter()
            .flatten()
            .copied()
            .fold(0.0f32, f32::max)
    }
}
