//! Dense embeddings for scan-to-scan comparison.

use std::sync::Arc;

use candle_core::Tensor;

use crate::backbone::{ImageBackbone, CONV_STAGES};
use crate::error::Result;

/// Extracts a global-average-pooled embedding from the last conv stage.
pub struct FeatureExtractor {
    backbone: Arc<ImageBackbone>,
}

impl FeatureExtractor {
    pub fn new(backbone: Arc<ImageBackbone>) -> Self {
        Self { backbone }
    }

    /// Embedding dimensionality (last stage's channel count).
    pub fn dimension(&self) -> usize {
        self.backbone.config().channels[3]
    }

    pub fn embed(&self, input: &Tensor) -> Result<Vec<f32>> {
        self.backbone.validate_input(input)?;
        let features = self.backbone.forward_until(input, CONV_STAGES.len() - 1)?;
        let pooled = features.flatten_from(2)?.mean(2)?.squeeze(0)?;
        Ok(pooled.to_vec1()?)
    }
}
