//! Abnormality detection with region-of-interest extraction.
//!
//! The detector classifies a preprocessed scan tensor and localizes the
//! finding from the backbone's last activation map: the channel-mean heatmap
//! is thresholded at its 75th percentile and the surviving cells are boxed.

use std::sync::Arc;

use candle_core::Tensor;
use candle_nn::ops::softmax;
use tracing::{debug, info};

use triagyx_common::{imaging_severity_label, ImagingFinding, RoiRegion};

use crate::backbone::ImageBackbone;
use crate::error::{Result, VisionError};

/// Heatmap cells above this percentile form the region of interest.
const ROI_PERCENTILE: f64 = 75.0;

pub struct AbnormalityDetector {
    backbone: Arc<ImageBackbone>,
}

impl AbnormalityDetector {
    pub fn new(backbone: Arc<ImageBackbone>) -> Self {
        Self { backbone }
    }

    /// Classify a preprocessed (1, 3, S, S) tensor and extract regions of
    /// interest from the last activation map.
    pub fn analyze(&self, input: &Tensor) -> Result<ImagingFinding> {
        let (logits, features) = self.backbone.forward_features(input)?;
        let probs: Vec<f32> = softmax(&logits, 1)?.flatten_all()?.to_vec1()?;
        if probs.len() < 2 {
            return Err(VisionError::Tensor(format!(
                "expected at least 2 class probabilities, got {}",
                probs.len()
            )));
        }
        let abnormal_prob = probs[1] as f64;
        let abnormality_detected = abnormal_prob > 0.5;

        // Channel-mean activation heatmap, (H, W).
        let heatmap: Vec<Vec<f32>> = features.mean(1)?.squeeze(0)?.to_vec2()?;
        let regions = extract_regions(&heatmap, self.backbone.config().input_size);
        debug!(
            abnormal_prob,
            regions = regions.len(),
            "scan analyzed"
        );

        let severity = imaging_severity_label(abnormal_prob).to_string();
        info!(abnormality_detected, severity = %severity, "imaging finding ready");
        Ok(ImagingFinding {
            abnormality_detected,
            confidence: abnormal_prob,
            regions_of_interest: regions,
            severity,
        })
    }
}

/// Bounding box around heatmap cells strictly above the 75th percentile,
/// scaled to image coordinates. A flat heatmap produces no regions.
pub(crate) fn extract_regions(heatmap: &[Vec<f32>], image_size: usize) -> Vec<RoiRegion> {
    let rows = heatmap.len();
    let cols = heatmap.first().map_or(0, |r| r.len());
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    let flat: Vec<f32> = heatmap.iter().flatten().copied().collect();
    let threshold = percentile(&flat, ROI_PERCENTILE);

    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    for (y, row) in heatmap.iter().enumerate() {
        for (x, &v) in row.iter().enumerate() {
            if v > threshold {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
    }

    let Some((x0, y0, x1, y1)) = bounds else {
        return Vec::new();
    };

    // Mean activation inside the box, not just above-threshold cells.
    let mut sum = 0f32;
    let mut count = 0usize;
    for row in heatmap.iter().take(y1 + 1).skip(y0) {
        for &v in row.iter().take(x1 + 1).skip(x0) {
            sum += v;
            count += 1;
        }
    }
    let confidence = sum / count as f32;

    let sx = image_size as f32 / cols as f32;
    let sy = image_size as f32 / rows as f32;
    vec![RoiRegion {
        x_min: (x0 as f32 * sx) as u32,
        y_min: (y0 as f32 * sy) as u32,
        x_max: (((x1 + 1) as f32 * sx) as u32).saturating_sub(1),
        y_max: (((y1 + 1) as f32 * sy) as u32).saturating_sub(1),
        confidence,
    }]
}

/// Percentile with linear interpolation between closest ranks.
pub(crate) fn percentile(values: &[f32], q: f64) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backbone::BackboneConfig;
    use candle_core::Device;

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 75.0) - 3.25).abs() < 1e-6);
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-6);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_flat_heatmap_has_no_regions() {
        let heatmap = vec![vec![0.5f32; 8]; 8];
        assert!(extract_regions(&heatmap, 64).is_empty());
    }

    #[test]
    fn test_hot_corner_is_boxed() {
        let mut heatmap = vec![vec![0.0f32; 8]; 8];
        heatmap[1][2] = 5.0;
        heatmap[2][3] = 4.0;
        let regions = extract_regions(&heatmap, 64);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        // Cells (2,1)..(3,2) in an 8-wide grid scale by 8 to image space.
        assert_eq!((r.x_min, r.y_min), (16, 8));
        assert_eq!((r.x_max, r.y_max), (31, 23));
        // Box mean over 4 cells: (5 + 4 + 0 + 0) / 4.
        assert!((r.confidence - 2.25).abs() < 1e-6);
    }

    #[test]
    fn test_analyze_produces_consistent_finding() {
        let config = BackboneConfig {
            input_size: 32,
            num_classes: 2,
            channels: [4, 8, 16, 32],
            head_hidden: 16,
        };
        let backbone = Arc::new(ImageBackbone::random(config, &Device::Cpu).unwrap());
        let detector = AbnormalityDetector::new(backbone);

        let data: Vec<f32> = (0..3 * 32 * 32).map(|i| (i % 11) as f32 / 11.0).collect();
        let input = Tensor::from_vec(data, (1, 3, 32, 32), &Device::Cpu).unwrap();

        let finding = detector.analyze(&input).unwrap();
        assert!(finding.confidence >= 0.0 && finding.confidence <= 1.0);
        assert!(["Low", "Moderate", "High", "Critical"]
            .contains(&finding.severity.as_str()));
        assert_eq!(finding.abnormality_detected, finding.confidence > 0.5);
    }
}
