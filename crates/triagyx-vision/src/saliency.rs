//! Gradient-weighted class activation mapping.
//!
//! The explainer runs the backbone in two phases. Phase one evaluates up to
//! the requested conv stage and rebinds that activation as a trainable
//! variable; phase two resumes from the variable through the head. Backward
//! on the class logit then leaves the activation gradient on the variable,
//! which is exactly the quantity the channel weights are averaged from.

use std::sync::Arc;

use candle_core::{IndexOp, Tensor, Var};
use tracing::debug;

use triagyx_common::SaliencyMap;

use crate::backbone::ImageBackbone;
use crate::error::{Result, VisionError};

/// Keeps the heatmap normalization finite when every activation is zero.
const NORM_EPS: f32 = 1e-10;

pub struct SaliencyExplainer {
    backbone: Arc<ImageBackbone>,
}

impl SaliencyExplainer {
    pub fn new(backbone: Arc<ImageBackbone>) -> Self {
        Self { backbone }
    }

    /// Compute a class activation map for `input` at the named conv stage.
    ///
    /// With `target_class == None` the predicted class is explained. The map
    /// has the stage's spatial resolution and is rescaled to [0, 1].
    pub fn explain(
        &self,
        input: &Tensor,
        layer: &str,
        target_class: Option<usize>,
    ) -> Result<SaliencyMap> {
        self.backbone.validate_input(input)?;
        let stage = self.backbone.stage_index(layer)?;

        let activations = self.backbone.forward_until(input, stage)?;
        let acts_var = Var::from_tensor(&activations.detach())?;
        let logits = self.backbone.forward_from(acts_var.as_tensor(), stage)?;

        let scores: Vec<f32> = logits.flatten_all()?.to_vec1()?;
        let class = match target_class {
            Some(c) if c >= scores.len() => {
                return Err(VisionError::Validation(format!(
                    "target class {c} out of range for {} classes",
                    scores.len()
                )));
            }
            Some(c) => c,
            None => scores
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap_or(0),
        };
        debug!(layer, class, "computing class activation map");

        let score = logits.i((0, class))?;
        let grads = score.backward()?;
        let grad = grads
            .get(acts_var.as_tensor())
            .ok_or_else(|| VisionError::Tensor("no gradient for captured activation".into()))?;

        // Channel weights: spatial mean of the gradient, (1, C).
        let (_, channels, _, _) = grad.dims4()?;
        let weights = grad.flatten_from(2)?.mean(2)?;

        // Weighted channel sum of the activation, (H, W).
        let weighted = acts_var
            .as_tensor()
            .broadcast_mul(&weights.reshape((1, channels, 1, 1))?)?;
        let cam: Vec<Vec<f32>> = weighted.sum(1)?.squeeze(0)?.to_vec2()?;

        Ok(SaliencyMap {
            values: rescale(cam),
        })
    }
}

/// ReLU then divide by the maximum. An all-nonpositive map stays all-zero.
fn rescale(mut cam: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
    let mut max = 0f32;
    for row in &mut cam {
        for v in row.iter_mut() {
            *v = v.max(0.0);
            max = max.max(*v);
        }
    }
    let denom = max + NORM_EPS;
    for row in &mut cam {
        for v in row.iter_mut() {
            *v /= denom;
        }
    }
    cam
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backbone::BackboneConfig;
    use candle_core::Device;

    fn setup() -> (SaliencyExplainer, Tensor) {
        let config = BackboneConfig {
            input_size: 32,
            num_classes: 2,
            channels: [4, 8, 16, 32],
            head_hidden: 16,
        };
        let backbone = Arc::new(ImageBackbone::random(config, &Device::Cpu).unwrap());
        let data: Vec<f32> = (0..3 * 32 * 32).map(|i| (i % 13) as f32 / 13.0).collect();
        let input = Tensor::from_vec(data, (1, 3, 32, 32), &Device::Cpu).unwrap();
        (SaliencyExplainer::new(backbone), input)
    }

    #[test]
    fn test_map_matches_stage_resolution() {
        let (explainer, input) = setup();
        // layer4 after four 2× pools: 32 → 2.
        let map = explainer.explain(&input, "layer4", None).unwrap();
        assert_eq!((map.height(), map.width()), (2, 2));
        // layer2 after two pools: 32 → 8.
        let map = explainer.explain(&input, "layer2", None).unwrap();
        assert_eq!((map.height(), map.width()), (8, 8));
    }

    #[test]
    fn test_values_are_normalized() {
        let (explainer, input) = setup();
        let map = explainer.explain(&input, "layer3", Some(0)).unwrap();
        for row in &map.values {
            for &v in row {
                assert!((0.0..=1.0).contains(&v));
            }
        }
        // Either a genuine peak at 1.0 or an all-zero map.
        let max = map.max_value();
        assert!(max == 0.0 || (max - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_default_class_is_argmax() {
        let (explainer, input) = setup();
        let default_map = explainer.explain(&input, "layer4", None).unwrap();
        let map0 = explainer.explain(&input, "layer4", Some(0)).unwrap();
        let map1 = explainer.explain(&input, "layer4", Some(1)).unwrap();

        let eq = |a: &SaliencyMap, b: &SaliencyMap| {
            a.values
                .iter()
                .flatten()
                .zip(b.values.iter().flatten())
                .all(|(x, y)| (x - y).abs() < 1e-6)
        };
        assert!(eq(&default_map, &map0) || eq(&default_map, &map1));
    }

    #[test]
    fn test_unknown_layer_rejected() {
        let (explainer, input) = setup();
        let err = explainer.explain(&input, "layer7", None).unwrap_err();
        assert!(matches!(err, VisionError::LayerNotFound(_)));
    }

    #[test]
    fn test_out_of_range_class_rejected() {
        let (explainer, input) = setup();
        let err = explainer.explain(&input, "layer4", Some(9)).unwrap_err();
        assert!(matches!(err, VisionError::Validation(_)));
    }

    #[test]
    fn test_all_zero_map_stays_zero() {
        let cam = vec![vec![-1.0f32, -0.5], vec![0.0, -2.0]];
        let rescaled = rescale(cam);
        assert!(rescaled.iter().flatten().all(|&v| v == 0.0));
    }
}
