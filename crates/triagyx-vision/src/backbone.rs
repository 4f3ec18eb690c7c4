//! Frozen convolutional backbone for scan analysis.
//!
//! Four named conv stages followed by a global-average-pool + two-layer
//! head. The forward pass is split on purpose: `forward_until` returns the
//! activation at a named stage as a plain value, `forward_from` re-enters
//! the network after that stage. The saliency explainer uses the split to
//! differentiate the class logit against a captured activation without any
//! callback state hanging off the model.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{conv2d, linear, Conv2d, Conv2dConfig, Linear, Module, VarBuilder, VarMap};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, VisionError};

/// Stage names accepted by the saliency explainer.
pub const CONV_STAGES: [&str; 4] = ["layer1", "layer2", "layer3", "layer4"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackboneConfig {
    /// Square input resolution.
    pub input_size: usize,
    pub num_classes: usize,
    /// Output channels per conv stage.
    pub channels: [usize; 4],
    pub head_hidden: usize,
}

impl Default for BackboneConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            num_classes: 2,
            channels: [16, 32, 64, 128],
            head_hidden: 64,
        }
    }
}

/// One conv stage: 3×3 conv (padding 1) → ReLU → 2×2 max pool.
struct ConvStage {
    conv: Conv2d,
}

impl ConvStage {
    fn forward(&self, x: &Tensor) -> candle_core::Result<Tensor> {
        self.conv.forward(x)?.relu()?.max_pool2d(2)
    }
}

pub struct ImageBackbone {
    stages: Vec<ConvStage>,
    fc1: Linear,
    fc2: Linear,
    config: BackboneConfig,
}

impl ImageBackbone {
    pub fn new(config: BackboneConfig, vb: VarBuilder) -> Result<Self> {
        let conv_cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        let mut stages = Vec::with_capacity(CONV_STAGES.len());
        let mut in_channels = 3;
        for (name, &out_channels) in CONV_STAGES.iter().zip(config.channels.iter()) {
            let conv = conv2d(in_channels, out_channels, 3, conv_cfg, vb.pp(name))?;
            stages.push(ConvStage { conv });
            in_channels = out_channels;
        }
        let fc1 = linear(config.channels[3], config.head_hidden, vb.pp("head.fc1"))?;
        let fc2 = linear(config.head_hidden, config.num_classes, vb.pp("head.fc2"))?;
        Ok(Self {
            stages,
            fc1,
            fc2,
            config,
        })
    }

    /// Fresh backbone with randomly initialized weights.
    pub fn random(config: BackboneConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        Self::new(config, vb)
    }

    /// Backbone with weights loaded from a safetensors artifact.
    pub fn load(config: BackboneConfig, weights: &Path, device: &Device) -> Result<Self> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let backbone = Self::new(config, vb)?;
        varmap.load(weights).map_err(|e| {
            VisionError::Persistence(format!(
                "cannot load backbone weights from {}: {}",
                weights.display(),
                e
            ))
        })?;
        info!(path = %weights.display(), "backbone weights loaded");
        Ok(backbone)
    }

    pub fn config(&self) -> &BackboneConfig {
        &self.config
    }

    /// Index of a named conv stage, or `LayerNotFound`.
    pub fn stage_index(&self, layer: &str) -> Result<usize> {
        CONV_STAGES
            .iter()
            .position(|&name| name == layer)
            .ok_or_else(|| VisionError::LayerNotFound(layer.to_string()))
    }

    /// Reject tensors that do not match the expected (1, 3, S, S) input.
    pub fn validate_input(&self, x: &Tensor) -> Result<()> {
        let (batch, channels, height, width) = x.dims4().map_err(|_| {
            VisionError::Validation(format!(
                "expected 4-dimensional image tensor, got shape {:?}",
                x.dims()
            ))
        })?;
        let size = self.config.input_size;
        if batch != 1 || channels != 3 || height != size || width != size {
            return Err(VisionError::Validation(format!(
                "expected image tensor of shape (1, 3, {size}, {size}), got {:?}",
                x.dims()
            )));
        }
        Ok(())
    }

    /// Run conv stages up to and including `stage`.
    pub fn forward_until(&self, x: &Tensor, stage: usize) -> Result<Tensor> {
        let mut out = x.clone();
        for s in &self.stages[..=stage] {
            out = s.forward(&out)?;
        }
        Ok(out)
    }

    /// Resume after `stage`: remaining conv stages, then the head.
    pub fn forward_from(&self, activations: &Tensor, stage: usize) -> Result<Tensor> {
        let mut out = activations.clone();
        for s in &self.stages[stage + 1..] {
            out = s.forward(&out)?;
        }
        self.head(&out)
    }

    /// Global average pool + fully-connected head.
    fn head(&self, features: &Tensor) -> Result<Tensor> {
        let pooled = features.flatten_from(2)?.mean(2)?; // (batch, channels)
        let hidden = self.fc1.forward(&pooled)?.relu()?;
        Ok(self.fc2.forward(&hidden)?)
    }

    /// Full forward pass returning logits and the last conv activation map
    /// as plain values.
    pub fn forward_features(&self, x: &Tensor) -> Result<(Tensor, Tensor)> {
        self.validate_input(x)?;
        let features = self.forward_until(x, CONV_STAGES.len() - 1)?;
        let logits = self.head(&features)?;
        Ok((logits, features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> BackboneConfig {
        BackboneConfig {
            input_size: 32,
            num_classes: 2,
            channels: [4, 8, 16, 32],
            head_hidden: 16,
        }
    }

    fn input(size: usize) -> Tensor {
        let data: Vec<f32> = (0..3 * size * size)
            .map(|i| (i % 17) as f32 / 17.0)
            .collect();
        Tensor::from_vec(data, (1, 3, size, size), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_forward_shapes() {
        let backbone = ImageBackbone::random(small_config(), &Device::Cpu).unwrap();
        let (logits, features) = backbone.forward_features(&input(32)).unwrap();
        assert_eq!(logits.dims(), &[1, 2]);
        // Four 2× pools: 32 → 2 spatial, last stage has 32 channels.
        assert_eq!(features.dims(), &[1, 32, 2, 2]);
    }

    #[test]
    fn test_split_forward_matches_full_forward() {
        let backbone = ImageBackbone::random(small_config(), &Device::Cpu).unwrap();
        let x = input(32);
        let (logits, _) = backbone.forward_features(&x).unwrap();

        let acts = backbone.forward_until(&x, 1).unwrap();
        let resumed = backbone.forward_from(&acts, 1).unwrap();

        let a: Vec<f32> = logits.flatten_all().unwrap().to_vec1().unwrap();
        let b: Vec<f32> = resumed.flatten_all().unwrap().to_vec1().unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_unknown_layer_is_layer_not_found() {
        let backbone = ImageBackbone::random(small_config(), &Device::Cpu).unwrap();
        let err = backbone.stage_index("layer9").unwrap_err();
        assert!(matches!(err, VisionError::LayerNotFound(_)));
        assert_eq!(backbone.stage_index("layer4").unwrap(), 3);
    }

    #[test]
    fn test_wrong_input_shape_rejected() {
        let backbone = ImageBackbone::random(small_config(), &Device::Cpu).unwrap();
        let err = backbone.forward_features(&input(16)).unwrap_err();
        assert!(matches!(err, VisionError::Validation(_)));
    }

    #[test]
    fn test_missing_weights_artifact_is_persistence_error() {
        let result = ImageBackbone::load(
            small_config(),
            Path::new("/nonexistent/weights.safetensors"),
            &Device::Cpu,
        );
        assert!(matches!(result, Err(VisionError::Persistence(_))));
    }
}
