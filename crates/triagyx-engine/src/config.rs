//! Configuration loading for the diagnostic engine.
//! Reads triagyx.toml from the current directory or path in TRIAGYX_CONFIG
//! env var; a missing file falls back to defaults so the engine starts in
//! the untrained state out of the box.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the tabular model bundle.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    /// Optional safetensors weights for the vision backbone; absent means a
    /// randomly initialized backbone.
    #[serde(default)]
    pub backbone_weights: Option<PathBuf>,
    #[serde(default)]
    pub use_gpu: bool,
    /// Square input resolution for scan preprocessing.
    #[serde(default = "default_image_size")]
    pub image_size: usize,
    /// Conv stage the saliency explainer differentiates against.
    #[serde(default = "default_saliency_layer")]
    pub saliency_layer: String,
    /// Seed for training and the attribution estimator.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_model_dir() -> PathBuf { PathBuf::from("models") }
fn default_image_size() -> usize { 224 }
fn default_saliency_layer() -> String { "layer4".to_string() }
fn default_seed() -> u64 { 42 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            backbone_weights: None,
            use_gpu: false,
            image_size: default_image_size(),
            saliency_layer: default_saliency_layer(),
            seed: default_seed(),
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self> {
        let path = std::env::var("TRIAGYX_CONFIG").unwrap_or_else(|_| "triagyx.toml".to_string());
        if !Path::new(&path).exists() {
            info!(path, "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| EngineError::Config(format!("cannot parse {}: {}", path, e)))?;
        info!(path, "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.image_size, 224);
        assert_eq!(config.saliency_layer, "layer4");
        assert_eq!(config.seed, 42);
        assert!(!config.use_gpu);
        assert!(config.backbone_weights.is_none());
    }

    #[test]
    fn test_partial_document_overrides_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            model_dir = "/var/lib/triagyx/models"
            image_size = 128
            saliency_layer = "layer3"
            "#,
        )
        .unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/var/lib/triagyx/models"));
        assert_eq!(config.image_size, 128);
        assert_eq!(config.saliency_layer, "layer3");
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_bad_document_is_config_error() {
        let err = toml::from_str::<EngineConfig>("image_size = \"big\"");
        assert!(err.is_err());
    }
}
