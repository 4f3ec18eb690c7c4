//! The diagnostic engine facade.
//!
//! Owns both pipelines: the tabular symptom ensemble (trained, persisted and
//! hot-swapped behind a read lock) and the vision stack (backbone,
//! preprocessor, detector, saliency, embeddings). Retraining happens under a
//! separate guard so concurrent predictions keep reading the previous model
//! until the new bundle is saved and swapped in.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use ndarray::ArrayView2;
use tracing::{info, warn};

use triagyx_common::{EnsembleResult, FeatureAttribution, ImagingFinding, SaliencyMap};
use triagyx_tabular::attribution::BACKGROUND_CAP;
use triagyx_tabular::{
    generate, AttributionExplainer, PredictiveModel, SymptomEnsemble, FEATURE_NAMES,
};
use triagyx_vision::{
    select_device, AbnormalityDetector, BackboneConfig, FeatureExtractor, ImageBackbone,
    ImagePreprocessor, SaliencyExplainer,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Blended probability of one class, as a scalar model for the attribution
/// explainer. Perturbed inputs are always full-length and finite, so the
/// inner prediction cannot fail for inputs the explainer constructs.
struct ClassProbabilityModel<'a> {
    ensemble: &'a SymptomEnsemble,
    class: usize,
}

impl PredictiveModel for ClassProbabilityModel<'_> {
    fn predict_value(&self, features: &[f64]) -> f64 {
        self.ensemble
            .blended_probabilities(features)
            .map(|probs| probs[self.class])
            .unwrap_or(0.0)
    }
}

pub struct TriageEngine {
    config: EngineConfig,
    ensemble: RwLock<Option<Arc<SymptomEnsemble>>>,
    train_guard: Mutex<()>,
    preprocessor: ImagePreprocessor,
    detector: AbnormalityDetector,
    saliency: SaliencyExplainer,
    features: FeatureExtractor,
}

impl TriageEngine {
    /// Build the engine: select a device, set up the vision stack and try to
    /// load a previously saved tabular bundle. A missing or unreadable
    /// bundle leaves the engine in the untrained state rather than failing.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let device = select_device(config.use_gpu);
        let backbone_config = BackboneConfig {
            input_size: config.image_size,
            ..Default::default()
        };
        let backbone = match &config.backbone_weights {
            Some(path) => ImageBackbone::load(backbone_config, path, &device)?,
            None => ImageBackbone::random(backbone_config, &device)?,
        };
        // Fail on a bad saliency layer now, not on the first explain call.
        backbone.stage_index(&config.saliency_layer)?;
        let backbone = Arc::new(backbone);

        let ensemble = match SymptomEnsemble::load(&config.model_dir) {
            Ok(loaded) => {
                info!(dir = %config.model_dir.display(), "tabular model bundle loaded");
                Some(Arc::new(loaded))
            }
            Err(e) => {
                warn!(
                    dir = %config.model_dir.display(),
                    error = %e,
                    "no usable model bundle, starting untrained"
                );
                None
            }
        };

        Ok(Self {
            preprocessor: ImagePreprocessor::new(config.image_size, device),
            detector: AbnormalityDetector::new(Arc::clone(&backbone)),
            saliency: SaliencyExplainer::new(Arc::clone(&backbone)),
            features: FeatureExtractor::new(backbone),
            ensemble: RwLock::new(ensemble),
            train_guard: Mutex::new(()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.current().is_ok()
    }

    fn current(&self) -> Result<Arc<SymptomEnsemble>> {
        let guard = self
            .ensemble
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.as_ref().cloned().ok_or(EngineError::NotTrained)
    }

    /// Ranked disease prediction for one raw feature vector.
    pub fn diagnose(&self, raw: &[f64]) -> Result<EnsembleResult> {
        Ok(self.current()?.predict(raw)?)
    }

    /// Train a fresh ensemble, persist it and swap it in. Concurrent calls
    /// serialize on the train guard; readers never block on training.
    pub fn train(&self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        let _guard = self
            .train_guard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let ensemble = SymptomEnsemble::train(x, y, self.config.seed)?;
        ensemble.save(&self.config.model_dir)?;

        let mut slot = self
            .ensemble
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Arc::new(ensemble));
        info!("new model bundle active");
        Ok(())
    }

    /// Train on a seeded synthetic dataset of `n_samples` rows.
    pub fn train_synthetic(&self, n_samples: usize) -> Result<()> {
        let data = generate(n_samples, self.config.seed);
        self.train(data.features.view(), &data.labels)
    }

    /// Per-feature contribution breakdown for the top-ranked class of one
    /// raw vector, estimated against a seeded synthetic background sample.
    pub fn explain_diagnosis(&self, raw: &[f64]) -> Result<FeatureAttribution> {
        let ensemble = self.current()?;
        let blended = ensemble.blended_probabilities(raw)?;
        let class = blended
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);

        let background_data = generate(BACKGROUND_CAP, self.config.seed);
        let background: Vec<Vec<f64>> = background_data
            .features
            .rows()
            .into_iter()
            .map(|row| row.to_vec())
            .collect();

        let model = ClassProbabilityModel {
            ensemble: &ensemble,
            class,
        };
        let explainer =
            AttributionExplainer::new(&model, &background, &FEATURE_NAMES, self.config.seed)?;
        Ok(explainer.explain(raw)?)
    }

    /// Analyze an encoded (JPEG/PNG) scan payload.
    pub fn analyze_image_bytes(&self, bytes: &[u8]) -> Result<ImagingFinding> {
        let tensor = self.preprocessor.decode(bytes)?;
        Ok(self.detector.analyze(&tensor)?)
    }

    /// Analyze a scan file on disk.
    pub fn analyze_image_path(&self, path: &Path) -> Result<ImagingFinding> {
        let tensor = self.preprocessor.load(path)?;
        Ok(self.detector.analyze(&tensor)?)
    }

    /// Class activation map for an encoded scan payload at the configured
    /// saliency layer. `target_class == None` explains the predicted class.
    pub fn explain_image(
        &self,
        bytes: &[u8],
        target_class: Option<usize>,
    ) -> Result<SaliencyMap> {
        let tensor = self.preprocessor.decode(bytes)?;
        Ok(self
            .saliency
            .explain(&tensor, &self.config.saliency_layer, target_class)?)
    }

    /// Dense embedding of an encoded scan payload for scan-to-scan
    /// similarity comparison.
    pub fn image_embedding(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let tensor = self.preprocessor.decode(bytes)?;
        Ok(self.features.embed(&tensor)?)
    }
}
