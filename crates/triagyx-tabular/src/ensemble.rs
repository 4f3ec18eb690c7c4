//! Multi-model symptom/disease ensemble.
//!
//! Four independently trained members share one standardized feature space;
//! their class distributions are blended with an unweighted arithmetic mean.
//! The flat mean is deliberate: blend weights tuned on a small validation
//! set overfit easily, and an unweighted mean keeps the blend auditable.

use ndarray::ArrayView2;
use tracing::{debug, info};

use triagyx_common::{EnsembleResult, PredictionCandidate, Severity};

use crate::boost::BoostedTrees;
use crate::classifier::Classifier;
use crate::error::{Result, TabularError};
use crate::forest::BaggedTrees;
use crate::linear::LogisticRegression;
use crate::mlp::MlpClassifier;
use crate::scaler::StandardScaler;
use crate::schema::{FeatureVector, CLASS_COUNT, DISEASES};

/// Number of ranked candidates returned per prediction.
pub const TOP_K: usize = 3;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SymptomEnsemble {
    pub(crate) scaler: StandardScaler,
    pub(crate) linear: LogisticRegression,
    pub(crate) forest: BaggedTrees,
    pub(crate) boost: BoostedTrees,
    pub(crate) mlp: MlpClassifier,
}

impl SymptomEnsemble {
    /// Fit the scaler and all four members on the same standardized matrix.
    ///
    /// `x` rows follow the canonical feature schema; `y` holds class indices
    /// into the canonical disease list. The seed drives every stochastic
    /// member (bootstrap resampling, weight init).
    pub fn train(x: ArrayView2<f64>, y: &[usize], seed: u64) -> Result<Self> {
        if x.ncols() != crate::schema::FEATURE_COUNT {
            return Err(TabularError::Validation(format!(
                "expected {} feature columns, got {}",
                crate::schema::FEATURE_COUNT,
                x.ncols()
            )));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= CLASS_COUNT) {
            return Err(TabularError::Validation(format!(
                "label {} out of range for {} diseases",
                bad, CLASS_COUNT
            )));
        }

        info!(rows = x.nrows(), seed, "training symptom ensemble");
        let scaler = StandardScaler::fit(x)?;
        let scaled = scaler.transform(x);

        let mut linear = LogisticRegression::new(CLASS_COUNT);
        let mut forest = BaggedTrees::new(CLASS_COUNT, seed);
        let mut boost = BoostedTrees::new(CLASS_COUNT);
        let mut mlp = MlpClassifier::new(CLASS_COUNT, seed.wrapping_add(1));

        linear.fit(scaled.view(), y)?;
        forest.fit(scaled.view(), y)?;
        boost.fit(scaled.view(), y)?;
        mlp.fit(scaled.view(), y)?;
        debug!("all ensemble members fitted");

        Ok(Self {
            scaler,
            linear,
            forest,
            boost,
            mlp,
        })
    }

    fn members(&self) -> [&dyn Classifier; 4] {
        [&self.linear, &self.forest, &self.boost, &self.mlp]
    }

    /// Unweighted mean of member class distributions for a raw vector.
    pub fn blended_probabilities(&self, raw: &[f64]) -> Result<Vec<f64>> {
        let vector = FeatureVector::new(raw)?;
        let scaled = self.scaler.transform_row(vector.as_slice());

        let members = self.members();
        let mut blended = vec![0.0; CLASS_COUNT];
        for member in members {
            let probs = member.predict_probabilities(&scaled)?;
            for (b, p) in blended.iter_mut().zip(probs.iter()) {
                *b += p;
            }
        }
        for b in blended.iter_mut() {
            *b /= members.len() as f64;
        }
        Ok(blended)
    }

    /// Full ranked prediction: validate, scale, blend, rank, bucket, explain.
    pub fn predict(&self, raw: &[f64]) -> Result<EnsembleResult> {
        let vector = FeatureVector::new(raw)?;
        let blended = self.blended_probabilities(raw)?;

        let predictions = rank_candidates(&blended, TOP_K)
            .into_iter()
            .map(|(class, confidence)| PredictionCandidate {
                disease: DISEASES[class].to_string(),
                confidence,
                severity: Severity::from_confidence(confidence).level(),
            })
            .collect();

        Ok(EnsembleResult {
            predictions,
            explanation: explanation_text(&vector),
        })
    }
}

/// Top-k classes by probability, descending; ties break toward the lower
/// class index so ordering is deterministic across runs.
pub fn rank_candidates(probabilities: &[f64], k: usize) -> Vec<(usize, f64)> {
    let mut indexed: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    indexed.truncate(k);
    indexed
}

/// Free-text rationale from raw threshold checks.
///
/// Deliberately decoupled from the model internals: these are clinician-set
/// red-flag thresholds over the raw (unscaled) vector, not a readout of the
/// ensemble's decision boundary. Callers wanting a model-faithful account
/// should use the attribution explainer instead.
pub fn explanation_text(vector: &FeatureVector) -> String {
    let mut parts = Vec::new();

    if let Some(temperature) = vector.value("temperature") {
        if temperature > 38.0 {
            parts.push(format!("High temperature detected ({temperature}\u{b0}C)"));
        }
    }
    if let Some(cough) = vector.value("cough_severity") {
        if cough > 5.0 {
            parts.push("Moderate to severe cough reported".to_string());
        }
    }
    if let Some(aqi) = vector.value("aqi") {
        if aqi > 150.0 {
            parts.push(format!("Poor air quality index ({aqi})"));
        }
    }

    if parts.is_empty() {
        "Standard symptom profile".to_string()
    } else {
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::generate;

    fn trained() -> SymptomEnsemble {
        let data = generate(400, 42);
        SymptomEnsemble::train(data.features.view(), &data.labels, 42).unwrap()
    }

    #[test]
    fn test_blend_sums_to_one() {
        let ensemble = trained();
        let raw = [35.0, 37.0, 2.0, 3.0, 1.0, 60.0, 55.0, 22.0];
        let blended = ensemble.blended_probabilities(&raw).unwrap();
        let sum: f64 = blended.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum = {}", sum);
        assert!(blended.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_exactly_three_candidates_sorted() {
        let ensemble = trained();
        let raw = [50.0, 39.0, 8.0, 6.0, 4.0, 200.0, 70.0, 30.0];
        let result = ensemble.predict(&raw).unwrap();
        assert_eq!(result.predictions.len(), TOP_K);
        for pair in result.predictions.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_rank_candidates_tie_breaks_by_canonical_order() {
        let probs = vec![0.25, 0.25, 0.25, 0.25];
        let top = rank_candidates(&probs, 3);
        assert_eq!(
            top.iter().map(|&(i, _)| i).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_rank_candidates_descending() {
        let probs = vec![0.1, 0.4, 0.2, 0.3];
        let top = rank_candidates(&probs, 3);
        assert_eq!(
            top.iter().map(|&(i, _)| i).collect::<Vec<_>>(),
            vec![1, 3, 2]
        );
    }

    #[test]
    fn test_threshold_explanation_mentions_triggers() {
        let raw = [40.0, 39.0, 8.0, 3.0, 2.0, 200.0, 60.0, 25.0];
        let vector = FeatureVector::new(&raw).unwrap();
        let text = explanation_text(&vector);
        assert!(text.contains("temperature"), "text = {}", text);
        assert!(text.contains("air quality"), "text = {}", text);
        assert!(text.contains("cough"), "text = {}", text);
    }

    #[test]
    fn test_nominal_profile_explanation() {
        let raw = [30.0, 36.8, 1.0, 1.0, 0.0, 40.0, 50.0, 20.0];
        let vector = FeatureVector::new(&raw).unwrap();
        assert_eq!(explanation_text(&vector), "Standard symptom profile");
    }

    #[test]
    fn test_flagged_profile_has_moderate_or_higher_severity() {
        let ensemble = trained();
        // Temperature, cough and AQI all past their red-flag thresholds.
        let raw = [45.0, 39.0, 8.0, 5.0, 3.0, 200.0, 65.0, 28.0];
        let result = ensemble.predict(&raw).unwrap();
        assert!(result.predictions[0].severity >= 3, "top = {:?}", result.predictions[0]);
        assert!(result.explanation.contains("temperature"));
        assert!(result.explanation.contains("air quality"));
    }

    #[test]
    fn test_invalid_vector_rejected() {
        let ensemble = trained();
        assert!(ensemble.predict(&[1.0, 2.0]).is_err());
        let mut raw = [30.0, 36.8, 1.0, 1.0, 0.0, 40.0, 50.0, 20.0];
        raw[0] = f64::NAN;
        assert!(ensemble.predict(&raw).is_err());
    }
}
