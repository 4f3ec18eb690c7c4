//! Perturbation-based feature attribution.
//!
//! Monte-Carlo Shapley sampling against a background reference sample: each
//! feature's contribution is the average change in model output from adding
//! that feature to a random coalition, with missing features filled from a
//! random background row. The most expensive call in the engine — cost
//! scales with sample count × feature count — so the background is capped
//! and subsampled up front.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use triagyx_common::FeatureAttribution;

use crate::error::{Result, TabularError};

/// Background rows kept before the estimator subsample.
pub const BACKGROUND_CAP: usize = 100;
/// Rows actually used by the sampling estimator.
pub const KERNEL_SAMPLE: usize = 50;
/// Permutation passes per background row.
const PERMUTATIONS_PER_ROW: usize = 4;
/// Reported features are capped at this many, ranked by |contribution|.
const TOP_FEATURES: usize = 10;

/// Anything exposing a scalar probability-style prediction can be explained;
/// the explainer does not depend on the ensemble.
pub trait PredictiveModel {
    fn predict_value(&self, features: &[f64]) -> f64;
}

impl<F> PredictiveModel for F
where
    F: Fn(&[f64]) -> f64,
{
    fn predict_value(&self, features: &[f64]) -> f64 {
        self(features)
    }
}

pub struct AttributionExplainer<'a, M: PredictiveModel> {
    model: &'a M,
    background: Vec<Vec<f64>>,
    feature_names: Vec<String>,
    seed: u64,
}

impl<'a, M: PredictiveModel> AttributionExplainer<'a, M> {
    /// Build an explainer over a background reference sample.
    ///
    /// The background is capped at [`BACKGROUND_CAP`] rows and then
    /// subsampled (seeded) to [`KERNEL_SAMPLE`] rows for the estimator.
    pub fn new(
        model: &'a M,
        background: &[Vec<f64>],
        feature_names: &[&str],
        seed: u64,
    ) -> Result<Self> {
        if background.is_empty() {
            return Err(TabularError::Validation(
                "attribution requires a non-empty background sample".to_string(),
            ));
        }
        let n_features = background[0].len();
        if feature_names.len() != n_features {
            return Err(TabularError::Validation(format!(
                "{} feature names for {} background columns",
                feature_names.len(),
                n_features
            )));
        }
        if let Some(row) = background.iter().find(|r| r.len() != n_features) {
            return Err(TabularError::Validation(format!(
                "ragged background row of length {}",
                row.len()
            )));
        }

        let capped: Vec<Vec<f64>> = background.iter().take(BACKGROUND_CAP).cloned().collect();
        let mut rng = StdRng::seed_from_u64(seed);
        let subsample: Vec<Vec<f64>> = if capped.len() > KERNEL_SAMPLE {
            capped
                .choose_multiple(&mut rng, KERNEL_SAMPLE)
                .cloned()
                .collect()
        } else {
            capped
        };
        debug!(rows = subsample.len(), "attribution background prepared");

        Ok(Self {
            model,
            background: subsample,
            feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
            seed,
        })
    }

    /// Expected model output over the background subsample.
    pub fn base_value(&self) -> f64 {
        let sum: f64 = self
            .background
            .iter()
            .map(|row| self.model.predict_value(row))
            .sum();
        sum / self.background.len() as f64
    }

    /// Per-feature contributions for one query vector.
    pub fn explain(&self, query: &[f64]) -> Result<FeatureAttribution> {
        let n_features = self.feature_names.len();
        if query.len() != n_features {
            return Err(TabularError::Validation(format!(
                "query has {} fields, expected {}",
                query.len(),
                n_features
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        let mut contributions = vec![0.0f64; n_features];
        let mut order: Vec<usize> = (0..n_features).collect();

        // Each pass walks one random permutation against one reference row,
        // swapping features from reference to query one at a time; the
        // marginal deltas telescope, so averaged contributions sum exactly
        // to prediction_value - base_value.
        for reference in &self.background {
            for _ in 0..PERMUTATIONS_PER_ROW {
                order.shuffle(&mut rng);
                let mut current = reference.clone();
                let mut previous = self.model.predict_value(&current);
                for &feature in &order {
                    current[feature] = query[feature];
                    let next = self.model.predict_value(&current);
                    contributions[feature] += next - previous;
                    previous = next;
                }
            }
        }
        let draws = (self.background.len() * PERMUTATIONS_PER_ROW) as f64;
        for c in contributions.iter_mut() {
            *c /= draws;
        }

        let mut ranked: Vec<usize> = (0..n_features).collect();
        ranked.sort_by(|&a, &b| {
            contributions[b]
                .abs()
                .partial_cmp(&contributions[a].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(TOP_FEATURES);

        Ok(FeatureAttribution {
            features: ranked
                .iter()
                .map(|&i| self.feature_names[i].clone())
                .collect(),
            values: ranked.iter().map(|&i| contributions[i]).collect(),
            base_value: self.base_value(),
            prediction_value: self.model.predict_value(query),
        })
    }
}
