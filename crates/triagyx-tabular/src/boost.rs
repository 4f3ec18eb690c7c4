//! Boosted shallow trees (SAMME-style multiclass AdaBoost member).

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::Classifier;
use crate::error::{Result, TabularError};
use crate::tree::DecisionTree;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedTrees {
    n_classes: usize,
    n_rounds: usize,
    max_depth: usize,
    /// (tree, stage weight) pairs in boosting order.
    stages: Vec<(DecisionTree, f64)>,
}

impl BoostedTrees {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            n_rounds: 30,
            max_depth: 3,
            stages: Vec::new(),
        }
    }
}

impl Classifier for BoostedTrees {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(TabularError::Validation(
                "feature/label row count mismatch".to_string(),
            ));
        }
        let n = x.nrows();
        let k = self.n_classes as f64;
        let mut weights = vec![1.0 / n as f64; n];
        let mut stages = Vec::with_capacity(self.n_rounds);

        for round in 0..self.n_rounds {
            let mut tree = DecisionTree::new(self.n_classes, self.max_depth);
            tree.fit_weighted(x, y, &weights)?;

            let mut err = 0.0;
            let mut misses = vec![false; n];
            for i in 0..n {
                let row: Vec<f64> = x.row(i).to_vec();
                if tree.predict_class(&row)? != y[i] {
                    misses[i] = true;
                    err += weights[i];
                }
            }

            // A stage no better than random guessing contributes nothing.
            if err >= 1.0 - 1.0 / k {
                debug!(round, err, "boosting stage rejected, stopping early");
                break;
            }
            let err = err.clamp(1e-10, 1.0 - 1e-10);
            let alpha = ((1.0 - err) / err).ln() + (k - 1.0).ln();
            stages.push((tree, alpha));

            let mut total = 0.0;
            for i in 0..n {
                if misses[i] {
                    weights[i] *= alpha.exp();
                }
                total += weights[i];
            }
            for w in weights.iter_mut() {
                *w /= total;
            }
        }

        if stages.is_empty() {
            return Err(TabularError::Validation(
                "boosting produced no usable stage".to_string(),
            ));
        }
        self.stages = stages;
        Ok(())
    }

    fn predict_probabilities(&self, row: &[f64]) -> Result<Vec<f64>> {
        if self.stages.is_empty() {
            return Err(TabularError::NotTrained);
        }
        let mut votes = vec![0.0; self.n_classes];
        for (tree, alpha) in &self.stages {
            votes[tree.predict_class(row)?] += alpha;
        }
        let total: f64 = votes.iter().sum();
        if total <= 0.0 {
            return Ok(vec![1.0 / self.n_classes as f64; self.n_classes]);
        }
        for v in votes.iter_mut() {
            *v /= total;
        }
        Ok(votes)
    }

    fn name(&self) -> &'static str {
        "boosted_trees"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn xor_ish_data() -> (Array2<f64>, Vec<usize>) {
        // Not linearly separable; needs at least depth-2 interactions.
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            let jitter = i as f64 * 0.01;
            rows.extend_from_slice(&[0.0 + jitter, 0.0 + jitter]);
            labels.push(0);
            rows.extend_from_slice(&[1.0 + jitter, 1.0 + jitter]);
            labels.push(0);
            rows.extend_from_slice(&[0.0 + jitter, 1.0 + jitter]);
            labels.push(1);
            rows.extend_from_slice(&[1.0 + jitter, 0.0 + jitter]);
            labels.push(1);
        }
        (
            Array2::from_shape_vec((40, 2), rows).expect("shape"),
            labels,
        )
    }

    #[test]
    fn test_learns_interaction() {
        let (x, y) = xor_ish_data();
        let mut model = BoostedTrees::new(2);
        model.fit(x.view(), &y).unwrap();
        let same = model.predict_probabilities(&[0.02, 0.02]).unwrap();
        let diff = model.predict_probabilities(&[0.02, 1.02]).unwrap();
        assert!(same[0] > same[1]);
        assert!(diff[1] > diff[0]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = xor_ish_data();
        let mut model = BoostedTrees::new(2);
        model.fit(x.view(), &y).unwrap();
        let probs = model.predict_probabilities(&[0.5, 0.5]).unwrap();
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(probs.iter().all(|&p| p >= 0.0));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = BoostedTrees::new(2);
        assert!(matches!(
            model.predict_probabilities(&[0.0, 0.0]),
            Err(TabularError::NotTrained)
        ));
    }
}
