//! Bagged decision trees (random-forest style member).

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::error::{Result, TabularError};
use crate::tree::DecisionTree;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaggedTrees {
    n_classes: usize,
    n_trees: usize,
    max_depth: usize,
    seed: u64,
    trees: Vec<DecisionTree>,
}

impl BaggedTrees {
    pub fn new(n_classes: usize, seed: u64) -> Self {
        Self {
            n_classes,
            n_trees: 25,
            max_depth: 10,
            seed,
            trees: Vec::new(),
        }
    }
}

impl Classifier for BaggedTrees {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(TabularError::Validation(
                "feature/label row count mismatch".to_string(),
            ));
        }
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_trees);

        for _ in 0..self.n_trees {
            // Bootstrap resampling expressed as per-sample weights, so the
            // tree sees the full matrix and no rows need copying.
            let mut weights = vec![0.0f64; n];
            for _ in 0..n {
                weights[rng.gen_range(0..n)] += 1.0;
            }
            let mut tree = DecisionTree::new(self.n_classes, self.max_depth);
            tree.fit_weighted(x, y, &weights)?;
            trees.push(tree);
        }

        self.trees = trees;
        Ok(())
    }

    fn predict_probabilities(&self, row: &[f64]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(TabularError::NotTrained);
        }
        let mut blended = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let probs = tree.predict_probabilities(row)?;
            for (b, p) in blended.iter_mut().zip(probs.iter()) {
                *b += p;
            }
        }
        for b in blended.iter_mut() {
            *b /= self.trees.len() as f64;
        }
        Ok(blended)
    }

    fn name(&self) -> &'static str {
        "bagged_trees"
    }
}
