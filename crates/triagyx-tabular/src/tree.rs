//! Weighted CART classification tree.
//!
//! One tree implementation backs both ensemble tree families: the bagged
//! member grows deep trees on bootstrap resamples, the boosted member grows
//! shallow trees on reweighted samples. Splits minimize weighted Gini
//! impurity; candidate thresholds sit at midpoints between distinct sorted
//! feature values.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabularError};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Weighted class distribution at this leaf; sums to 1.
        probs: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    n_classes: usize,
    max_depth: usize,
    min_samples_split: usize,
    root: Option<Node>,
}

impl DecisionTree {
    pub fn new(n_classes: usize, max_depth: usize) -> Self {
        Self {
            n_classes,
            max_depth,
            min_samples_split: 2,
            root: None,
        }
    }

    /// Fit with per-sample weights. Uniform weights reduce to plain CART.
    pub fn fit_weighted(&mut self, x: ArrayView2<f64>, y: &[usize], w: &[f64]) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() || y.len() != w.len() {
            return Err(TabularError::Validation(
                "feature/label/weight row count mismatch".to_string(),
            ));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= self.n_classes) {
            return Err(TabularError::Validation(format!(
                "label {} out of range for {} classes",
                bad, self.n_classes
            )));
        }
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build(x, y, w, &indices, 0));
        Ok(())
    }

    pub fn predict_probabilities(&self, row: &[f64]) -> Result<Vec<f64>> {
        let mut node = self.root.as_ref().ok_or(TabularError::NotTrained)?;
        loop {
            match node {
                Node::Leaf { probs } => return Ok(probs.clone()),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Most probable class for a row; ties resolve to the lowest index.
    pub fn predict_class(&self, row: &[f64]) -> Result<usize> {
        let probs = self.predict_probabilities(row)?;
        Ok(crate::classifier::argmax(&probs))
    }

    fn class_distribution(&self, y: &[usize], w: &[f64], indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        let mut total = 0.0;
        for &i in indices {
            counts[y[i]] += w[i];
            total += w[i];
        }
        if total > 0.0 {
            for c in counts.iter_mut() {
                *c /= total;
            }
        } else {
            // Degenerate all-zero weights: fall back to uniform.
            counts.fill(1.0 / self.n_classes as f64);
        }
        counts
    }

    fn build(
        &self,
        x: ArrayView2<f64>,
        y: &[usize],
        w: &[f64],
        indices: &[usize],
        depth: usize,
    ) -> Node {
        let probs = self.class_distribution(y, w, indices);
        let pure = probs.iter().any(|&p| p > 1.0 - 1e-12);
        if depth >= self.max_depth || indices.len() < self.min_samples_split || pure {
            return Node::Leaf { probs };
        }

        match self.best_split(x, y, w, indices) {
            Some((feature, threshold)) => {
                let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature]] <= threshold);
                if left_idx.is_empty() || right_idx.is_empty() {
                    return Node::Leaf { probs };
                }
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(x, y, w, &left_idx, depth + 1)),
                    right: Box::new(self.build(x, y, w, &right_idx, depth + 1)),
                }
            }
            None => Node::Leaf { probs },
        }
    }

    /// Exhaustive split search: for each feature, sweep sorted values and
    /// score boundaries between distinct values by weighted Gini. Impure
    /// nodes always get their best candidate, even at zero gain; gain ties
    /// resolve to the most weight-balanced boundary, then to feature/value
    /// order, so the search is deterministic.
    fn best_split(
        &self,
        x: ArrayView2<f64>,
        y: &[usize],
        w: &[f64],
        indices: &[usize],
    ) -> Option<(usize, f64)> {
        let total_weight: f64 = indices.iter().map(|&i| w[i]).sum();
        if total_weight <= 0.0 {
            return None;
        }

        let mut parent_counts = vec![0.0; self.n_classes];
        for &i in indices {
            parent_counts[y[i]] += w[i];
        }
        let parent_gini = gini(&parent_counts, total_weight);

        // (feature, threshold, gain, |left - right| weight imbalance)
        let mut best: Option<(usize, f64, f64, f64)> = None;

        for feature in 0..x.ncols() {
            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                x[[a, feature]]
                    .partial_cmp(&x[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_counts = vec![0.0; self.n_classes];
            let mut left_weight = 0.0;

            for pos in 0..sorted.len() - 1 {
                let i = sorted[pos];
                left_counts[y[i]] += w[i];
                left_weight += w[i];

                let v_here = x[[i, feature]];
                let v_next = x[[sorted[pos + 1], feature]];
                if v_next - v_here < 1e-12 {
                    continue;
                }

                let right_weight = total_weight - left_weight;
                if left_weight <= 0.0 || right_weight <= 0.0 {
                    continue;
                }
                let mut right_counts = vec![0.0; self.n_classes];
                for c in 0..self.n_classes {
                    right_counts[c] = parent_counts[c] - left_counts[c];
                }

                let split_gini = (left_weight * gini(&left_counts, left_weight)
                    + right_weight * gini(&right_counts, right_weight))
                    / total_weight;
                let gain = parent_gini - split_gini;
                let imbalance = (left_weight - right_weight).abs();

                // Zero-gain splits are kept: on interaction-only data every
                // first-level boundary is gain-free, and only splitting
                // anyway lets deeper levels separate the classes.
                let better = match best {
                    None => true,
                    Some((_, _, g, imb)) => {
                        if (gain - g).abs() <= 1e-12 {
                            imbalance < imb
                        } else {
                            gain > g
                        }
                    }
                };
                if better {
                    best = Some((feature, (v_here + v_next) / 2.0, gain, imbalance));
                }
            }
        }

        best.map(|(feature, threshold, _, _)| (feature, threshold))
    }
}

fn gini(counts: &[f64], total: f64) -> f64 {
    let sum_sq: f64 = counts.iter().map(|c| (c / total) * (c / total)).sum();
    1.0 - sum_sq
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fits_axis_aligned_split() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = vec![0, 0, 0, 1, 1, 1];
        let w = vec![1.0; 6];
        let mut tree = DecisionTree::new(2, 4);
        tree.fit_weighted(x.view(), &y, &w).unwrap();

        assert_eq!(tree.predict_class(&[2.0]).unwrap(), 0);
        assert_eq!(tree.predict_class(&[11.0]).unwrap(), 1);
        let probs = tree.predict_probabilities(&[2.0]).unwrap();
        assert!((probs[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_steer_the_split() {
        // Same feature values, but weight mass flips the majority at a leaf.
        let x = array![[0.0], [0.0], [1.0], [1.0]];
        let y = vec![0, 1, 0, 1];
        let w = vec![10.0, 1.0, 1.0, 10.0];
        let mut tree = DecisionTree::new(2, 3);
        tree.fit_weighted(x.view(), &y, &w).unwrap();
        assert_eq!(tree.predict_class(&[0.0]).unwrap(), 0);
        assert_eq!(tree.predict_class(&[1.0]).unwrap(), 1);
    }

    #[test]
    fn test_splits_through_zero_gain_interaction() {
        // XOR layout: no single-feature split has any Gini gain, so the
        // tree must split anyway and separate the classes one level down.
        let x = array![
            [0.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [0.1, 0.1],
            [0.9, 0.9],
            [0.1, 0.9],
            [0.9, 0.1],
        ];
        let y = vec![0, 0, 1, 1, 0, 0, 1, 1];
        let w = vec![1.0; 8];
        let mut tree = DecisionTree::new(2, 3);
        tree.fit_weighted(x.view(), &y, &w).unwrap();

        assert_eq!(tree.predict_class(&[0.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict_class(&[1.0, 1.0]).unwrap(), 0);
        assert_eq!(tree.predict_class(&[0.0, 1.0]).unwrap(), 1);
        assert_eq!(tree.predict_class(&[1.0, 0.0]).unwrap(), 1);
    }

    #[test]
    fn test_depth_zero_is_single_leaf() {
        let x = array![[1.0], [2.0]];
        let y = vec![0, 1];
        let mut tree = DecisionTree::new(2, 0);
        tree.fit_weighted(x.view(), &y, &[1.0, 1.0]).unwrap();
        let probs = tree.predict_probabilities(&[5.0]).unwrap();
        assert!((probs[0] - 0.5).abs() < 1e-9);
        assert!((probs[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let tree = DecisionTree::new(2, 3);
        assert!(matches!(
            tree.predict_probabilities(&[0.0]),
            Err(TabularError::NotTrained)
        ));
    }
}
