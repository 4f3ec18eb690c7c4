//! Classifier capability trait shared by the ensemble members.
//!
//! Each member family (linear, bagged trees, boosted trees, feed-forward)
//! adapts its internals to this contract so the ensemble can blend them
//! without caring which algorithm produced a distribution.

use ndarray::ArrayView2;

use crate::error::Result;

/// A trained, stateless-at-inference classifier over the shared standardized
/// feature space.
pub trait Classifier: Send + Sync {
    /// Fit on standardized features. `y` holds class indices.
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()>;

    /// Class-probability distribution for one standardized row.
    /// Probabilities are non-negative and sum to 1 within float tolerance.
    /// Fails with `NotTrained` before a successful `fit`.
    fn predict_probabilities(&self, row: &[f64]) -> Result<Vec<f64>>;

    fn name(&self) -> &'static str;
}

/// In-place softmax over a logit slice. Max-shifted for stability.
pub(crate) fn softmax(logits: &mut [f64]) {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in logits.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in logits.iter_mut() {
        *v /= sum;
    }
}

/// Index of the largest value; ties resolve to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let mut logits = vec![1.0, 2.0, 3.0, -1.0];
        softmax(&mut logits);
        let sum: f64 = logits.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(logits.iter().all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_softmax_handles_large_logits() {
        let mut logits = vec![1000.0, 1001.0];
        softmax(&mut logits);
        assert!(logits.iter().all(|p| p.is_finite()));
        assert!(logits[1] > logits[0]);
    }

    #[test]
    fn test_argmax_tie_breaks_low() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5, 0.1]), 1);
    }
}
