//! Multinomial logistic regression trained by full-batch gradient descent.

use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::classifier::{softmax, Classifier};
use crate::error::{Result, TabularError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    n_classes: usize,
    learning_rate: f64,
    max_iter: usize,
    /// (n_classes, n_features) after fit.
    weights: Option<Array2<f64>>,
    bias: Option<Array1<f64>>,
}

impl LogisticRegression {
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            learning_rate: 0.5,
            max_iter: 300,
            weights: None,
            bias: None,
        }
    }

    fn check_labels(&self, y: &[usize]) -> Result<()> {
        if let Some(&bad) = y.iter().find(|&&c| c >= self.n_classes) {
            return Err(TabularError::Validation(format!(
                "label {} out of range for {} classes",
                bad, self.n_classes
            )));
        }
        Ok(())
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(TabularError::Validation(
                "feature/label row count mismatch".to_string(),
            ));
        }
        self.check_labels(y)?;

        let n = x.nrows();
        let d = x.ncols();
        let mut weights = Array2::<f64>::zeros((self.n_classes, d));
        let mut bias = Array1::<f64>::zeros(self.n_classes);

        // One-hot targets.
        let mut targets = Array2::<f64>::zeros((n, self.n_classes));
        for (i, &c) in y.iter().enumerate() {
            targets[[i, c]] = 1.0;
        }

        for _ in 0..self.max_iter {
            // Probabilities: softmax(X · Wᵀ + b) row-wise.
            let mut probs = x.dot(&weights.t()) + &bias;
            for mut row in probs.rows_mut() {
                if let Some(slice) = row.as_slice_mut() {
                    softmax(slice);
                }
            }

            let residual = &probs - &targets; // (n, k)
            let grad_w = residual.t().dot(&x) / n as f64; // (k, d)
            let grad_b = residual.sum_axis(ndarray::Axis(0)) / n as f64;

            weights = weights - self.learning_rate * &grad_w;
            bias = bias - self.learning_rate * &grad_b;
        }

        self.weights = Some(weights);
        self.bias = Some(bias);
        Ok(())
    }

    fn predict_probabilities(&self, row: &[f64]) -> Result<Vec<f64>> {
        let weights = self.weights.as_ref().ok_or(TabularError::NotTrained)?;
        let bias = self.bias.as_ref().ok_or(TabularError::NotTrained)?;

        let mut logits: Vec<f64> = weights
            .rows()
            .into_iter()
            .zip(bias.iter())
            .map(|(w, b)| w.iter().zip(row.iter()).map(|(wi, xi)| wi * xi).sum::<f64>() + b)
            .collect();
        softmax(&mut logits);
        Ok(logits)
    }

    fn name(&self) -> &'static str {
        "logistic_regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_learns_separable_classes() {
        let x = array![
            [-2.0, 0.0],
            [-1.5, 0.2],
            [-1.8, -0.1],
            [2.0, 0.0],
            [1.7, 0.1],
            [1.9, -0.2],
        ];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut model = LogisticRegression::new(2);
        model.fit(x.view(), &y).unwrap();

        let left = model.predict_probabilities(&[-1.8, 0.0]).unwrap();
        let right = model.predict_probabilities(&[1.8, 0.0]).unwrap();
        assert!(left[0] > 0.8, "left class prob was {}", left[0]);
        assert!(right[1] > 0.8, "right class prob was {}", right[1]);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = vec![0, 1, 2];
        let mut model = LogisticRegression::new(3);
        model.fit(x.view(), &y).unwrap();
        let probs = model.predict_probabilities(&[0.5, 0.5]).unwrap();
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = LogisticRegression::new(2);
        assert!(matches!(
            model.predict_probabilities(&[0.0, 0.0]),
            Err(TabularError::NotTrained)
        ));
    }

    #[test]
    fn test_out_of_range_label_rejected() {
        let x = array![[0.0, 1.0]];
        let mut model = LogisticRegression::new(2);
        assert!(model.fit(x.view(), &[5]).is_err());
    }
}
