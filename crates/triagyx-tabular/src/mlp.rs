//! Shallow feed-forward network (one hidden ReLU layer, softmax output).

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::classifier::{softmax, Classifier};
use crate::error::{Result, TabularError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MlpWeights {
    w1: Array2<f64>, // (hidden, features)
    b1: Array1<f64>,
    w2: Array2<f64>, // (classes, hidden)
    b2: Array1<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpClassifier {
    n_classes: usize,
    hidden: usize,
    learning_rate: f64,
    epochs: usize,
    seed: u64,
    weights: Option<MlpWeights>,
}

impl MlpClassifier {
    pub fn new(n_classes: usize, seed: u64) -> Self {
        Self {
            n_classes,
            hidden: 32,
            learning_rate: 0.05,
            epochs: 400,
            seed,
            weights: None,
        }
    }

    fn init_weights(&self, n_features: usize) -> MlpWeights {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut xavier = |rows: usize, cols: usize| {
            let scale = (6.0 / (rows + cols) as f64).sqrt();
            Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-scale..scale))
        };
        MlpWeights {
            w1: xavier(self.hidden, n_features),
            b1: Array1::zeros(self.hidden),
            w2: xavier(self.n_classes, self.hidden),
            b2: Array1::zeros(self.n_classes),
        }
    }
}

impl Classifier for MlpClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: &[usize]) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(TabularError::Validation(
                "feature/label row count mismatch".to_string(),
            ));
        }
        if let Some(&bad) = y.iter().find(|&&c| c >= self.n_classes) {
            return Err(TabularError::Validation(format!(
                "label {} out of range for {} classes",
                bad, self.n_classes
            )));
        }

        let n = x.nrows();
        let mut w = self.init_weights(x.ncols());

        let mut targets = Array2::<f64>::zeros((n, self.n_classes));
        for (i, &c) in y.iter().enumerate() {
            targets[[i, c]] = 1.0;
        }

        for _ in 0..self.epochs {
            // Forward: H = relu(X·W1ᵀ + b1), P = softmax(H·W2ᵀ + b2).
            let pre_hidden = x.dot(&w.w1.t()) + &w.b1;
            let hidden = pre_hidden.mapv(|v| v.max(0.0));
            let mut probs = hidden.dot(&w.w2.t()) + &w.b2;
            for mut row in probs.rows_mut() {
                if let Some(slice) = row.as_slice_mut() {
                    softmax(slice);
                }
            }

            // Backward: cross-entropy gradient through softmax is (P - Y).
            let delta_out = (&probs - &targets) / n as f64; // (n, k)
            let grad_w2 = delta_out.t().dot(&hidden); // (k, hidden)
            let grad_b2 = delta_out.sum_axis(Axis(0));

            let mut delta_hidden = delta_out.dot(&w.w2); // (n, hidden)
            delta_hidden.zip_mut_with(&pre_hidden, |d, &z| {
                if z <= 0.0 {
                    *d = 0.0;
                }
            });
            let grad_w1 = delta_hidden.t().dot(&x); // (hidden, features)
            let grad_b1 = delta_hidden.sum_axis(Axis(0));

            w.w2 = w.w2 - self.learning_rate * &grad_w2;
            w.b2 = w.b2 - self.learning_rate * &grad_b2;
            w.w1 = w.w1 - self.learning_rate * &grad_w1;
            w.b1 = w.b1 - self.learning_rate * &grad_b1;
        }

        self.weights = Some(w);
        Ok(())
    }

    fn predict_probabilities(&self, row: &[f64]) -> Result<Vec<f64>> {
        let w = self.weights.as_ref().ok_or(TabularError::NotTrained)?;
        let input = Array1::from_vec(row.to_vec());
        let hidden = (w.w1.dot(&input) + &w.b1).mapv(|v| v.max(0.0));
        let logits = w.w2.dot(&hidden) + &w.b2;
        let mut probs = logits.to_vec();
        softmax(&mut probs);
        Ok(probs)
    }

    fn name(&self) -> &'static str {
        "mlp"
    }
}
