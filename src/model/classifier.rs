//! Multinomial logistic regression
//!
//! Deterministic full-batch gradient descent from a zero start, L2 penalty on
//! the weights only. Inputs are expected to be standardized.

use crate::error::{FitrecError, Result};
use serde::{Deserialize, Serialize};

/// Classifier identifier reported by model info
pub const CLASSIFIER_TYPE: &str = "softmax_regression";

/// Gradient descent settings
#[derive(Debug, Clone, Copy)]
pub struct FitParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    /// One row per class, one column per feature
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl SoftmaxClassifier {
    /// Fit on scaled rows with class indices in `0..n_classes`
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, params: FitParams) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(FitrecError::Retrain(format!(
                "Training data mismatch: {} rows, {} labels",
                x.len(),
                y.len()
            )));
        }
        if n_classes < 2 {
            return Err(FitrecError::Retrain(
                "Need at least two classes".to_string(),
            ));
        }
        if let Some(bad) = y.iter().find(|&&label| label >= n_classes) {
            return Err(FitrecError::Retrain(format!("Label index {} out of range", bad)));
        }

        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            return Err(FitrecError::Retrain("Ragged feature rows".to_string()));
        }

        let mut model = Self {
            weights: vec![vec![0.0; n_features]; n_classes],
            bias: vec![0.0; n_classes],
        };

        let n = x.len() as f64;
        for _ in 0..params.epochs {
            let mut grad_w = vec![vec![0.0; n_features]; n_classes];
            let mut grad_b = vec![0.0; n_classes];

            for (row, &label) in x.iter().zip(y) {
                let probs = model.predict_proba(row);
                for (k, p) in probs.iter().enumerate() {
                    let err = p - if k == label { 1.0 } else { 0.0 };
                    grad_b[k] += err / n;
                    for (g, v) in grad_w[k].iter_mut().zip(row) {
                        *g += err * v / n;
                    }
                }
            }

            for k in 0..n_classes {
                model.bias[k] -= params.learning_rate * grad_b[k];
                for j in 0..n_features {
                    let g = grad_w[k][j] + params.l2 * model.weights[k][j];
                    model.weights[k][j] -= params.learning_rate * g;
                }
            }
        }

        if !model.is_consistent() {
            return Err(FitrecError::Retrain(
                "Training diverged (non-finite weights)".to_string(),
            ));
        }

        Ok(model)
    }

    pub fn n_features(&self) -> usize {
        self.weights.first().map_or(0, |w| w.len())
    }

    pub fn n_classes(&self) -> usize {
        self.bias.len()
    }

    /// Class probabilities for one scaled row
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let logits: Vec<f64> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| b + w.iter().zip(row).map(|(a, v)| a * v).sum::<f64>())
            .collect();

        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / total).collect()
    }

    /// Index of the most probable class; ties go to the lowest index
    pub fn predict(&self, row: &[f64]) -> usize {
        let probs = self.predict_proba(row);
        let mut best = 0;
        for (k, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = k;
            }
        }
        best
    }

    pub(crate) fn is_consistent(&self) -> bool {
        let n_features = self.n_features();
        self.weights.len() == self.bias.len()
            && self.weights.iter().all(|w| w.len() == n_features)
            && self
                .weights
                .iter()
                .flatten()
                .chain(&self.bias)
                .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FitParams {
        FitParams {
            epochs: 300,
            learning_rate: 0.5,
            l2: 1e-4,
        }
    }

    #[test]
    fn test_separable_classes() {
        let x = vec![
            vec![-2.0, 0.0],
            vec![-1.5, 0.1],
            vec![1.5, 0.0],
            vec![2.0, -0.1],
            vec![0.0, 2.0],
            vec![0.1, 1.5],
        ];
        let y = vec![0, 0, 1, 1, 2, 2];
        let model = SoftmaxClassifier::fit(&x, &y, 3, params()).unwrap();

        assert_eq!(model.n_features(), 2);
        assert_eq!(model.n_classes(), 3);
        assert_eq!(model.predict(&[-2.0, 0.0]), 0);
        assert_eq!(model.predict(&[2.0, 0.0]), 1);
        assert_eq!(model.predict(&[0.0, 2.0]), 2);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let x = vec![vec![0.0], vec![1.0]];
        let model = SoftmaxClassifier::fit(&x, &[0, 1], 4, params()).unwrap();
        let total: f64 = model.predict_proba(&[0.5]).iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x = vec![vec![0.3, -1.0], vec![-0.7, 0.4], vec![1.1, 0.9]];
        let y = vec![0, 1, 2];
        let a = SoftmaxClassifier::fit(&x, &y, 3, params()).unwrap();
        let b = SoftmaxClassifier::fit(&x, &y, 3, params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_label_out_of_range() {
        let x = vec![vec![0.0]];
        assert!(SoftmaxClassifier::fit(&x, &[3], 3, params()).is_err());
    }
}
