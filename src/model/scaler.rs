//! Per-feature standardization fitted alongside the classifier.

use crate::error::{FitrecError, Result};
use crate::types::FeatureVector;
use serde::{Deserialize, Serialize};

/// Mean / standard deviation scaler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a corpus snapshot. A constant feature gets std 1 so it scales to 0.
    pub fn fit(rows: &[FeatureVector]) -> Result<Self> {
        let n_features = rows
            .first()
            .map(|row| row.values().len())
            .ok_or_else(|| FitrecError::Retrain("Cannot fit scaler on empty corpus".to_string()))?;

        let n = rows.len() as f64;
        let mut mean = vec![0.0; n_features];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.values()) {
                *m += v / n;
            }
        }

        let mut std = vec![0.0; n_features];
        for row in rows {
            for ((s, v), m) in std.iter_mut().zip(row.values()).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in std.iter_mut() {
            *s = s.sqrt();
            if !s.is_finite() || *s < 1e-12 {
                *s = 1.0;
            }
        }

        if mean.iter().any(|m| !m.is_finite()) {
            return Err(FitrecError::Retrain(
                "Scaler mean is not finite".to_string(),
            ));
        }

        Ok(Self { mean, std })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, features: &FeatureVector) -> Vec<f64> {
        features
            .values()
            .iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.mean.len() == self.std.len()
            && self.mean.iter().chain(&self.std).all(|v| v.is_finite())
            && self.std.iter().all(|s| *s > 0.0)
    }
}
