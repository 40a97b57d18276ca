//! The published model artifact: classifier, scaler, labels and provenance.

use super::classifier::SoftmaxClassifier;
use super::scaler::StandardScaler;
use crate::error::{FitrecError, Result};
use crate::types::{FeatureVector, Goal, ProfileSnapshot, FEATURE_COUNT};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a generation was trained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingKind {
    /// First generation, fitted on the synthetic corpus
    Initial,
    /// Triggered automatically by accumulated feedback
    Feedback,
    /// Forced by an operator
    Manual,
}

impl std::fmt::Display for TrainingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainingKind::Initial => write!(f, "initial"),
            TrainingKind::Feedback => write!(f, "feedback"),
            TrainingKind::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProvenance {
    pub generation: String,
    pub kind: TrainingKind,
    pub trained_at: DateTime<Utc>,
    pub corpus_size: usize,
    pub new_samples: usize,
    pub historical_samples: usize,
    /// Valid feedback rows folded into the corpus so far
    pub feedback_watermark: usize,
}

/// Sortable generation directory name
pub fn new_generation_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.format("%Y%m%dT%H%M%S%.3fZ"), &suffix[..8])
}

/// Classifier and scaler fitted together, never mutated after construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationModel {
    pub labels: Vec<Goal>,
    pub scaler: StandardScaler,
    pub classifier: SoftmaxClassifier,
    pub provenance: ModelProvenance,
}

impl RecommendationModel {
    pub fn new(
        labels: Vec<Goal>,
        scaler: StandardScaler,
        classifier: SoftmaxClassifier,
        provenance: ModelProvenance,
    ) -> Result<Self> {
        let model = Self {
            labels,
            scaler,
            classifier,
            provenance,
        };
        model.validate()?;
        Ok(model)
    }

    /// Structural checks; a model read from disk must pass these before serving
    pub fn validate(&self) -> Result<()> {
        if self.scaler.n_features() != FEATURE_COUNT {
            return Err(FitrecError::Validation(format!(
                "Scaler expects {} features, need {}",
                self.scaler.n_features(),
                FEATURE_COUNT
            )));
        }
        if self.classifier.n_features() != FEATURE_COUNT {
            return Err(FitrecError::Validation(format!(
                "Classifier expects {} features, need {}",
                self.classifier.n_features(),
                FEATURE_COUNT
            )));
        }
        if self.classifier.n_classes() != self.labels.len() || self.labels.is_empty() {
            return Err(FitrecError::Validation(format!(
                "Classifier has {} classes for {} labels",
                self.classifier.n_classes(),
                self.labels.len()
            )));
        }
        if !self.scaler.is_consistent() || !self.classifier.is_consistent() {
            return Err(FitrecError::Validation(
                "Model parameters are inconsistent or non-finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn generation(&self) -> &str {
        &self.provenance.generation
    }

    /// Per-label probabilities for a profile
    pub fn predict_proba(&self, profile: &ProfileSnapshot) -> Vec<(Goal, f64)> {
        let scaled = self.scaler.transform(&profile.features());
        self.labels
            .iter()
            .copied()
            .zip(self.classifier.predict_proba(&scaled))
            .collect()
    }

    pub fn predict(&self, profile: &ProfileSnapshot) -> Goal {
        self.predict_features(&profile.features())
    }

    pub fn predict_features(&self, features: &FeatureVector) -> Goal {
        let scaled = self.scaler.transform(features);
        // validate() guarantees one label per class
        self.labels[self.classifier.predict(&scaled)]
    }
}
