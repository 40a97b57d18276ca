//! Joint scaler + classifier fit on one corpus snapshot.

use super::artifact::{ModelProvenance, RecommendationModel};
use super::classifier::{FitParams, SoftmaxClassifier};
use super::corpus::TrainingCorpus;
use super::scaler::StandardScaler;
use crate::config::TrainingConfig;
use crate::error::{FitrecError, Result};
use crate::types::{FeatureVector, Goal};
use tracing::debug;

/// Fit a complete model. CPU-bound: call from a blocking thread.
pub fn fit_model(
    corpus: &TrainingCorpus,
    config: &TrainingConfig,
    provenance: ModelProvenance,
) -> Result<RecommendationModel> {
    corpus
        .validate()
        .map_err(|e| FitrecError::Retrain(format!("Invalid corpus: {}", e)))?;
    if corpus.is_empty() {
        return Err(FitrecError::Retrain("Corpus is empty".to_string()));
    }

    let labels: Vec<Goal> = Goal::ALL.to_vec();
    let features: Vec<FeatureVector> = corpus.rows().map(|r| r.features).collect();
    let targets = corpus
        .rows()
        .map(|r| {
            labels
                .iter()
                .position(|g| *g == r.label)
                .ok_or_else(|| FitrecError::Retrain(format!("Unknown label {}", r.label)))
        })
        .collect::<Result<Vec<usize>>>()?;

    let scaler = StandardScaler::fit(&features)?;
    let scaled: Vec<Vec<f64>> = features.iter().map(|f| scaler.transform(f)).collect();

    let classifier = SoftmaxClassifier::fit(
        &scaled,
        &targets,
        labels.len(),
        FitParams {
            epochs: config.epochs,
            learning_rate: config.learning_rate,
            l2: config.l2,
        },
    )?;

    debug!(
        "Fitted {} on {} rows (label counts {:?})",
        provenance.generation,
        corpus.len(),
        corpus.label_counts()
    );

    RecommendationModel::new(labels, scaler, classifier, provenance)
        .map_err(|e| FitrecError::Retrain(format!("Fitted model failed validation: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::artifact::TrainingKind;
    use crate::model::bootstrap::{CorpusSeeder, SyntheticSeeder};
    use crate::types::{ProfileSnapshot, Sex, FEATURE_COUNT};
    use chrono::Utc;

    fn provenance(corpus_size: usize) -> ModelProvenance {
        ModelProvenance {
            generation: "test".to_string(),
            kind: TrainingKind::Initial,
            trained_at: Utc::now(),
            corpus_size,
            new_samples: corpus_size,
            historical_samples: 0,
            feedback_watermark: 0,
        }
    }

    #[test]
    fn test_fit_on_bootstrap_corpus() {
        let config = TrainingConfig::default();
        let rows = SyntheticSeeder.seed(&config).unwrap();
        let corpus = TrainingCorpus::from_rows(5000, rows);
        let model = fit_model(&corpus, &config, provenance(corpus.len())).unwrap();

        assert_eq!(model.scaler.n_features(), FEATURE_COUNT);
        assert_eq!(model.classifier.n_features(), FEATURE_COUNT);
        assert_eq!(model.labels.len(), Goal::ALL.len());

        // clear-cut cases of the heuristic
        let heavy = ProfileSnapshot::new(40.0, 120.0, 170.0, Sex::Male);
        assert_eq!(model.predict(&heavy), Goal::WeightLoss);
    }

    #[test]
    fn test_empty_corpus_fails() {
        let corpus = TrainingCorpus::new(10);
        let err = fit_model(&corpus, &TrainingConfig::default(), provenance(0)).unwrap_err();
        assert!(matches!(err, FitrecError::Retrain(_)));
    }
}
