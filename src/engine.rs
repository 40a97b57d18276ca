//! Request-level flows: recommend, submit feedback, model info.

use crate::catalog::{BuiltinCatalog, Program, ProgramCatalog};
use crate::config::FitrecConfig;
use crate::error::{FitrecError, Result};
use crate::feedback::{FeedbackStore, FeedbackSubmission, SubmitOutcome};
use crate::model::{
    CorpusSeeder, FsModelStore, ModelInfo, ModelManager, ModelStore, RetrainOutcome,
    SyntheticSeeder,
};
use crate::types::{Goal, ProfileSnapshot};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What the dashboard shows for a profile
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// `None` when no model was available and the defaults were served
    pub goal: Option<Goal>,
    pub programs: Vec<Program>,
    pub generation: Option<String>,
}

impl Recommendation {
    pub fn is_fallback(&self) -> bool {
        self.goal.is_none()
    }
}

/// Model info plus feedback totals
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    #[serde(flatten)]
    pub model: ModelInfo,
    pub feedback_count: usize,
    pub average_rating: Option<f64>,
}

pub struct Recommender {
    feedback: Arc<FeedbackStore>,
    manager: ModelManager,
    catalog: Arc<dyn ProgramCatalog>,
}

impl Recommender {
    /// Open the data directory with the built-in catalog and filesystem model store
    pub async fn open(config: FitrecConfig) -> Result<Self> {
        let store = Arc::new(FsModelStore::new(config.model_dir()));
        Self::open_with(config, store, Arc::new(SyntheticSeeder), Arc::new(BuiltinCatalog)).await
    }

    /// Open with injected collaborators
    ///
    /// A manager that cannot initialize is not fatal: recommendations fall
    /// back to the default programs until a model becomes available.
    pub async fn open_with(
        config: FitrecConfig,
        store: Arc<dyn ModelStore>,
        seeder: Arc<dyn CorpusSeeder>,
        catalog: Arc<dyn ProgramCatalog>,
    ) -> Result<Self> {
        config.validate()?;
        tokio::fs::create_dir_all(&config.data_dir).await.map_err(|e| {
            FitrecError::Persistence(format!(
                "Failed to create data dir {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;

        let feedback = Arc::new(FeedbackStore::new(
            config.feedback_path(),
            config.feedback.clone(),
        ));
        let manager = ModelManager::new(&config, Arc::clone(&feedback), store, seeder);

        if let Err(e) = manager.initialize().await {
            error!("Model unavailable, serving default programs: {}", e);
        }

        Ok(Self {
            feedback,
            manager,
            catalog,
        })
    }

    pub fn manager(&self) -> &ModelManager {
        &self.manager
    }

    pub fn feedback_store(&self) -> &FeedbackStore {
        &self.feedback
    }

    /// Predicted goal and its programs, or the defaults if no model is available
    pub async fn recommend(&self, profile: &ProfileSnapshot) -> Result<Recommendation> {
        profile.validate()?;

        let model = match self.manager.current().await {
            Ok(model) => model,
            Err(FitrecError::ModelUnavailable(reason)) => {
                warn!("Serving default programs: {}", reason);
                return Ok(Recommendation {
                    goal: None,
                    programs: self.catalog.default_programs().to_vec(),
                    generation: None,
                });
            }
            Err(e) => return Err(e),
        };

        let goal = model.predict(profile);
        debug!("Recommended {} (generation {})", goal, model.generation());
        Ok(Recommendation {
            goal: Some(goal),
            programs: self.catalog.programs_for(goal).to_vec(),
            generation: Some(model.generation().to_string()),
        })
    }

    /// Record a rating, then give the retrain trigger a chance to run.
    /// The retrain outcome is only logged; it never fails the submission.
    pub async fn submit_feedback(&self, submission: &FeedbackSubmission) -> Result<SubmitOutcome> {
        if !self.catalog.contains(submission.program_id.trim()) {
            return Err(FitrecError::Validation(format!(
                "Unknown program: {}",
                submission.program_id
            )));
        }

        let outcome = self.feedback.submit_feedback(submission).await?;
        if outcome.is_recorded() {
            match self.manager.maybe_retrain(false).await {
                RetrainOutcome::Retrained(summary) => {
                    info!("Feedback triggered retrain: generation {}", summary.generation)
                }
                RetrainOutcome::Skipped(reason) => debug!("No retrain after feedback: {}", reason),
                RetrainOutcome::Failed(reason) => {
                    warn!("Retrain after feedback failed: {}", reason)
                }
            }
        }
        Ok(outcome)
    }

    pub async fn model_info(&self) -> Result<ModelReport> {
        let model = self.manager.info().await?;
        let stats = self.feedback.stats().await?;
        Ok(ModelReport {
            model,
            feedback_count: stats.count,
            average_rating: stats.average_rating,
        })
    }

    /// Administrative trigger
    pub async fn retrain(&self, force: bool) -> RetrainOutcome {
        self.manager.maybe_retrain(force).await
    }
}
