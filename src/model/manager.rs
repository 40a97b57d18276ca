// Recommendation Model Manager
//
// Owns the active model and decides when it is retrained. Readers clone the
// active Arc once per prediction; a retrain fits a complete new model off to
// the side, persists and publishes it, and only then replaces the pointer.

use super::artifact::{new_generation_id, ModelProvenance, RecommendationModel, TrainingKind};
use super::bootstrap::{CorpusSeeder, SyntheticSeeder};
use super::classifier::CLASSIFIER_TYPE;
use super::corpus::{CorpusRow, TrainingCorpus};
use super::store::{FsModelStore, ModelStore, PublishedGeneration, RetrainLogEntry};
use super::trainer::fit_model;
use crate::config::{FitrecConfig, RetrainConfig, TrainingConfig};
use crate::error::{FitrecError, Result};
use crate::feedback::{FeedbackRecord, FeedbackStore};
use crate::types::{Goal, ProfileSnapshot, FEATURE_COUNT};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

const UNINITIALIZED: u8 = 0;
const READY: u8 = 1;
const RETRAINING: u8 = 2;

/// Lifecycle of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    Uninitialized,
    Ready,
    Retraining,
}

impl ManagerState {
    fn from_tag(tag: u8) -> Self {
        match tag {
            READY => ManagerState::Ready,
            RETRAINING => ManagerState::Retraining,
            _ => ManagerState::Uninitialized,
        }
    }
}

impl std::fmt::Display for ManagerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerState::Uninitialized => write!(f, "uninitialized"),
            ManagerState::Ready => write!(f, "ready"),
            ManagerState::Retraining => write!(f, "retraining"),
        }
    }
}

/// Why a retrain did not run
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NotInitialized,
    /// Another retrain is in flight in this process
    AlreadyRunning,
    /// Another process holds the retrain lock
    LockBusy,
    NotEnoughFeedback { new_rows: usize, required: usize },
    Cooldown { remaining: Duration },
    CorpusTooSmall { size: usize, required: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotInitialized => write!(f, "model manager not initialized"),
            SkipReason::AlreadyRunning => write!(f, "a retrain is already running"),
            SkipReason::LockBusy => write!(f, "another process holds the retrain lock"),
            SkipReason::NotEnoughFeedback { new_rows, required } => {
                write!(f, "{} new feedback rows, need {}", new_rows, required)
            }
            SkipReason::Cooldown { remaining } => {
                write!(f, "cooldown active for another {}s", remaining.as_secs())
            }
            SkipReason::CorpusTooSmall { size, required } => {
                write!(f, "corpus has {} rows, need {}", size, required)
            }
        }
    }
}

/// What a successful retrain produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrainSummary {
    pub generation: String,
    pub previous_generation: String,
    pub kind: TrainingKind,
    pub trained_at: DateTime<Utc>,
    pub corpus_size: usize,
    pub new_samples: usize,
    pub historical_samples: usize,
    pub evicted: usize,
    /// Rows past the watermark that were dropped by the rating filter
    pub filtered: usize,
    pub feedback_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetrainOutcome {
    Skipped(SkipReason),
    Retrained(RetrainSummary),
    Failed(String),
}

/// Snapshot of the active model for operators
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub state: ManagerState,
    pub classifier_type: &'static str,
    pub feature_count: usize,
    pub labels: Vec<Goal>,
    pub generation: Option<String>,
    pub kind: Option<TrainingKind>,
    pub trained_at: Option<DateTime<Utc>>,
    pub corpus_size: Option<usize>,
    pub feedback_watermark: Option<usize>,
    pub last_retrain: Option<DateTime<Utc>>,
}

/// Resets the state tag when a retrain ends, however it ends
struct RetrainingGuard<'a>(&'a AtomicU8);

impl Drop for RetrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(READY, Ordering::SeqCst);
    }
}

pub struct ModelManager {
    retrain: RetrainConfig,
    training: TrainingConfig,
    feedback: Arc<FeedbackStore>,
    store: Arc<dyn ModelStore>,
    seeder: Arc<dyn CorpusSeeder>,
    state: AtomicU8,
    active: RwLock<Option<Arc<RecommendationModel>>>,
}

impl ModelManager {
    pub fn new(
        config: &FitrecConfig,
        feedback: Arc<FeedbackStore>,
        store: Arc<dyn ModelStore>,
        seeder: Arc<dyn CorpusSeeder>,
    ) -> Self {
        Self {
            retrain: config.retrain.clone(),
            training: config.training.clone(),
            feedback,
            store,
            seeder,
            state: AtomicU8::new(UNINITIALIZED),
            active: RwLock::new(None),
        }
    }

    /// Filesystem store under `config.model_dir()` and the synthetic seeder
    pub fn from_config(config: &FitrecConfig, feedback: Arc<FeedbackStore>) -> Self {
        Self::new(
            config,
            feedback,
            Arc::new(FsModelStore::new(config.model_dir())),
            Arc::new(SyntheticSeeder),
        )
    }

    pub fn state(&self) -> ManagerState {
        ManagerState::from_tag(self.state.load(Ordering::SeqCst))
    }

    /// Load the published generation, bootstrapping one if none exists
    pub async fn initialize(&self) -> Result<()> {
        if self.state() != ManagerState::Uninitialized {
            return Ok(());
        }

        let published = self.store.load_current().await.map_err(|e| {
            FitrecError::ModelUnavailable(format!("Failed to load published model: {}", e))
        })?;

        match published {
            Some(generation) => {
                info!(
                    "Serving model generation {} ({} rows)",
                    generation.model.generation(),
                    generation.corpus.len()
                );
                self.install(generation.model).await;
                self.state.store(READY, Ordering::SeqCst);
                Ok(())
            }
            None => self.bootstrap().await,
        }
    }

    /// Fit and publish the first generation from the seeded corpus
    pub async fn bootstrap(&self) -> Result<()> {
        let _lock = self
            .store
            .lock()
            .await
            .map_err(|e| FitrecError::ModelUnavailable(e.to_string()))?;

        // another process may have bootstrapped while we waited
        if let Some(generation) = self
            .store
            .load_current()
            .await
            .map_err(|e| FitrecError::ModelUnavailable(e.to_string()))?
        {
            debug!(
                "Adopting generation {} published by another process",
                generation.model.generation()
            );
            self.install(generation.model).await;
            self.state.store(READY, Ordering::SeqCst);
            return Ok(());
        }

        let seeder = Arc::clone(&self.seeder);
        let training = self.training.clone();
        let cap = self.retrain.corpus_cap;
        let (model, corpus) = tokio::task::spawn_blocking(move || {
            let rows = seeder.seed(&training)?;
            let corpus = TrainingCorpus::from_rows(cap, rows);
            let now = Utc::now();
            let provenance = ModelProvenance {
                generation: new_generation_id(now),
                kind: TrainingKind::Initial,
                trained_at: now,
                corpus_size: corpus.len(),
                new_samples: corpus.len(),
                historical_samples: 0,
                feedback_watermark: 0,
            };
            let model = fit_model(&corpus, &training, provenance)?;
            Ok::<_, FitrecError>((model, corpus))
        })
        .await
        .map_err(|e| FitrecError::ModelUnavailable(format!("Bootstrap task failed: {}", e)))?
        .map_err(|e| FitrecError::ModelUnavailable(format!("Bootstrap fit failed: {}", e)))?;

        self.store
            .persist_generation(&model, &corpus)
            .await
            .map_err(|e| FitrecError::ModelUnavailable(e.to_string()))?;
        self.store
            .publish(model.generation())
            .await
            .map_err(|e| FitrecError::ModelUnavailable(e.to_string()))?;

        let entry = log_entry(&model, 0);
        info!(
            "Bootstrapped model generation {} on {} synthetic rows",
            model.generation(),
            corpus.len()
        );
        self.install(model).await;
        self.state.store(READY, Ordering::SeqCst);

        if let Err(e) = self.store.append_log(&entry).await {
            warn!("Failed to record bootstrap in retrain log: {}", e);
        }
        Ok(())
    }

    /// Retry a failed startup load; `false` while the model is still unavailable
    async fn try_initialize(&self) -> bool {
        if self.state() != ManagerState::Uninitialized {
            return true;
        }
        match self.initialize().await {
            Ok(()) => {
                info!("Model manager recovered, state {}", self.state());
                true
            }
            Err(e) => {
                warn!("Model manager still uninitialized: {}", e);
                false
            }
        }
    }

    /// Snapshot of the active model, initializing first if startup failed
    pub async fn current(&self) -> Result<Arc<RecommendationModel>> {
        if self.state() == ManagerState::Uninitialized {
            self.initialize().await?;
        }
        self.active
            .read()
            .await
            .clone()
            .ok_or_else(|| FitrecError::ModelUnavailable("no active model".to_string()))
    }

    pub async fn predict(&self, profile: &ProfileSnapshot) -> Result<Goal> {
        profile.validate()?;
        let model = self.current().await?;
        Ok(model.predict(profile))
    }

    /// Per-label probabilities, from the same snapshot `predict` would use
    pub async fn predict_proba(&self, profile: &ProfileSnapshot) -> Result<Vec<(Goal, f64)>> {
        profile.validate()?;
        let model = self.current().await?;
        Ok(model.predict_proba(profile))
    }

    /// Retrain if enough feedback has accumulated and the cooldown has passed.
    /// `force` skips both thresholds but still respects the retrain locks.
    pub async fn maybe_retrain(&self, force: bool) -> RetrainOutcome {
        match self.state() {
            ManagerState::Uninitialized => {
                if !self.try_initialize().await {
                    return RetrainOutcome::Skipped(SkipReason::NotInitialized);
                }
            }
            ManagerState::Retraining => return RetrainOutcome::Skipped(SkipReason::AlreadyRunning),
            ManagerState::Ready => {}
        }

        if !force {
            match self.trigger_check(None).await {
                Ok(Some(reason)) => {
                    debug!("Retrain skipped: {}", reason);
                    return RetrainOutcome::Skipped(reason);
                }
                Ok(None) => {}
                Err(e) => return self.failed(e),
            }
        }

        if self
            .state
            .compare_exchange(READY, RETRAINING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return RetrainOutcome::Skipped(SkipReason::AlreadyRunning);
        }
        let _guard = RetrainingGuard(&self.state);

        match self.retrain_locked(force).await {
            Ok(outcome) => outcome,
            Err(e) => self.failed(e),
        }
    }

    fn failed(&self, e: FitrecError) -> RetrainOutcome {
        error!("Retrain failed, previous model keeps serving: {}", e);
        RetrainOutcome::Failed(e.to_string())
    }

    /// `None` when both thresholds hold. `watermark` overrides the active model's.
    async fn trigger_check(&self, watermark: Option<usize>) -> Result<Option<SkipReason>> {
        let active = self.current().await?;
        let watermark = watermark.unwrap_or(active.provenance.feedback_watermark);

        let feedback_rows = self.feedback.stats().await?.count;
        let new_rows = feedback_rows.saturating_sub(watermark);
        if new_rows < self.retrain.min_new_feedback {
            return Ok(Some(SkipReason::NotEnoughFeedback {
                new_rows,
                required: self.retrain.min_new_feedback,
            }));
        }

        let last = self
            .store
            .read_log()
            .await?
            .iter()
            .map(|entry| entry.timestamp)
            .max()
            .unwrap_or(active.provenance.trained_at);
        let cooldown = chrono::Duration::from_std(self.retrain.cooldown)
            .map_err(|e| FitrecError::Other(format!("Invalid cooldown: {}", e)))?;
        let elapsed = Utc::now().signed_duration_since(last);
        if elapsed < cooldown {
            let remaining = (cooldown - elapsed).to_std().unwrap_or(Duration::ZERO);
            return Ok(Some(SkipReason::Cooldown { remaining }));
        }

        Ok(None)
    }

    async fn retrain_locked(&self, force: bool) -> Result<RetrainOutcome> {
        let _lock = match self.store.try_lock().await? {
            Some(lock) => lock,
            None => {
                warn!("Retrain lock held by another process, skipping");
                return Ok(RetrainOutcome::Skipped(SkipReason::LockBusy));
            }
        };

        let PublishedGeneration { model: published, mut corpus } =
            self.store.load_current().await?.ok_or_else(|| {
                FitrecError::Retrain("no published generation to retrain from".to_string())
            })?;

        let active = self.current().await?;
        if published.generation() != active.generation() {
            info!(
                "Adopting generation {} published by another process",
                published.generation()
            );
            self.install(published.clone()).await;
        }

        let watermark = published.provenance.feedback_watermark;
        if !force {
            if let Some(reason) = self.trigger_check(Some(watermark)).await? {
                return Ok(RetrainOutcome::Skipped(reason));
            }
        }

        let records = self.collect_feedback().await?;
        let feedback_rows = records.len();
        let pending = records.into_iter().skip(watermark);
        let (rows, filtered) = self.to_corpus_rows(pending);

        let mut evicted = corpus.set_cap(self.retrain.corpus_cap);
        let kept = rows.len();
        evicted += corpus.append(rows);

        if corpus.len() < self.retrain.min_corpus_size {
            return Ok(RetrainOutcome::Skipped(SkipReason::CorpusTooSmall {
                size: corpus.len(),
                required: self.retrain.min_corpus_size,
            }));
        }

        let now = Utc::now();
        let new_samples = kept.min(corpus.len());
        let provenance = ModelProvenance {
            generation: new_generation_id(now),
            kind: if force {
                TrainingKind::Manual
            } else {
                TrainingKind::Feedback
            },
            trained_at: now,
            corpus_size: corpus.len(),
            new_samples,
            historical_samples: corpus.len() - new_samples,
            feedback_watermark: feedback_rows,
        };

        let training = self.training.clone();
        let (model, corpus) = tokio::task::spawn_blocking(move || {
            let model = fit_model(&corpus, &training, provenance)?;
            Ok::<_, FitrecError>((model, corpus))
        })
        .await
        .map_err(|e| FitrecError::Retrain(format!("Training task failed: {}", e)))??;

        self.store.persist_generation(&model, &corpus).await?;
        self.store.publish(model.generation()).await?;

        let summary = RetrainSummary {
            generation: model.generation().to_string(),
            previous_generation: published.generation().to_string(),
            kind: model.provenance.kind,
            trained_at: model.provenance.trained_at,
            corpus_size: model.provenance.corpus_size,
            new_samples: model.provenance.new_samples,
            historical_samples: model.provenance.historical_samples,
            evicted,
            filtered,
            feedback_rows,
        };
        let entry = log_entry(&model, feedback_rows);
        self.install(model).await;

        info!(
            "Retrained ({}) generation {} -> {}: {} rows, {} new, {} evicted",
            summary.kind,
            summary.previous_generation,
            summary.generation,
            summary.corpus_size,
            summary.new_samples,
            summary.evicted
        );

        if let Err(e) = self.store.append_log(&entry).await {
            warn!("Generation {} published but not logged: {}", entry.generation, e);
        }

        match self.store.prune_generations(self.retrain.keep_generations).await {
            Ok(0) => {}
            Ok(removed) => debug!("Pruned {} old model generations", removed),
            Err(e) => warn!("Failed to prune old model generations: {}", e),
        }

        Ok(RetrainOutcome::Retrained(summary))
    }

    async fn collect_feedback(&self) -> Result<Vec<FeedbackRecord>> {
        let mut stream = self.feedback.load_feedback(true).await?;
        let mut records = Vec::new();
        while let Some(record) = stream.next().await {
            records.push(record?);
        }
        Ok(records)
    }

    /// Corrected label wins; uncorrected rows rated below the threshold are dropped
    fn to_corpus_rows(&self, records: impl Iterator<Item = FeedbackRecord>) -> (Vec<CorpusRow>, usize) {
        let mut rows = Vec::new();
        let mut filtered = 0;
        for record in records {
            if record.corrected_goal.is_none() && record.rating < self.retrain.min_uncorrected_rating {
                filtered += 1;
                continue;
            }
            rows.push(CorpusRow::new(record.profile().features(), record.label()));
        }
        (rows, filtered)
    }

    async fn install(&self, model: RecommendationModel) {
        *self.active.write().await = Some(Arc::new(model));
    }

    pub async fn info(&self) -> Result<ModelInfo> {
        let state = self.state();
        let active = self.active.read().await.clone();
        let last_retrain = self
            .store
            .read_log()
            .await?
            .iter()
            .map(|entry| entry.timestamp)
            .max();

        Ok(ModelInfo {
            state,
            classifier_type: CLASSIFIER_TYPE,
            feature_count: FEATURE_COUNT,
            labels: active
                .as_ref()
                .map_or_else(|| Goal::ALL.to_vec(), |m| m.labels.clone()),
            generation: active.as_ref().map(|m| m.generation().to_string()),
            kind: active.as_ref().map(|m| m.provenance.kind),
            trained_at: active.as_ref().map(|m| m.provenance.trained_at),
            corpus_size: active.as_ref().map(|m| m.provenance.corpus_size),
            feedback_watermark: active.as_ref().map(|m| m.provenance.feedback_watermark),
            last_retrain,
        })
    }

    /// Retraining log, oldest first
    pub async fn history(&self) -> Result<Vec<RetrainLogEntry>> {
        self.store.read_log().await
    }
}

fn log_entry(model: &RecommendationModel, feedback_rows: usize) -> RetrainLogEntry {
    RetrainLogEntry {
        timestamp: model.provenance.trained_at,
        kind: model.provenance.kind,
        generation: model.generation().to_string(),
        corpus_size: model.provenance.corpus_size,
        new_samples: model.provenance.new_samples,
        feedback_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sex;
    use tempfile::TempDir;

    fn create_test_manager() -> (ModelManager, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = FitrecConfig::with_data_dir(dir.path());
        let feedback = Arc::new(FeedbackStore::new(
            config.feedback_path(),
            config.feedback.clone(),
        ));
        (ModelManager::from_config(&config, feedback), dir)
    }

    #[tokio::test]
    async fn test_unreadable_store_is_unavailable() {
        let (manager, dir) = create_test_manager();
        let profile = ProfileSnapshot::new(30.0, 70.0, 175.0, Sex::Male);

        // a plain file where the model directory should be
        let models = FitrecConfig::with_data_dir(dir.path()).model_dir();
        std::fs::write(&models, b"not a directory").unwrap();

        assert_eq!(manager.state(), ManagerState::Uninitialized);
        assert!(matches!(
            manager.predict(&profile).await,
            Err(FitrecError::ModelUnavailable(_))
        ));
        assert_eq!(
            manager.maybe_retrain(true).await,
            RetrainOutcome::Skipped(SkipReason::NotInitialized)
        );
        assert_eq!(manager.state(), ManagerState::Uninitialized);
    }

    #[tokio::test]
    async fn test_recovers_once_store_is_readable() {
        let (manager, dir) = create_test_manager();
        let profile = ProfileSnapshot::new(30.0, 70.0, 175.0, Sex::Male);

        let models = FitrecConfig::with_data_dir(dir.path()).model_dir();
        std::fs::write(&models, b"not a directory").unwrap();
        assert!(manager.initialize().await.is_err());
        assert_eq!(manager.state(), ManagerState::Uninitialized);

        std::fs::remove_file(&models).unwrap();
        assert!(manager.predict(&profile).await.is_ok());
        assert_eq!(manager.state(), ManagerState::Ready);
        assert_eq!(manager.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_bootstraps_once() {
        let (manager, dir) = create_test_manager();
        manager.initialize().await.unwrap();
        assert_eq!(manager.state(), ManagerState::Ready);

        let history = manager.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, TrainingKind::Initial);

        // a second manager over the same directory adopts the published generation
        let config = FitrecConfig::with_data_dir(dir.path());
        let feedback = Arc::new(FeedbackStore::new(
            config.feedback_path(),
            config.feedback.clone(),
        ));
        let other = ModelManager::from_config(&config, feedback);
        other.initialize().await.unwrap();

        assert_eq!(
            manager.current().await.unwrap().generation(),
            other.current().await.unwrap().generation()
        );
        assert_eq!(other.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_info_reports_active_generation() {
        let (manager, _dir) = create_test_manager();
        manager.initialize().await.unwrap();
        let info = manager.info().await.unwrap();

        assert_eq!(info.state, ManagerState::Ready);
        assert_eq!(info.classifier_type, CLASSIFIER_TYPE);
        assert_eq!(info.feature_count, 5);
        assert_eq!(info.labels.len(), 5);
        assert_eq!(info.kind, Some(TrainingKind::Initial));
        assert_eq!(info.corpus_size, Some(600));
        assert!(info.last_retrain.is_some());
    }

    #[tokio::test]
    async fn test_no_feedback_skips_retrain() {
        let (manager, _dir) = create_test_manager();
        manager.initialize().await.unwrap();

        match manager.maybe_retrain(false).await {
            RetrainOutcome::Skipped(SkipReason::NotEnoughFeedback { new_rows, required }) => {
                assert_eq!(new_rows, 0);
                assert_eq!(required, 25);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(manager.state(), ManagerState::Ready);
    }
}
