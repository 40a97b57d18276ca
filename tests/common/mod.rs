//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use fitrec_core::feedback::SubmitOutcome;
use fitrec_core::model::{
    FsModelStore, ModelStore, PublishedGeneration, RecommendationModel, RetrainLock,
    RetrainLogEntry, SyntheticSeeder, TrainingCorpus,
};
use fitrec_core::{
    error::Result, BuiltinCatalog, FeedbackStore, FeedbackSubmission, FitrecConfig, FitrecError,
    Goal, ProfileSnapshot, Recommender, Sex,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Default configuration rooted in a fresh temp dir
pub fn create_test_config() -> (FitrecConfig, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = FitrecConfig::with_data_dir(dir.path());
    (config, dir)
}

pub async fn create_test_recommender() -> (Recommender, TempDir) {
    let (config, dir) = create_test_config();
    let recommender = Recommender::open(config)
        .await
        .expect("Failed to open recommender");
    (recommender, dir)
}

/// Open with a store whose writes can be made to fail
pub async fn create_recommender_with_store(
    config: FitrecConfig,
    store: Arc<FailingStore>,
) -> Recommender {
    Recommender::open_with(
        config,
        store,
        Arc::new(SyntheticSeeder),
        Arc::new(BuiltinCatalog),
    )
    .await
    .expect("Failed to open recommender")
}

/// Young, lean male: the synthetic heuristic labels these `endurance`
pub fn lean_young_male(i: usize) -> ProfileSnapshot {
    let age = 20.0 + (i % 10) as f64;
    let height = 175.0 + (i % 15) as f64;
    let bmi = 17.0 + (i % 5) as f64 * 0.5;
    let h = height / 100.0;
    ProfileSnapshot::new(age, bmi * h * h, height, Sex::Male)
}

pub fn muscle_gain_correction(i: usize) -> FeedbackSubmission {
    FeedbackSubmission::new(
        format!("lifter{}", i),
        lean_young_male(i),
        "strength-split",
        Goal::Endurance,
        2,
    )
    .with_correction(Goal::MuscleGain)
}

/// Five-star rating whose user still says the goal should be muscle gain
pub fn five_star_muscle_gain(i: usize) -> FeedbackSubmission {
    FeedbackSubmission::new(
        format!("builder{}", i),
        lean_young_male(i),
        "hypertrophy-ppl",
        Goal::Endurance,
        5,
    )
    .with_correction(Goal::MuscleGain)
}

/// Append `n` distinct ratings straight to the feedback store
pub async fn submit_many(
    store: &FeedbackStore,
    n: usize,
    make: impl Fn(usize) -> FeedbackSubmission,
) {
    for i in 0..n {
        let outcome = store
            .submit_feedback(&make(i))
            .await
            .expect("Failed to submit feedback");
        assert!(matches!(outcome, SubmitOutcome::Recorded(_)));
    }
}

/// Model store wrapper with switchable failures
pub struct FailingStore {
    pub inner: FsModelStore,
    pub fail_load: AtomicBool,
    pub fail_persist: AtomicBool,
    pub fail_publish: AtomicBool,
}

impl FailingStore {
    pub fn new(config: &FitrecConfig) -> Self {
        Self {
            inner: FsModelStore::new(config.model_dir()),
            fail_load: AtomicBool::new(false),
            fail_persist: AtomicBool::new(false),
            fail_publish: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ModelStore for FailingStore {
    async fn load_current(&self) -> Result<Option<PublishedGeneration>> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(FitrecError::Persistence("injected load failure".to_string()));
        }
        self.inner.load_current().await
    }

    async fn persist_generation(
        &self,
        model: &RecommendationModel,
        corpus: &TrainingCorpus,
    ) -> Result<()> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(FitrecError::Persistence("injected persist failure".to_string()));
        }
        self.inner.persist_generation(model, corpus).await
    }

    async fn publish(&self, generation: &str) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(FitrecError::Persistence("injected publish failure".to_string()));
        }
        self.inner.publish(generation).await
    }

    async fn prune_generations(&self, keep: usize) -> Result<usize> {
        self.inner.prune_generations(keep).await
    }

    async fn append_log(&self, entry: &RetrainLogEntry) -> Result<()> {
        self.inner.append_log(entry).await
    }

    async fn read_log(&self) -> Result<Vec<RetrainLogEntry>> {
        self.inner.read_log().await
    }

    async fn lock(&self) -> Result<RetrainLock> {
        self.inner.lock().await
    }

    async fn try_lock(&self) -> Result<Option<RetrainLock>> {
        self.inner.try_lock().await
    }
}
