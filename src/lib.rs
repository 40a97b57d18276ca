//! Fitrec - Feedback-Driven Fitness Goal Recommender
//!
//! Recommends a training goal (and through it a list of programs) from four
//! personal fields, collects user ratings of those recommendations, and
//! periodically retrains the classifier on the accumulated feedback.
//!
//! # Architecture
//!
//! - **Feedback Store**: append-only, deduplicated, anonymized ratings
//! - **Model Manager**: owns the active model, decides when to retrain and
//!   swaps old for new atomically
//! - **Model Store**: immutable generation directories, a `CURRENT` pointer,
//!   the retrain log and a cross-process lock
//! - **Recommender**: request-level facade over the two plus the program catalog
//!
//! # Example
//!
//! ```ignore
//! use fitrec_core::{FitrecConfig, FeedbackSubmission, Goal, ProfileSnapshot, Recommender, Sex};
//!
//! #[tokio::main]
//! async fn main() -> fitrec_core::Result<()> {
//!     let recommender = Recommender::open(FitrecConfig::with_data_dir("/var/lib/fitrec")).await?;
//!
//!     let profile = ProfileSnapshot::new(29.0, 72.0, 178.0, Sex::Male);
//!     let rec = recommender.recommend(&profile).await?;
//!
//!     let submission = FeedbackSubmission::new("alice", profile, rec.programs[0].id, Goal::MuscleGain, 4);
//!     recommender.submit_feedback(&submission).await?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod model;
pub mod types;

pub use catalog::{BuiltinCatalog, Program, ProgramCatalog};
pub use config::{ConfigError, FeedbackConfig, FitrecConfig, RetrainConfig, TrainingConfig};
pub use engine::{ModelReport, Recommendation, Recommender};
pub use error::{FitrecError, Result};
pub use feedback::{FeedbackRecord, FeedbackStats, FeedbackStore, FeedbackSubmission, SubmitOutcome};
pub use model::{
    FsModelStore, ManagerState, ModelInfo, ModelManager, ModelStore, RecommendationModel,
    RetrainLogEntry, RetrainOutcome, RetrainSummary, SkipReason, TrainingKind,
};
pub use types::{FeatureVector, Goal, ProfileSnapshot, Sex, FEATURE_COUNT};
