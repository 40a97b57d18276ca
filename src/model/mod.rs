//! Recommendation model
//!
//! # Architecture
//!
//! - **ModelManager**: owns the active model, runs the retrain trigger policy
//! - **ModelStore**: durable generations, the `CURRENT` pointer, the retrain log
//!   and the cross-process lock
//! - **TrainingCorpus**: capped sliding window of labelled rows
//! - **CorpusSeeder**: produces the first-generation corpus
//! - **StandardScaler** + **SoftmaxClassifier**: always fitted and swapped together

pub mod artifact;
pub mod bootstrap;
pub mod classifier;
pub mod corpus;
pub mod manager;
pub mod scaler;
pub mod store;
pub mod trainer;

pub use artifact::{ModelProvenance, RecommendationModel, TrainingKind};
pub use bootstrap::{CorpusSeeder, SyntheticSeeder};
pub use corpus::{CorpusRow, TrainingCorpus};
pub use manager::{
    ManagerState, ModelInfo, ModelManager, RetrainOutcome, RetrainSummary, SkipReason,
};
pub use store::{FsModelStore, ModelStore, PublishedGeneration, RetrainLock, RetrainLogEntry};
