// Recommender Configuration
//
// Defines the data location, feedback deduplication, retraining trigger
// thresholds and classifier training parameters. All thresholds are
// configuration; nothing in the retraining policy is hardwired.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main recommender configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitrecConfig {
    /// Root directory for feedback rows and model generations
    pub data_dir: PathBuf,

    /// Feedback store settings
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Retraining trigger policy
    #[serde(default)]
    pub retrain: RetrainConfig,

    /// Classifier and bootstrap settings
    #[serde(default)]
    pub training: TrainingConfig,
}

/// Feedback store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// A second rating for the same (user, program) inside this window is a duplicate
    #[serde(with = "serde_duration")]
    pub dedup_window: Duration,

    /// Salt mixed into the user hash
    pub user_hash_salt: String,

    /// Comments are truncated to this many characters
    pub max_comment_len: usize,
}

impl FeedbackConfig {
    /// Fresh random salt, 32 hex chars
    pub fn random_salt() -> String {
        let bytes: [u8; 16] = rand::random();
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(3600), // 1 hour
            user_hash_salt: String::new(),
            max_comment_len: 1000,
        }
    }
}

/// Retraining trigger policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainConfig {
    /// Minimum feedback rows accumulated since the last fold-in
    pub min_new_feedback: usize,

    /// Minimum time since the most recent retraining log entry
    #[serde(with = "serde_duration")]
    pub cooldown: Duration,

    /// Maximum retained corpus rows; oldest rows are evicted first
    pub corpus_cap: usize,

    /// A fold-in that leaves fewer rows than this is not trained on
    pub min_corpus_size: usize,

    /// Uncorrected feedback rated below this is not folded into the corpus
    pub min_uncorrected_rating: u8,

    /// Model generations kept on disk; the published one is never removed
    #[serde(default = "default_keep_generations")]
    pub keep_generations: usize,
}

fn default_keep_generations() -> usize {
    5
}

impl Default for RetrainConfig {
    fn default() -> Self {
        Self {
            min_new_feedback: 25,
            cooldown: Duration::from_secs(259200), // 3 days
            corpus_cap: 5000,
            min_corpus_size: 50,
            min_uncorrected_rating: 1,
            keep_generations: default_keep_generations(),
        }
    }
}

/// Classifier training and bootstrap corpus settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Full-batch gradient descent passes
    pub epochs: usize,

    pub learning_rate: f64,

    /// L2 penalty on the weights (not the biases)
    pub l2: f64,

    /// Synthetic rows generated at first startup
    pub bootstrap_samples: usize,

    pub bootstrap_seed: u64,

    /// Every goal label gets at least this many bootstrap rows
    pub min_samples_per_label: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 400,
            learning_rate: 0.5,
            l2: 1e-4,
            bootstrap_samples: 600,
            bootstrap_seed: 42,
            min_samples_per_label: 20,
        }
    }
}

// Custom serde module for Duration (serialize/deserialize as seconds)
mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl FitrecConfig {
    /// Default configuration rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            feedback: FeedbackConfig::default(),
            retrain: RetrainConfig::default(),
            training: TrainingConfig::default(),
        }
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: FitrecConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Path of the append-only feedback file
    pub fn feedback_path(&self) -> PathBuf {
        self.data_dir.join("feedback.jsonl")
    }

    /// Directory holding model generations, the pointer and the retrain log
    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "data_dir must not be empty".to_string(),
            ));
        }

        let retrain = &self.retrain;
        if retrain.min_new_feedback == 0 {
            return Err(ConfigError::ValidationError(
                "retrain.min_new_feedback must be at least 1".to_string(),
            ));
        }
        if retrain.min_corpus_size == 0 || retrain.corpus_cap < retrain.min_corpus_size {
            return Err(ConfigError::ValidationError(format!(
                "retrain.corpus_cap ({}) must be >= min_corpus_size ({}) and min_corpus_size must be positive",
                retrain.corpus_cap, retrain.min_corpus_size
            )));
        }
        if retrain.keep_generations == 0 {
            return Err(ConfigError::ValidationError(
                "retrain.keep_generations must be at least 1".to_string(),
            ));
        }
        if !(1..=5).contains(&retrain.min_uncorrected_rating) {
            return Err(ConfigError::ValidationError(
                "retrain.min_uncorrected_rating must be between 1 and 5".to_string(),
            ));
        }

        let training = &self.training;
        if training.epochs == 0 {
            return Err(ConfigError::ValidationError(
                "training.epochs must be at least 1".to_string(),
            ));
        }
        if !(training.learning_rate > 0.0 && training.learning_rate <= 10.0) {
            return Err(ConfigError::ValidationError(
                "training.learning_rate must be in (0, 10]".to_string(),
            ));
        }
        if !(training.l2 >= 0.0 && training.l2.is_finite()) {
            return Err(ConfigError::ValidationError(
                "training.l2 must be a non-negative number".to_string(),
            ));
        }

        let label_floor = crate::types::Goal::ALL.len() * training.min_samples_per_label;
        if training.bootstrap_samples < label_floor {
            return Err(ConfigError::ValidationError(format!(
                "training.bootstrap_samples must be at least {} (labels x min_samples_per_label)",
                label_floor
            )));
        }
        if training.bootstrap_samples > retrain.corpus_cap {
            return Err(ConfigError::ValidationError(
                "training.bootstrap_samples must not exceed retrain.corpus_cap".to_string(),
            ));
        }

        Ok(())
    }
}
