//! Feedback rows and the submissions they are built from.

use crate::error::{FitrecError, Result};
use crate::types::{bmi, Goal, ProfileSnapshot, Sex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of the stored user hash (hex chars)
pub const USER_HASH_LEN: usize = 16;

/// A rating as submitted by the dashboard, before anonymization
#[derive(Debug, Clone)]
pub struct FeedbackSubmission {
    pub username: String,
    pub profile: ProfileSnapshot,
    pub program_id: String,
    pub recommended_goal: Goal,
    pub rating: u8,
    pub corrected_goal: Option<Goal>,
    pub comment: String,
}

impl FeedbackSubmission {
    pub fn new(
        username: impl Into<String>,
        profile: ProfileSnapshot,
        program_id: impl Into<String>,
        recommended_goal: Goal,
        rating: u8,
    ) -> Self {
        Self {
            username: username.into(),
            profile,
            program_id: program_id.into(),
            recommended_goal,
            rating,
            corrected_goal: None,
            comment: String::new(),
        }
    }

    pub fn with_correction(mut self, goal: Goal) -> Self {
        self.corrected_goal = Some(goal);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Check everything the store can check without touching disk
    pub fn validate(&self) -> Result<()> {
        validate_rating(self.rating)?;
        self.profile.validate()?;
        if self.program_id.trim().is_empty() {
            return Err(FitrecError::Validation(
                "program_id must not be empty".to_string(),
            ));
        }
        if self.username.trim().is_empty() {
            return Err(FitrecError::Validation(
                "username must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One persisted rating, immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_hash: String,
    pub age: f64,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub sex: Sex,
    pub bmi: f64,
    pub program_id: String,
    pub recommended_goal: Goal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_goal: Option<Goal>,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl FeedbackRecord {
    /// Build a record from a validated submission
    pub fn from_submission(
        submission: &FeedbackSubmission,
        salt: &str,
        max_comment_len: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let profile = submission.profile;
        Self {
            id: Uuid::new_v4(),
            timestamp,
            user_hash: anonymize_user(salt, &submission.username),
            age: profile.age,
            weight_kg: profile.weight_kg,
            height_cm: profile.height_cm,
            sex: profile.sex,
            bmi: profile.bmi(),
            program_id: submission.program_id.trim().to_string(),
            recommended_goal: submission.recommended_goal,
            corrected_goal: submission.corrected_goal,
            rating: submission.rating,
            comment: bound_comment(&submission.comment, max_comment_len),
        }
    }

    /// Training target: the user's correction wins over what was recommended
    pub fn label(&self) -> Goal {
        self.corrected_goal.unwrap_or(self.recommended_goal)
    }

    pub fn profile(&self) -> ProfileSnapshot {
        ProfileSnapshot::new(self.age, self.weight_kg, self.height_cm, self.sex)
    }

    /// Row-level checks applied when reading the file back
    pub fn validate(&self) -> Result<()> {
        validate_rating(self.rating)?;
        self.profile().validate()?;
        if !self.bmi.is_finite() || (self.bmi - bmi(self.weight_kg, self.height_cm)).abs() > 1e-6 {
            return Err(FitrecError::Validation(format!(
                "bmi {} does not match weight and height",
                self.bmi
            )));
        }
        if self.user_hash.len() != USER_HASH_LEN || self.program_id.is_empty() {
            return Err(FitrecError::Validation(
                "user_hash or program_id malformed".to_string(),
            ));
        }
        Ok(())
    }
}

/// Anonymized user identifier: SHA-256 of salt and username, first 16 hex chars
pub fn anonymize_user(salt: &str, username: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(username.trim().as_bytes());
    let digest = hasher.finalize();
    digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .chars()
        .take(USER_HASH_LEN)
        .collect()
}

fn validate_rating(rating: u8) -> Result<()> {
    if !(1..=5).contains(&rating) {
        return Err(FitrecError::Validation(format!(
            "rating must be between 1 and 5, got {}",
            rating
        )));
    }
    Ok(())
}

fn bound_comment(comment: &str, max_len: usize) -> String {
    comment.trim().chars().take(max_len).collect()
}

/// Result of a submission: stored, or rejected as a repeat
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Recorded(FeedbackRecord),
    Duplicate { previous_at: DateTime<Utc> },
}

impl SubmitOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, SubmitOutcome::Recorded(_))
    }
}
