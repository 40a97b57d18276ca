//! Feedback store
//!
//! Append-only record of user ratings tied to a recommendation event. The
//! store is a pure data sink: it never triggers retraining itself.
//!
//! # Privacy
//!
//! - Usernames are never written; rows carry a salted SHA-256 hash (16 chars)
//! - Profile fields are a snapshot at rating time, not a live reference
//! - Comments are trimmed and bounded

pub mod record;
pub mod store;

pub use record::{anonymize_user, FeedbackRecord, FeedbackSubmission, SubmitOutcome};
pub use store::{FeedbackStats, FeedbackStore, FeedbackStream};
