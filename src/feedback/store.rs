//! Append-only JSONL feedback store.

use super::record::{FeedbackRecord, FeedbackSubmission, SubmitOutcome};
use crate::config::FeedbackConfig;
use crate::error::{FitrecError, Result};
use chrono::Utc;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

/// Lazy, finite stream of feedback rows
pub type FeedbackStream = Pin<Box<dyn Stream<Item = Result<FeedbackRecord>> + Send>>;

/// Aggregate numbers over the valid rows
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeedbackStats {
    pub count: usize,
    pub average_rating: Option<f64>,
}

/// Durable feedback sink backed by a single JSONL file
pub struct FeedbackStore {
    path: PathBuf,
    config: FeedbackConfig,
    // serializes duplicate check + append
    write_lock: Mutex<()>,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>, config: FeedbackConfig) -> Self {
        if config.user_hash_salt.is_empty() {
            warn!("feedback.user_hash_salt is empty, user hashes are unsalted");
        }
        Self {
            path: path.into(),
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate, deduplicate and append one rating
    pub async fn submit_feedback(&self, submission: &FeedbackSubmission) -> Result<SubmitOutcome> {
        submission.validate()?;

        let window = chrono::Duration::from_std(self.config.dedup_window)
            .map_err(|e| FitrecError::Other(format!("Invalid dedup window: {}", e)))?;

        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let record = FeedbackRecord::from_submission(
            submission,
            &self.config.user_hash_salt,
            self.config.max_comment_len,
            now,
        );

        let cutoff = now - window;
        let mut rows = self.load_feedback(true).await?;
        let mut previous_at = None;
        while let Some(row) = rows.next().await {
            let row = row?;
            if row.user_hash == record.user_hash
                && row.program_id == record.program_id
                && row.timestamp > cutoff
            {
                previous_at = Some(previous_at.map_or(row.timestamp, |p: chrono::DateTime<Utc>| {
                    p.max(row.timestamp)
                }));
            }
        }

        if let Some(previous_at) = previous_at {
            debug!(
                "Duplicate feedback for program {} (previous at {})",
                record.program_id, previous_at
            );
            return Ok(SubmitOutcome::Duplicate { previous_at });
        }

        self.append(&record).await?;
        info!(
            "Feedback recorded: {} rating={} program={}",
            record.id, record.rating, record.program_id
        );
        Ok(SubmitOutcome::Recorded(record))
    }

    async fn append(&self, record: &FeedbackRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                FitrecError::Persistence(format!("Failed to create feedback dir: {}", e))
            })?;
        }

        if self.has_torn_tail().await.map_err(|e| {
            FitrecError::Persistence(format!("Failed to inspect feedback file: {}", e))
        })? {
            warn!("Feedback file does not end with a newline, repairing before append");
            line.insert(0, '\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| FitrecError::Persistence(format!("Failed to open feedback file: {}", e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| FitrecError::Persistence(format!("Failed to append feedback: {}", e)))?;
        file.sync_data()
            .await
            .map_err(|e| FitrecError::Persistence(format!("Failed to sync feedback: {}", e)))?;

        Ok(())
    }

    /// True when the file is non-empty and its last byte is not a newline
    async fn has_torn_tail(&self) -> std::io::Result<bool> {
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        if file.metadata().await?.len() == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::End(-1)).await?;
        let last = file.read_u8().await?;
        Ok(last != b'\n')
    }

    /// Stream the stored rows, re-opening the file on every call
    ///
    /// With `valid_rows_only` malformed rows are skipped with a warning.
    /// Otherwise the first malformed row is yielded as an error and ends the
    /// stream.
    pub async fn load_feedback(&self, valid_rows_only: bool) -> Result<FeedbackStream> {
        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Box::pin(tokio_stream::empty::<Result<FeedbackRecord>>()));
            }
            Err(e) => {
                return Err(FitrecError::Persistence(format!(
                    "Failed to open feedback file: {}",
                    e
                )))
            }
        };

        let path = self.path.clone();
        let mut line_no = 0usize;
        let mut ended = false;
        let lines = LinesStream::new(BufReader::new(file).lines());
        let rows = lines.filter_map(move |line| {
            if ended {
                return None;
            }
            line_no += 1;

            let parsed = line
                .map_err(FitrecError::from)
                .and_then(|line| parse_row(&line));

            match parsed {
                Ok(None) => None,
                Ok(Some(record)) => Some(Ok(record)),
                Err(e) if valid_rows_only => {
                    warn!(
                        "Skipping malformed feedback row {} in {}: {}",
                        line_no,
                        path.display(),
                        e
                    );
                    None
                }
                Err(e) => {
                    ended = true;
                    Some(Err(FitrecError::Validation(format!(
                        "Malformed feedback row {}: {}",
                        line_no, e
                    ))))
                }
            }
        });

        Ok(Box::pin(rows))
    }

    /// Count and average rating over the valid rows
    pub async fn stats(&self) -> Result<FeedbackStats> {
        let mut rows = self.load_feedback(true).await?;
        let mut count = 0usize;
        let mut total = 0u64;
        while let Some(row) = rows.next().await {
            let row = row?;
            count += 1;
            total += u64::from(row.rating);
        }

        Ok(FeedbackStats {
            count,
            average_rating: (count > 0).then(|| total as f64 / count as f64),
        })
    }
}

fn parse_row(line: &str) -> Result<Option<FeedbackRecord>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let record: FeedbackRecord = serde_json::from_str(line)?;
    record.validate()?;
    Ok(Some(record))
}
