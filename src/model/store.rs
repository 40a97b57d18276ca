//! Durable model generations
//!
//! Layout under the model directory:
//!
//! ```text
//! retrain.lock                  advisory lock, one retrain at a time
//! CURRENT                       name of the published generation
//! retrain_log.jsonl             one line per completed training
//! generations/<id>/model.json   classifier + scaler + labels + provenance
//! generations/<id>/corpus.json  corpus snapshot the model was fitted on
//! ```
//!
//! Every file is written to a temporary path, synced and renamed into place.
//! A generation directory is assembled under a hidden name and renamed as a
//! whole, so it is never observed half-written.

use super::artifact::{RecommendationModel, TrainingKind};
use super::corpus::TrainingCorpus;
use crate::error::{FitrecError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const POINTER_FILE: &str = "CURRENT";
const LOCK_FILE: &str = "retrain.lock";
const LOG_FILE: &str = "retrain_log.jsonl";
const GENERATIONS_DIR: &str = "generations";
const MODEL_FILE: &str = "model.json";
const CORPUS_FILE: &str = "corpus.json";

/// One completed training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrainLogEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: TrainingKind,
    pub generation: String,
    pub corpus_size: usize,
    pub new_samples: usize,
    pub feedback_rows: usize,
}

/// The published model together with the corpus it was fitted on
#[derive(Debug, Clone)]
pub struct PublishedGeneration {
    pub model: RecommendationModel,
    pub corpus: TrainingCorpus,
}

/// Held while a process trains or publishes; released on drop
pub struct RetrainLock {
    _flock: Flock<File>,
}

/// Where model generations live
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// The generation `CURRENT` points at, if any
    async fn load_current(&self) -> Result<Option<PublishedGeneration>>;

    /// Write an immutable generation directory (not yet published)
    async fn persist_generation(
        &self,
        model: &RecommendationModel,
        corpus: &TrainingCorpus,
    ) -> Result<()>;

    /// Atomically point `CURRENT` at a persisted generation
    async fn publish(&self, generation: &str) -> Result<()>;

    /// Delete the oldest generations beyond `keep`, never the published one.
    /// Returns how many were removed.
    async fn prune_generations(&self, keep: usize) -> Result<usize>;

    async fn append_log(&self, entry: &RetrainLogEntry) -> Result<()>;

    async fn read_log(&self) -> Result<Vec<RetrainLogEntry>>;

    /// Wait for the cross-process retrain lock
    async fn lock(&self) -> Result<RetrainLock>;

    /// Take the cross-process retrain lock if free
    async fn try_lock(&self) -> Result<Option<RetrainLock>>;
}

/// Filesystem-backed model store
#[derive(Debug, Clone)]
pub struct FsModelStore {
    root: PathBuf,
}

impl FsModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pointer_path(&self) -> PathBuf {
        self.root.join(POINTER_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn generations_dir(&self) -> PathBuf {
        self.root.join(GENERATIONS_DIR)
    }

    pub fn generation_dir(&self, generation: &str) -> PathBuf {
        self.generations_dir().join(generation)
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            FitrecError::Persistence(format!(
                "Failed to create model dir {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            FitrecError::Persistence(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_slice(&raw).map_err(|e| {
            FitrecError::Persistence(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl ModelStore for FsModelStore {
    async fn load_current(&self) -> Result<Option<PublishedGeneration>> {
        let pointer = match tokio::fs::read_to_string(self.pointer_path()).await {
            Ok(pointer) => pointer,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FitrecError::Persistence(format!(
                    "Failed to read model pointer: {}",
                    e
                )))
            }
        };

        let generation = pointer.trim();
        validate_generation_id(generation)?;

        let dir = self.generation_dir(generation);
        let model: RecommendationModel = Self::read_json(&dir.join(MODEL_FILE)).await?;
        let corpus: TrainingCorpus = Self::read_json(&dir.join(CORPUS_FILE)).await?;

        model
            .validate()
            .and_then(|_| corpus.validate())
            .map_err(|e| {
                FitrecError::Persistence(format!("Generation {} is corrupt: {}", generation, e))
            })?;
        if model.generation() != generation {
            return Err(FitrecError::Persistence(format!(
                "Generation {} holds model {}",
                generation,
                model.generation()
            )));
        }

        debug!("Loaded model generation {}", generation);
        Ok(Some(PublishedGeneration { model, corpus }))
    }

    async fn persist_generation(
        &self,
        model: &RecommendationModel,
        corpus: &TrainingCorpus,
    ) -> Result<()> {
        let generation = model.generation().to_string();
        validate_generation_id(&generation)?;

        let model_json = serde_json::to_vec_pretty(model)?;
        let corpus_json = serde_json::to_vec(corpus)?;
        let generations = self.generations_dir();

        blocking(move || {
            std::fs::create_dir_all(&generations)?;
            let final_dir = generations.join(&generation);
            if final_dir.exists() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("generation {} already exists", generation),
                ));
            }

            let staging = generations.join(format!(".{}.partial", generation));
            if staging.exists() {
                std::fs::remove_dir_all(&staging)?;
            }
            std::fs::create_dir(&staging)?;

            let staged = (|| {
                write_atomic(&staging.join(MODEL_FILE), &model_json)?;
                write_atomic(&staging.join(CORPUS_FILE), &corpus_json)?;
                std::fs::rename(&staging, &final_dir)?;
                sync_dir(&generations)
            })();
            if staged.is_err() {
                let _ = std::fs::remove_dir_all(&staging);
            }
            staged
        })
        .await
        .map_err(|e| FitrecError::Persistence(format!("Failed to persist generation: {}", e)))?;

        debug!("Persisted model generation {}", model.generation());
        Ok(())
    }

    async fn publish(&self, generation: &str) -> Result<()> {
        validate_generation_id(generation)?;
        let dir = self.generation_dir(generation);
        if !tokio::fs::try_exists(dir.join(MODEL_FILE))
            .await
            .unwrap_or(false)
        {
            return Err(FitrecError::Persistence(format!(
                "Cannot publish unknown generation {}",
                generation
            )));
        }

        let pointer = self.pointer_path();
        let contents = format!("{}\n", generation);
        let unsynced = blocking(move || commit_pointer(&pointer, contents.as_bytes(), sync_dir))
            .await
            .map_err(|e| FitrecError::Persistence(format!("Failed to publish generation: {}", e)))?;

        if let Some(e) = unsynced {
            warn!(
                "Published generation {} but failed to sync model dir: {}",
                generation, e
            );
        }
        info!("Published model generation {}", generation);
        Ok(())
    }

    async fn prune_generations(&self, keep: usize) -> Result<usize> {
        let current = match tokio::fs::read_to_string(self.pointer_path()).await {
            Ok(pointer) => Some(pointer.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(FitrecError::Persistence(format!(
                    "Failed to read model pointer: {}",
                    e
                )))
            }
        };

        let generations = self.generations_dir();
        let removed = blocking(move || {
            let entries = match std::fs::read_dir(&generations) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };

            let mut ids = Vec::new();
            for entry in entries {
                let entry = entry?;
                if !entry.file_type()?.is_dir() {
                    continue;
                }
                // staging dirs are hidden and fail the id check
                if let Some(name) = entry.file_name().to_str() {
                    if validate_generation_id(name).is_ok() {
                        ids.push(name.to_string());
                    }
                }
            }

            // ids start with their timestamp, so lexical order is age order
            ids.sort();
            let excess = ids.len().saturating_sub(keep);
            let mut removed = Vec::new();
            for id in ids.into_iter().take(excess) {
                if current.as_deref() == Some(id.as_str()) {
                    continue;
                }
                std::fs::remove_dir_all(generations.join(&id))?;
                removed.push(id);
            }
            Ok(removed)
        })
        .await
        .map_err(|e| FitrecError::Persistence(format!("Failed to prune generations: {}", e)))?;

        for id in &removed {
            debug!("Removed model generation {}", id);
        }
        Ok(removed.len())
    }

    async fn append_log(&self, entry: &RetrainLogEntry) -> Result<()> {
        self.ensure_root().await?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .await
            .map_err(|e| FitrecError::Persistence(format!("Failed to open retrain log: {}", e)))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| FitrecError::Persistence(format!("Failed to append retrain log: {}", e)))?;
        file.sync_data()
            .await
            .map_err(|e| FitrecError::Persistence(format!("Failed to sync retrain log: {}", e)))?;
        Ok(())
    }

    async fn read_log(&self) -> Result<Vec<RetrainLogEntry>> {
        let raw = match tokio::fs::read_to_string(self.log_path()).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(FitrecError::Persistence(format!(
                    "Failed to read retrain log: {}",
                    e
                )))
            }
        };

        let mut entries = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RetrainLogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping malformed retrain log line {}: {}", idx + 1, e),
            }
        }
        Ok(entries)
    }

    async fn lock(&self) -> Result<RetrainLock> {
        self.ensure_root().await?;
        let path = self.lock_path();
        let flock = blocking(move || {
            let file = open_lock_file(&path)?;
            Flock::lock(file, FlockArg::LockExclusive)
                .map_err(|(_, errno)| std::io::Error::from(errno))
        })
        .await
        .map_err(|e| FitrecError::Persistence(format!("Failed to take retrain lock: {}", e)))?;

        Ok(RetrainLock { _flock: flock })
    }

    async fn try_lock(&self) -> Result<Option<RetrainLock>> {
        self.ensure_root().await?;
        let path = self.lock_path();
        let flock = blocking(move || {
            let file = open_lock_file(&path)?;
            match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
                Ok(flock) => Ok(Some(flock)),
                Err((_, errno)) if errno == Errno::EWOULDBLOCK => Ok(None),
                Err((_, errno)) => Err(std::io::Error::from(errno)),
            }
        })
        .await
        .map_err(|e| FitrecError::Persistence(format!("Failed to take retrain lock: {}", e)))?;

        Ok(flock.map(|flock| RetrainLock { _flock: flock }))
    }
}

/// Generation ids become directory names; keep them to a safe alphabet
fn validate_generation_id(id: &str) -> Result<()> {
    let safe = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_');
    if !safe {
        return Err(FitrecError::Persistence(format!(
            "Invalid generation id: {:?}",
            id
        )));
    }
    Ok(())
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
}

async fn blocking<T, F>(f: F) -> std::io::Result<T>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}

/// Temp file that replaces its target on commit and is removed otherwise
struct AtomicFile {
    file: File,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl AtomicFile {
    fn create(final_path: &Path) -> std::io::Result<Self> {
        let temp_path = final_path.with_extension("tmp");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(Self {
            file,
            temp_path,
            final_path: final_path.to_path_buf(),
        })
    }

    fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.file.write_all(data)
    }

    fn commit(self) -> std::io::Result<()> {
        self.file.sync_all()?;
        std::fs::rename(&self.temp_path, &self.final_path)
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        // no-op after a successful rename
        let _ = std::fs::remove_file(&self.temp_path);
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = AtomicFile::create(path)?;
    file.write_all(data)?;
    file.commit()
}

fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

/// Rename the pointer into place, then sync its directory.
/// The rename is the commit; a sync error after it is handed back, not raised.
fn commit_pointer(
    pointer: &Path,
    contents: &[u8],
    sync: impl FnOnce(&Path) -> std::io::Result<()>,
) -> std::io::Result<Option<std::io::Error>> {
    write_atomic(pointer, contents)?;
    let dir = pointer.parent().unwrap_or_else(|| Path::new("."));
    Ok(sync(dir).err())
}
