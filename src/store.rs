//! Question persistence.
//!
//! A store holds the question set of each source and replaces it as a
//! unit: after [`QuestionStore::replace_all`] returns `Ok`, readers see
//! exactly the new set, and after it returns `Err` they still see the old
//! one. Two implementations:
//!
//! * [`MemoryStore`] — `HashMap` behind a `RwLock`, for tests and embedding.
//! * [`JsonFileStore`] — one JSON file per source, written via temp file +
//!   rename.
//!
//! [`commit_generation`] is the usual entry point after
//! [`crate::generate::generate`]: it refuses to wipe existing questions
//! when a run produced nothing.

use crate::error::{QuizForgeError, ValidationError};
use crate::output::{GenerationOutput, QuestionRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{info, warn};

/// Storage backend for generated questions.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Atomically replace every question of `source_id` with `records`.
    ///
    /// Records are validated first; one bad record rejects the whole set
    /// and leaves the stored questions untouched. Returns the number stored.
    async fn replace_all(
        &self,
        source_id: &str,
        records: Vec<QuestionRecord>,
    ) -> Result<usize, QuizForgeError>;

    /// Questions currently stored for `source_id`, empty if none.
    async fn load(&self, source_id: &str) -> Result<Vec<QuestionRecord>, QuizForgeError>;
}

/// Check every record and its ownership before a commit.
pub fn validate_records(source_id: &str, records: &[QuestionRecord]) -> Result<(), QuizForgeError> {
    for (index, record) in records.iter().enumerate() {
        let check = if record.source_id != source_id {
            Err(ValidationError::WrongSource {
                expected: source_id.to_string(),
                found: record.source_id.clone(),
            })
        } else {
            record.validate()
        };
        check.map_err(|reason| QuizForgeError::InvalidRecord {
            source_id: source_id.to_string(),
            index,
            reason,
        })?;
    }
    Ok(())
}

// ── In-memory ───────────────────────────────────────────────────────────────

/// In-memory store for testing and embedding.
pub struct MemoryStore {
    sources: RwLock<HashMap<String, Vec<QuestionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> QuizForgeError {
    QuizForgeError::Internal("question store lock poisoned".into())
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn replace_all(
        &self,
        source_id: &str,
        records: Vec<QuestionRecord>,
    ) -> Result<usize, QuizForgeError> {
        validate_records(source_id, &records)?;
        let count = records.len();
        let mut sources = self.sources.write().map_err(|_| poisoned())?;
        sources.insert(source_id.to_string(), records);
        Ok(count)
    }

    async fn load(&self, source_id: &str) -> Result<Vec<QuestionRecord>, QuizForgeError> {
        let sources = self.sources.read().map_err(|_| poisoned())?;
        Ok(sources.get(source_id).cloned().unwrap_or_default())
    }
}

// ── JSON files ──────────────────────────────────────────────────────────────

/// One `<source>.json` file per source under `root`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `source_id`. Characters outside `[A-Za-z0-9._-]` become
    /// `_` so ids can never escape `root`.
    pub fn path_for(&self, source_id: &str) -> PathBuf {
        let name: String = source_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let name = name.trim_start_matches('.');
        let name = if name.is_empty() { "_" } else { name };
        self.root.join(format!("{name}.json"))
    }
}

fn storage_err(path: &Path, detail: impl std::fmt::Display) -> QuizForgeError {
    QuizForgeError::Storage {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

#[async_trait]
impl QuestionStore for JsonFileStore {
    async fn replace_all(
        &self,
        source_id: &str,
        records: Vec<QuestionRecord>,
    ) -> Result<usize, QuizForgeError> {
        validate_records(source_id, &records)?;
        let path = self.path_for(source_id);

        let json = serde_json::to_vec_pretty(&records).map_err(|e| storage_err(&path, e))?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| storage_err(&self.root, e))?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| storage_err(&tmp_path, e))?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(storage_err(&path, e));
        }
        Ok(records.len())
    }

    async fn load(&self, source_id: &str) -> Result<Vec<QuestionRecord>, QuizForgeError> {
        let path = self.path_for(source_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err(&path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| storage_err(&path, e))
    }
}

// ── Commit ──────────────────────────────────────────────────────────────────

/// What [`commit_generation`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The stored set was replaced by `count` new questions.
    Replaced { count: usize },
    /// The run produced nothing; the `existing` stored questions were kept.
    KeptExisting { existing: usize },
}

/// Store the questions of a finished run, replacing the previous set.
///
/// An empty run never deletes what is already stored.
pub async fn commit_generation(
    store: &dyn QuestionStore,
    output: &GenerationOutput,
) -> Result<CommitOutcome, QuizForgeError> {
    if output.questions.is_empty() {
        let existing = store.load(&output.source_id).await?.len();
        warn!(
            "No questions generated for '{}'; keeping {} existing question(s)",
            output.source_id, existing
        );
        return Ok(CommitOutcome::KeptExisting { existing });
    }

    let count = store
        .replace_all(&output.source_id, output.questions.clone())
        .await?;
    info!("Stored {} questions for '{}'", count, output.source_id);
    Ok(CommitOutcome::Replaced { count })
}
