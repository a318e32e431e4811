//! Directory-backed vector store
//!
//! Each collection lives in `<dir>/<name>.json`. Writes go to a temp file
//! that is synced before being renamed over the snapshot, so a crash never
//! leaves a torn snapshot behind. Similarity is exact cosine over all
//! records of a collection.
//!
//! Writers are serialized; readers only wait while records are appended in
//! memory, never during snapshot encoding or disk IO.

use chrono::{DateTime, Utc};
use mia_core::StoreError;
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const SNAPSHOT_EXT: &str = "json";

/// Provenance of a stored chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Document title (`Scrape: <url>`, `Report_<id>_<date>`, ...)
    pub title: String,
    pub conversation_id: i64,
    pub chunk_index: usize,
    pub created_at: DateTime<Utc>,
}

/// One embedded chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Query match
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: StoredRecord,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CollectionData {
    name: String,
    dimension: Option<usize>,
    records: Vec<StoredRecord>,
}

/// Vector store rooted at one directory
#[derive(Debug)]
pub struct VectorStore {
    dir: PathBuf,
    collections: RwLock<HashMap<String, CollectionData>>,
    /// Snapshots reach disk in the order their records were appended
    writer: Mutex<()>,
}

impl VectorStore {
    /// Open (creating if needed) the store at `dir` and load every collection snapshot
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut collections = HashMap::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            match load_snapshot(&path) {
                Ok(data) => {
                    tracing::info!(
                        collection = %data.name,
                        records = data.records.len(),
                        "Loaded collection"
                    );
                    collections.insert(data.name.clone(), data);
                }
                Err(e) => {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "Skipping unreadable collection snapshot"
                    );
                }
            }
        }

        Ok(Self {
            dir,
            collections: RwLock::new(collections),
            writer: Mutex::new(()),
        })
    }

    /// Persistence directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of all collections
    ///
    /// Also verifies that the persistence directory is still reachable.
    pub fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let meta = fs::metadata(&self.dir)?;
        if !meta.is_dir() {
            return Err(StoreError::Io(std::io::Error::other(format!(
                "{} is not a directory",
                self.dir.display()
            ))));
        }

        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Number of records in `collection`
    #[must_use]
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, |c| c.records.len())
    }

    /// Append records to `collection` and persist it
    ///
    /// The first stored vector fixes the collection's dimension. When the
    /// snapshot cannot be written the append is rolled back.
    pub fn add(&self, collection: &str, records: Vec<StoredRecord>) -> Result<usize, StoreError> {
        validate_collection_name(collection)?;
        if records.is_empty() {
            return Ok(0);
        }
        let _writer = self.writer.lock();

        let mut collections = self.collections.write();
        let existing = collections.get(collection);
        let existed = existing.is_some();
        let previous_dimension = existing.and_then(|c| c.dimension);
        let previous_len = existing.map_or(0, |c| c.records.len());

        let expected = previous_dimension.unwrap_or_else(|| records[0].embedding.len());
        if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }

        let added = records.len();
        let data = collections
            .entry(collection.to_string())
            .or_insert_with(|| CollectionData {
                name: collection.to_string(),
                ..CollectionData::default()
            });
        data.dimension = Some(expected);
        data.records.extend(records);
        let total = data.records.len();

        let collections = RwLockWriteGuard::downgrade(collections);
        let encoded = serde_json::to_vec(&collections[collection]);
        drop(collections);

        let persisted = encoded
            .map_err(StoreError::from)
            .and_then(|bytes| write_snapshot(&self.dir, collection, &bytes));
        if let Err(e) = persisted {
            tracing::error!(collection, error = %e, "Snapshot write failed, rolling back");
            let mut collections = self.collections.write();
            if existed {
                if let Some(data) = collections.get_mut(collection) {
                    data.records.truncate(previous_len);
                    data.dimension = previous_dimension;
                }
            } else {
                collections.remove(collection);
            }
            return Err(e);
        }

        tracing::debug!(collection, added, total, "Records stored");
        Ok(added)
    }

    /// Top `top_k` records by cosine similarity, optionally restricted to one conversation
    pub fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        conversation_id: Option<i64>,
    ) -> Result<Vec<ScoredRecord>, StoreError> {
        let collections = self.collections.read();
        let Some(data) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        if let Some(expected) = data.dimension {
            if expected != embedding.len() {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        let mut scored: Vec<ScoredRecord> = data
            .records
            .iter()
            .filter(|r| conversation_id.map_or(true, |id| r.metadata.conversation_id == id))
            .map(|r| ScoredRecord {
                score: cosine_similarity(embedding, &r.embedding),
                record: r.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn validate_collection_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollectionName(name.to_string()))
    }
}

fn load_snapshot(path: &Path) -> Result<CollectionData, StoreError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_snapshot(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
    let path = dir.join(format!("{name}.{SNAPSHOT_EXT}"));
    let tmp_path = dir.join(format!("{name}.{SNAPSHOT_EXT}.tmp"));

    let mut file = File::create(&tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, &path)?;
    // Directory fsync is not supported everywhere
    if let Ok(dir) = File::open(dir) {
        let _ = dir.sync_all();
    }
    Ok(())
}

/// Cosine similarity; zero vectors score 0
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
