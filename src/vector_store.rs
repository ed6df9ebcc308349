//! Persisted document index.
//!
//! [`DocumentIndex`] owns the lifecycle of the TF-IDF [`VectorStore`]:
//! building it from the seed corpus, writing it to disk, loading it back,
//! and publishing it to concurrent readers.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──load──▶ Loaded ──rebuild──▶ Rebuilding ──▶ Loaded
//!        │                                        ▲
//!        └──────────── rebuild ───────────────────┘
//! ```
//!
//! The published store is an `Arc<VectorStore>` behind an `RwLock`. A
//! rebuild builds and persists a complete new store before swapping the
//! pointer, so readers always see either the old store or the new one.
//! Rebuilds are serialised by a separate mutex.
//!
//! # On-disk format
//!
//! A single MessagePack document (`rmp-serde`) holding the format version,
//! build timestamp, a SHA-256 digest of the corpus, and the store itself.
//! Writes go to a `.tmp` sibling which is then renamed over the target.
//! Anything that fails to decode, carries another format version, or fails
//! the shape checks is treated as corruption and triggers a rebuild.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use support_triage_core::models::{SearchHit, SeedDocument};
use support_triage_core::search::VectorStore;
use support_triage_core::tfidf::{CsrMatrix, TfidfVectorizer};

use crate::config::RetrievalConfig;
use crate::seeds::scan_seeds;

/// Bumped whenever the persisted layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStore {
    format_version: u32,
    built_at: DateTime<Utc>,
    corpus_digest: String,
    vectorizer: TfidfVectorizer,
    matrix: CsrMatrix,
    documents: Vec<SeedDocument>,
}

/// Result of the read-only debug probe on the store file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreInfo {
    pub exists: bool,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct DocumentIndex {
    seeds_dir: PathBuf,
    store_path: PathBuf,
    include_globs: Vec<String>,
    current: RwLock<Option<Arc<VectorStore>>>,
    rebuild_lock: Mutex<()>,
}

impl DocumentIndex {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            seeds_dir: config.seeds_dir.clone(),
            store_path: config.store_path.clone(),
            include_globs: config.include_globs.clone(),
            current: RwLock::new(None),
            rebuild_lock: Mutex::new(()),
        }
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// The published store, if one has been loaded or built.
    pub fn current(&self) -> Option<Arc<VectorStore>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, store: Arc<VectorStore>) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(store);
    }

    /// Rebuild from the seed corpus, persist, and publish.
    ///
    /// Returns the number of indexed documents. On error the previously
    /// published store is left in place.
    pub fn rebuild(&self) -> Result<usize> {
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let store = self.rebuild_locked()?;
        Ok(store.len())
    }

    fn rebuild_locked(&self) -> Result<Arc<VectorStore>> {
        match self.build_and_persist() {
            Ok(store) => {
                let store = Arc::new(store);
                self.publish(store.clone());
                tracing::info!(
                    documents = store.len(),
                    path = %self.store_path.display(),
                    "vector store rebuilt"
                );
                Ok(store)
            }
            Err(e) => {
                tracing::error!(
                    path = %self.store_path.display(),
                    error = %format!("{:#}", e),
                    "vector store rebuild failed"
                );
                Err(e)
            }
        }
    }

    fn build_and_persist(&self) -> Result<VectorStore> {
        let documents = scan_seeds(&self.seeds_dir, &self.include_globs)?;
        let store = VectorStore::build(documents);
        write_store(&self.store_path, &store)?;
        Ok(store)
    }

    /// Load the persisted store and publish it.
    ///
    /// A missing file is bootstrapped with a rebuild. A corrupt file is
    /// logged and rebuilt.
    pub fn load(&self) -> Result<Arc<VectorStore>> {
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.load_locked()
    }

    fn load_locked(&self) -> Result<Arc<VectorStore>> {
        if !self.store_path.exists() {
            tracing::info!(path = %self.store_path.display(), "no vector store on disk, building");
            return self.rebuild_locked();
        }

        match read_store(&self.store_path) {
            Ok(store) => {
                let store = Arc::new(store);
                self.publish(store.clone());
                tracing::debug!(documents = store.len(), "vector store loaded");
                Ok(store)
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.store_path.display(),
                    error = %format!("{:#}", e),
                    "vector store unreadable, rebuilding"
                );
                self.rebuild_locked()
            }
        }
    }

    /// The published store, loading it on first use.
    pub fn get_or_load(&self) -> Result<Arc<VectorStore>> {
        if let Some(store) = self.current() {
            return Ok(store);
        }
        let _guard = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Another caller may have loaded while we waited.
        if let Some(store) = self.current() {
            return Ok(store);
        }
        self.load_locked()
    }

    /// Search the index. Never fails: load errors are logged and give `[]`.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        if query.trim().is_empty() || top_k == 0 {
            return Vec::new();
        }
        match self.get_or_load() {
            Ok(store) => store.search(query, top_k),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "search unavailable, returning no results");
                Vec::new()
            }
        }
    }

    pub fn store_info(&self) -> StoreInfo {
        let path = self.store_path.display().to_string();
        match std::fs::metadata(&self.store_path) {
            Ok(meta) if meta.is_file() => StoreInfo {
                exists: true,
                path,
                size_bytes: Some(meta.len()),
                message: None,
            },
            _ => StoreInfo {
                exists: false,
                path,
                size_bytes: None,
                message: Some("vector store file not found".to_string()),
            },
        }
    }
}

/// Hex SHA-256 over the ordered `(path, text)` pairs.
pub fn corpus_digest(documents: &[SeedDocument]) -> String {
    let mut hasher = Sha256::new();
    for doc in documents {
        hasher.update((doc.path.len() as u64).to_le_bytes());
        hasher.update(doc.path.as_bytes());
        hasher.update((doc.text.len() as u64).to_le_bytes());
        hasher.update(doc.text.as_bytes());
    }
    hex::encode(hasher.finalize())
}

fn write_store(path: &Path, store: &VectorStore) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create store directory: {}", parent.display()))?;
    }

    let persisted = PersistedStore {
        format_version: FORMAT_VERSION,
        built_at: Utc::now(),
        corpus_digest: corpus_digest(&store.documents),
        vectorizer: store.vectorizer.clone(),
        matrix: store.matrix.clone(),
        documents: store.documents.clone(),
    };
    let bytes = rmp_serde::to_vec_named(&persisted).context("Failed to encode vector store")?;

    let tmp = tmp_path(path);
    std::fs::write(&tmp, &bytes)
        .with_context(|| format!("Failed to write vector store: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move vector store into place: {}", path.display()))?;
    Ok(())
}

fn read_store(path: &Path) -> Result<VectorStore> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read vector store: {}", path.display()))?;
    let persisted: PersistedStore =
        rmp_serde::from_slice(&bytes).context("Failed to decode vector store")?;

    if persisted.format_version != FORMAT_VERSION {
        bail!(
            "unsupported vector store format version {} (expected {})",
            persisted.format_version,
            FORMAT_VERSION
        );
    }
    if corpus_digest(&persisted.documents) != persisted.corpus_digest {
        bail!("corpus digest mismatch");
    }

    let store = VectorStore {
        vectorizer: persisted.vectorizer,
        matrix: persisted.matrix,
        documents: persisted.documents,
    };
    store.validate()?;
    Ok(store)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn index_in(tmp: &TempDir) -> DocumentIndex {
        let seeds = tmp.path().join("seeds");
        std::fs::create_dir_all(&seeds).unwrap();
        DocumentIndex::new(&RetrievalConfig {
            seeds_dir: seeds,
            store_path: tmp.path().join("vector_store").join("store.bin"),
            ..RetrievalConfig::default()
        })
    }

    fn seed(tmp: &TempDir, name: &str, text: &str) {
        let seeds = tmp.path().join("seeds");
        std::fs::create_dir_all(&seeds).unwrap();
        std::fs::write(seeds.join(name), text).unwrap();
    }

    #[test]
    fn test_digest_is_order_sensitive() {
        let a = SeedDocument {
            path: "a.txt".into(),
            text: "x".into(),
        };
        let b = SeedDocument {
            path: "b.txt".into(),
            text: "y".into(),
        };
        assert_ne!(
            corpus_digest(&[a.clone(), b.clone()]),
            corpus_digest(&[b, a])
        );
        assert_eq!(corpus_digest(&[]).len(), 64);
    }

    #[test]
    fn test_rebuild_creates_parent_and_publishes() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp, "a.txt", "payment declined by gateway");
        let index = index_in(&tmp);

        assert!(index.current().is_none());
        assert_eq!(index.rebuild().unwrap(), 1);
        assert!(index.store_path().exists());
        assert!(!tmp_path(index.store_path()).exists());
        assert_eq!(index.current().unwrap().len(), 1);
    }

    #[test]
    fn test_read_back_matches_built_store() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp, "a.txt", "payment declined by gateway");
        seed(&tmp, "b.md", "network timeout talking to upstream");
        let index = index_in(&tmp);
        index.rebuild().unwrap();

        let from_disk = read_store(index.store_path()).unwrap();
        assert_eq!(&from_disk, index.current().unwrap().as_ref());
    }

    #[test]
    fn test_wrong_version_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.bin");
        let store = VectorStore::build(Vec::new());
        let persisted = PersistedStore {
            format_version: FORMAT_VERSION + 1,
            built_at: Utc::now(),
            corpus_digest: corpus_digest(&store.documents),
            vectorizer: store.vectorizer,
            matrix: store.matrix,
            documents: store.documents,
        };
        std::fs::write(&path, rmp_serde::to_vec_named(&persisted).unwrap()).unwrap();

        let err = read_store(&path).unwrap_err();
        assert!(err.to_string().contains("format version"));
    }

    #[test]
    fn test_garbage_file_rebuilt_on_load() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp, "a.txt", "card expired");
        let index = index_in(&tmp);
        std::fs::create_dir_all(index.store_path().parent().unwrap()).unwrap();
        std::fs::write(index.store_path(), b"not messagepack at all").unwrap();

        let store = index.load().unwrap();
        assert_eq!(store.len(), 1);
        assert!(read_store(index.store_path()).is_ok());
    }

    #[test]
    fn test_search_lazily_bootstraps() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp, "a.txt", "card expired during checkout");
        seed(&tmp, "b.txt", "dns lookup failed");
        let index = index_in(&tmp);

        let hits = index.search("card expired", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].path, "a.txt");
        assert!(index.store_path().exists());
    }

    #[test]
    fn test_search_blank_query_does_not_build() {
        let tmp = TempDir::new().unwrap();
        let index = index_in(&tmp);
        assert!(index.search("   ", 3).is_empty());
        assert!(!index.store_path().exists());
    }

    #[test]
    fn test_failed_rebuild_publishes_nothing() {
        let tmp = TempDir::new().unwrap();
        seed(&tmp, "a.txt", "card expired");
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let index = DocumentIndex::new(&RetrievalConfig {
            seeds_dir: tmp.path().join("seeds"),
            store_path: blocker.join("store.bin"),
            ..RetrievalConfig::default()
        });
        assert!(index.rebuild().is_err());
        assert!(index.current().is_none());
        assert!(index.search("card", 3).is_empty());
    }

    #[test]
    fn test_store_info() {
        let tmp = TempDir::new().unwrap();
        let index = index_in(&tmp);

        let info = index.store_info();
        assert!(!info.exists);
        assert!(info.size_bytes.is_none());
        assert!(info.message.is_some());

        index.rebuild().unwrap();
        let info = index.store_info();
        assert!(info.exists);
        assert!(info.size_bytes.unwrap() > 0);
    }
}
