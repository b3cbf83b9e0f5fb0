//! Local knowledge store: collaborator contract and default chunk store.
//!
//! [`ChunkStore`] walks a directory of reference files, splits them into
//! paragraph-boundary chunks, and ranks chunks at query time by keyword
//! overlap. It stands in for an external vector store behind the same
//! contract; ingestion is a run prerequisite, never a per-section step.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use docweaver_shared::{DocweaverError, Result};

/// File extensions considered reference material.
const INGEST_EXTENSIONS: &[&str] = &["txt", "md"];

// ---------------------------------------------------------------------------
// Collaborator contract
// ---------------------------------------------------------------------------

/// Local similarity-store collaborator.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Return up to `top_k` snippets relevant to `query`, best first.
    /// An empty result is a normal outcome, whether the store was never
    /// ingested or simply holds nothing relevant.
    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<String>>;

    /// Bulk-ingest every reference file under `dir`.
    async fn ingest_dir(&mut self, dir: &Path) -> Result<()>;
}

// ---------------------------------------------------------------------------
// ChunkStore
// ---------------------------------------------------------------------------

/// One ingested chunk with its content hash.
#[derive(Debug, Clone)]
struct StoredChunk {
    text: String,
    hash: String,
}

/// In-memory chunk store ranked by keyword overlap.
#[derive(Debug)]
pub struct ChunkStore {
    chunk_chars: usize,
    chunks: Vec<StoredChunk>,
}

impl ChunkStore {
    /// Create an empty store with the given approximate chunk size.
    pub fn new(chunk_chars: usize) -> Self {
        Self {
            chunk_chars,
            chunks: Vec::new(),
        }
    }

    /// Number of chunks currently held.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn ingest_file(&mut self, path: &Path) -> Result<usize> {
        let content =
            std::fs::read_to_string(path).map_err(|e| DocweaverError::io(path, e))?;

        let mut added = 0;
        for chunk_text in chunk_paragraphs(&content, self.chunk_chars) {
            let hash = content_hash(&chunk_text);
            // Identical content across files contributes nothing new.
            if self.chunks.iter().any(|c| c.hash == hash) {
                continue;
            }
            self.chunks.push(StoredChunk {
                text: chunk_text,
                hash,
            });
            added += 1;
        }

        Ok(added)
    }

    fn ingest_dir_recursive(&mut self, dir: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(dir).map_err(|e| DocweaverError::io(dir, e))?;

        // Deterministic ingest order regardless of filesystem ordering.
        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .collect();
        paths.sort();

        let mut added = 0;
        for path in paths {
            if path.is_dir() {
                added += self.ingest_dir_recursive(&path)?;
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| INGEST_EXTENSIONS.contains(&ext))
            {
                added += self.ingest_file(&path)?;
            }
        }

        Ok(added)
    }
}

#[async_trait]
impl KnowledgeStore for ChunkStore {
    #[instrument(skip(self))]
    async fn query(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        // A never-ingested store and an ingested-but-no-match store both
        // yield an empty result; the chunk count here is the only way to
        // tell them apart.
        debug!(chunks = self.chunks.len(), "querying chunk store");

        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f64)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| (idx, overlap_score(&query_tokens, &chunk.text)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        // Score descending, ingestion order as the tiebreak.
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(idx, _)| self.chunks[idx].text.clone())
            .collect())
    }

    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    async fn ingest_dir(&mut self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            return Err(DocweaverError::Store(format!(
                "ingest directory not found: {}",
                dir.display()
            )));
        }

        self.chunks.clear();
        let added = self.ingest_dir_recursive(dir)?;
        info!(chunks = added, "knowledge store ingestion complete");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chunking and scoring
// ---------------------------------------------------------------------------

/// Split text on paragraph boundaries into chunks of roughly `max_chars`.
///
/// Paragraphs accumulate into a buffer until the next one would exceed the
/// budget; an oversized single paragraph becomes its own chunk rather than
/// being split mid-sentence.
fn chunk_paragraphs(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if buf.is_empty() {
            trimmed.len()
        } else {
            buf.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !buf.is_empty() {
            chunks.push(std::mem::take(&mut buf));
        }

        if !buf.is_empty() {
            buf.push_str("\n\n");
        }
        buf.push_str(trimmed);
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }

    chunks
}

/// Lowercased alphanumeric tokens.
fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of query tokens present in the chunk.
fn overlap_score(query_tokens: &HashSet<String>, chunk_text: &str) -> f64 {
    let chunk_tokens = tokenize(chunk_text);
    let hits = query_tokens.intersection(&chunk_tokens).count();
    hits as f64 / query_tokens.len() as f64
}

/// SHA-256 hash of chunk content, for dedup across files.
fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("dw-store-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn chunking_respects_paragraph_boundaries() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = chunk_paragraphs(text, 25);
        assert!(chunks.len() > 1);
        assert!(chunks[0].starts_with("First"));
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        assert_eq!(chunk_paragraphs(text, 12), chunk_paragraphs(text, 12));
    }

    #[test]
    fn small_text_single_chunk() {
        let chunks = chunk_paragraphs("Hello world.", 800);
        assert_eq!(chunks, vec!["Hello world.".to_string()]);
    }

    #[tokio::test]
    async fn query_on_empty_store_returns_nothing() {
        let store = ChunkStore::new(800);
        let results = store.query("mars colonization", 2).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn ingest_and_rank_by_overlap() {
        let dir = temp_dir();
        std::fs::write(
            dir.join("mars.txt"),
            "Mars colonization requires radiation shielding.\n\nUnrelated cooking recipe for pasta.",
        )
        .unwrap();

        let mut store = ChunkStore::new(60);
        store.ingest_dir(&dir).await.unwrap();
        assert!(store.len() >= 2);

        let results = store.query("mars radiation", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].contains("radiation shielding"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn reingest_replaces_previous_content() {
        let dir = temp_dir();
        std::fs::write(dir.join("a.txt"), "one paragraph only").unwrap();

        let mut store = ChunkStore::new(800);
        store.ingest_dir(&dir).await.unwrap();
        let before = store.len();
        store.ingest_dir(&dir).await.unwrap();
        assert_eq!(store.len(), before);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn missing_dir_is_a_store_error() {
        let mut store = ChunkStore::new(800);
        let err = store
            .ingest_dir(Path::new("/nonexistent/dw-store-path"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ingest directory not found"));
    }

    #[tokio::test]
    async fn non_reference_files_ignored() {
        let dir = temp_dir();
        std::fs::write(dir.join("notes.md"), "markdown notes about mars").unwrap();
        std::fs::write(dir.join("image.png"), [0x89u8, 0x50, 0x4E, 0x47]).unwrap();

        let mut store = ChunkStore::new(800);
        store.ingest_dir(&dir).await.unwrap();
        assert_eq!(store.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
