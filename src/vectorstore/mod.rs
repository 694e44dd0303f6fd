// Vector store module
// Builds, persists and reloads the chunk embedding index and answers
// nearest-neighbour queries against it


pub mod lancedb;
pub mod memory;
pub mod mmr;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::loader::Document;
use crate::{RagError, Result};

pub use self::lancedb::LanceStore;
pub use memory::MemoryStore;
pub use mmr::{cosine_distance, cosine_similarity, maximal_marginal_relevance};

/// Texts embedded per request while building an index
const EMBED_BATCH_SIZE: usize = 64;

/// Persistence engine behind a [`VectorIndex`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// LanceDB table in the persist directory
    #[default]
    #[serde(rename = "lancedb")]
    LanceDb,
    /// Brute-force index serialized to `index.json`
    Memory,
}

impl fmt::Display for StoreBackend {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LanceDb => f.write_str("lancedb"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

/// A chunk and its embedding as persisted by a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: Document,
    /// Position of the chunk in the indexed sequence
    pub chunk_index: u64,
    /// RFC 3339 timestamp
    pub created_at: String,
}

/// One nearest-neighbour result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: Document,
    pub embedding: Vec<f32>,
    /// Cosine distance to the query, lower is closer
    pub distance: f32,
}

/// Storage and exact search over embedding records
pub trait VectorStore: Send + Sync + fmt::Debug {
    /// Append records. All vectors in a store share one dimension.
    fn add(&mut self, records: Vec<EmbeddingRecord>) -> Result<()>;

    /// Up to `limit` hits ordered by ascending distance
    fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchHit>>;

    fn count(&self) -> Result<usize>;
}

/// A loaded store paired with the embedder used for queries
#[derive(Debug)]
pub struct VectorIndex {
    store: Box<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    #[inline]
    pub fn new(store: Box<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    #[inline]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    #[inline]
    pub fn len(&self) -> Result<usize> {
        self.store.count()
    }

    #[inline]
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The `k` chunks nearest to `query`, nearest first
    #[inline]
    pub fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        Ok(self
            .search_hits(query, k)?
            .into_iter()
            .map(|hit| hit.document)
            .collect())
    }

    /// Like [`Self::similarity_search`], paired with cosine distances
    #[inline]
    pub fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<(Document, f32)>> {
        Ok(self
            .search_hits(query, k)?
            .into_iter()
            .map(|hit| (hit.document, hit.distance))
            .collect())
    }

    /// Fetch `fetch_k` candidates and pick up to `k` of them by maximal
    /// marginal relevance
    #[inline]
    pub fn max_marginal_relevance_search(
        &self,
        query: &str,
        k: usize,
        fetch_k: usize,
        lambda_mult: f32,
    ) -> Result<Vec<Document>> {
        if k == 0 || fetch_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(query)?;
        let candidates = self.store.search(&query_vector, fetch_k)?;
        let vectors: Vec<&[f32]> = candidates.iter().map(|h| h.embedding.as_slice()).collect();
        let picks = maximal_marginal_relevance(&query_vector, &vectors, k, lambda_mult);

        debug!(
            "MMR selected {} of {} candidates (k={}, lambda={})",
            picks.len(),
            candidates.len(),
            k,
            lambda_mult
        );

        let mut slots: Vec<Option<Document>> =
            candidates.into_iter().map(|h| Some(h.document)).collect();
        Ok(picks
            .into_iter()
            .filter_map(|idx| slots.get_mut(idx).and_then(Option::take))
            .collect())
    }

    fn search_hits(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = self.embedder.embed_query(query)?;
        self.store.search(&query_vector, k)
    }
}

/// Creates, persists and reloads the vector index in a directory
#[derive(Debug, Clone)]
pub struct VectorStoreManager {
    persist_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    backend: StoreBackend,
}

impl VectorStoreManager {
    #[inline]
    pub fn new(persist_dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            persist_dir: persist_dir.into(),
            embedder,
            backend: StoreBackend::default(),
        }
    }

    #[inline]
    pub fn with_backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    #[inline]
    pub fn persist_dir(&self) -> &Path {
        &self.persist_dir
    }

    #[inline]
    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    /// True when the persist directory exists and holds at least one entry
    #[inline]
    pub fn exists(&self) -> bool {
        self.persist_dir.is_dir()
            && fs::read_dir(&self.persist_dir).is_ok_and(|mut entries| entries.next().is_some())
    }

    /// Embed `documents` and write a fresh index, replacing any previous one
    #[inline]
    pub fn create(&self, documents: &[Document]) -> Result<VectorIndex> {
        if documents.is_empty() {
            return Err(RagError::EmptyInput);
        }

        info!(
            "Creating {} vector store with {} chunks at {}",
            self.backend,
            documents.len(),
            self.persist_dir.display()
        );

        let vectors = self.embed_with_progress(documents)?;
        if vectors.len() != documents.len() {
            return Err(RagError::Embedding(format!(
                "Expected {} embeddings, got {}",
                documents.len(),
                vectors.len()
            )));
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let records = documents
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(index, (document, vector))| EmbeddingRecord {
                id: uuid::Uuid::new_v4().to_string(),
                vector,
                document: document.clone(),
                chunk_index: index as u64,
                created_at: created_at.clone(),
            })
            .collect();

        // Nothing touches persist_dir until every chunk is embedded
        let mut store = self.create_store()?;
        store.add(records)?;

        info!("Vector store created and persisted");
        Ok(VectorIndex::new(store, Arc::clone(&self.embedder)))
    }

    /// Open the persisted index
    #[inline]
    pub fn load(&self) -> Result<VectorIndex> {
        if !self.exists() {
            return Err(RagError::NotFound(self.persist_dir.clone()));
        }

        info!(
            "Loading {} vector store from {}",
            self.backend,
            self.persist_dir.display()
        );

        let store: Box<dyn VectorStore> = match self.backend {
            StoreBackend::LanceDb => Box::new(LanceStore::open(&self.persist_dir)?),
            StoreBackend::Memory => Box::new(MemoryStore::open(&self.persist_dir)?),
        };
        Ok(VectorIndex::new(store, Arc::clone(&self.embedder)))
    }

    /// Load the index if one exists, otherwise build it from `documents`
    #[inline]
    pub fn get_or_create(&self, documents: Option<&[Document]>) -> Result<VectorIndex> {
        if self.exists() {
            return self.load();
        }

        match documents {
            Some(documents) => self.create(documents),
            None => Err(RagError::MissingInput(self.persist_dir.clone())),
        }
    }

    fn create_store(&self) -> Result<Box<dyn VectorStore>> {
        Ok(match self.backend {
            StoreBackend::LanceDb => Box::new(LanceStore::create(&self.persist_dir)?),
            StoreBackend::Memory => Box::new(MemoryStore::create(&self.persist_dir)?),
        })
    }

    fn embed_with_progress(&self, documents: &[Document]) -> Result<Vec<Vec<f32>>> {
        let bar = if console::user_attended_stderr() {
            ProgressBar::new(documents.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut vectors = Vec::with_capacity(documents.len());
        for batch in documents.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|doc| doc.text.clone()).collect();
            vectors.extend(self.embedder.embed_documents(&texts)?);
            bar.inc(batch.len() as u64);
        }
        bar.finish_and_clear();

        Ok(vectors)
    }
}
