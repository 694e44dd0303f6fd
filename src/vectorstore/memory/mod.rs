
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingRecord, SearchHit, VectorStore, cosine_distance};
use crate::{RagError, Result};

pub const INDEX_FILE_NAME: &str = "index.json";

/// Exact cosine search over records held in memory, persisted as JSON
#[derive(Debug)]
pub struct MemoryStore {
    path: PathBuf,
    records: Vec<EmbeddingRecord>,
}

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    dimension: Option<usize>,
    records: Vec<EmbeddingRecord>,
}

impl MemoryStore {
    /// Start an empty index in `dir`, discarding any existing `index.json`
    #[inline]
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let store = Self {
            path: dir.join(INDEX_FILE_NAME),
            records: Vec::new(),
        };
        store.persist()?;
        Ok(store)
    }

    #[inline]
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(INDEX_FILE_NAME);
        if !path.is_file() {
            return Err(RagError::NotFound(dir.to_path_buf()));
        }

        let content = fs::read_to_string(&path)?;
        let persisted: PersistedIndex = serde_json::from_str(&content).map_err(|e| {
            RagError::Database(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        debug!(
            "Loaded {} records from {}",
            persisted.records.len(),
            path.display()
        );
        Ok(Self {
            path,
            records: persisted.records,
        })
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.records.first().map(|r| r.vector.len())
    }

    fn persist(&self) -> Result<()> {
        let persisted = PersistedIndex {
            dimension: self.dimension(),
            records: self.records.clone(),
        };
        let json = serde_json::to_string(&persisted)
            .map_err(|e| RagError::Database(format!("Failed to serialize index: {}", e)))?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl VectorStore for MemoryStore {
    fn add(&mut self, records: Vec<EmbeddingRecord>) -> Result<()> {
        let Some(expected) = self
            .dimension()
            .or_else(|| records.first().map(|r| r.vector.len()))
        else {
            return Ok(());
        };

        if let Some(bad) = records.iter().find(|r| r.vector.len() != expected) {
            return Err(RagError::Database(format!(
                "Vector dimension mismatch: expected {}, got {}",
                expected,
                bad.vector.len()
            )));
        }

        self.records.extend(records);
        self.persist()
    }

    fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let mut scored: Vec<(f32, &EmbeddingRecord)> = self
            .records
            .iter()
            .map(|r| (cosine_distance(query, &r.vector), r))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(distance, record)| SearchHit {
                document: record.document.clone(),
                embedding: record.vector.clone(),
                distance,
            })
            .collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }
}
