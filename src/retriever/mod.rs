// Retriever module
// Query-time chunk selection by plain similarity or maximal marginal relevance


use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::loader::Document;
use crate::vectorstore::VectorIndex;
use crate::{RagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Similarity,
    Mmr,
}

impl FromStr for SearchType {
    type Err = RagError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "similarity" => Ok(Self::Similarity),
            "mmr" => Ok(Self::Mmr),
            other => Err(RagError::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for SearchType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Similarity => f.write_str("similarity"),
            Self::Mmr => f.write_str("mmr"),
        }
    }
}

#[derive(Debug)]
pub struct Retriever {
    index: VectorIndex,
    search_type: String,
    k: usize,
    fetch_k: usize,
    lambda_mult: f32,
}

impl Retriever {
    #[inline]
    pub fn new(index: VectorIndex, config: &RetrievalConfig) -> Self {
        Self {
            index,
            search_type: config.search_type.clone(),
            k: config.k,
            fetch_k: config.fetch_k,
            lambda_mult: config.lambda_mult,
        }
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[inline]
    pub fn search_type(&self) -> &str {
        &self.search_type
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Retrieve chunks for `query` using the configured search type.
    /// `k` overrides the configured result count.
    #[inline]
    pub fn retrieve(&self, query: &str, k: Option<usize>) -> Result<Vec<Document>> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let search_type: SearchType = self.search_type.parse()?;
        let k = k.unwrap_or(self.k);

        let documents = match search_type {
            SearchType::Similarity => self.index.similarity_search(query, k)?,
            SearchType::Mmr => self.index.max_marginal_relevance_search(
                query,
                k,
                self.fetch_k,
                self.lambda_mult,
            )?,
        };

        debug!(
            "Retrieved {} chunks ({}, k={})",
            documents.len(),
            search_type,
            k
        );
        Ok(documents)
    }

    /// Plain similarity search paired with cosine distances, lower is closer
    #[inline]
    pub fn retrieve_with_scores(&self, query: &str, k: Option<usize>) -> Result<Vec<(Document, f32)>> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        self.index
            .similarity_search_with_score(query, k.unwrap_or(self.k))
    }
}
