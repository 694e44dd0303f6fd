// Embeddings module
// Turns chunk texts and queries into vectors via an Ollama embedding server

pub mod ollama;


use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::Result;
use crate::config::EmbeddingConfig;

pub use ollama::OllamaEmbedder;

/// A text embedding capability.
///
/// Implementations must be deterministic for a fixed model and input, and
/// every vector they return must have the same dimension.
pub trait Embedder: Send + Sync + fmt::Debug {
    /// Embed a batch of chunk texts, one vector per input, in input order
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    fn model_name(&self) -> &str;
}

/// Builds the embedding capability described by the configuration
#[derive(Debug, Clone)]
pub struct EmbeddingProvider {
    config: EmbeddingConfig,
}

impl EmbeddingProvider {
    #[inline]
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    /// Create a ready-to-use embedder. No request is sent until first use.
    #[inline]
    pub fn get_model(&self) -> Result<Arc<dyn Embedder>> {
        debug!("Creating embedding model {}", self.config.model);
        let embedder = OllamaEmbedder::new(&self.config)?;
        Ok(Arc::new(embedder))
    }
}
