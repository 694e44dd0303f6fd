// Pipeline module
// Composition root: loader, embedder, vector store, retriever and generator


use std::sync::Arc;

use tracing::info;

use crate::Result;
use crate::config::Config;
use crate::embeddings::{Embedder, EmbeddingProvider};
use crate::generator::{AnswerWithSources, Generator};
use crate::llm::{ChatClient, LanguageModel};
use crate::loader::DocumentLoader;
use crate::retriever::Retriever;
use crate::vectorstore::VectorStoreManager;

/// End-to-end question answering over the configured PDF directory
#[derive(Debug)]
pub struct RagPipeline {
    generator: Generator,
}

impl RagPipeline {
    /// Build the pipeline with the Ollama embedder and chat-completions LLM
    /// described by `config`
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let embedder = EmbeddingProvider::new(config.embedding.clone()).get_model()?;
        let llm = ChatClient::new(&config.llm)?;
        Self::from_components(config, embedder, Box::new(llm))
    }

    /// Build the pipeline around caller-supplied embedding and LLM capabilities
    #[inline]
    pub fn from_components(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        llm: Box<dyn LanguageModel>,
    ) -> Result<Self> {
        info!("Initializing RAG pipeline");

        let loader = DocumentLoader::from_config(&config.paths, &config.chunking);
        let chunks = loader.load_and_split()?;
        info!("Prepared {} chunks", chunks.len());

        info!("Using embedding model {}", embedder.model_name());
        let manager = VectorStoreManager::new(config.vectorstore_dir(), embedder)
            .with_backend(config.vector_store.backend);
        let index = manager.get_or_create(Some(&chunks))?;

        let retriever = Retriever::new(index, &config.retrieval);
        let generator = Generator::new(retriever, llm);

        info!("RAG pipeline ready");
        Ok(Self { generator })
    }

    #[inline]
    pub fn query(&self, question: &str, k: Option<usize>) -> Result<String> {
        self.generator.generate(question, k)
    }

    #[inline]
    pub fn query_with_sources(&self, question: &str, k: Option<usize>) -> Result<AnswerWithSources> {
        self.generator.generate_with_sources(question, k)
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever {
        self.generator.retriever()
    }
}
