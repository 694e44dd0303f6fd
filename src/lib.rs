use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Chunks list is empty, cannot create vector store")]
    EmptyInput,

    #[error("Vector store does not exist at {}, chunks are required to create one", .0.display())]
    MissingInput(PathBuf),

    #[error("No vector store found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported search type: {0}")]
    UnsupportedMode(String),

    #[error("Failed to load documents from {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod config;
pub mod embeddings;
pub mod generator;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod retriever;
pub mod vectorstore;

#[cfg(test)]
mod test_util;
