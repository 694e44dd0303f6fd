// Configuration management module
// TOML settings for document paths, embedding server, LLM, chunking and retrieval

pub mod settings;


pub use settings::{
    ChunkingConfig, Config, ConfigError, EmbeddingConfig, LlmConfig, PathsConfig,
    RetrievalConfig, VectorStoreConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
