//! PDF loading and chunking


pub mod splitter;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ChunkingConfig, PathsConfig};
use crate::{RagError, Result};

pub use splitter::{DEFAULT_SEPARATORS, RecursiveCharacterSplitter};

/// A span of document text with its source attribution.
///
/// Loaded pages and the chunks split from them share this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Where a piece of text came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Path of the source PDF
    pub source: String,
    /// 1-based page number within the source, as PDF viewers show it.
    /// Loaders that report a 0-based page index will be one lower.
    pub page: u32,
}

impl Document {
    #[inline]
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                page,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    data_dir: PathBuf,
    splitter: RecursiveCharacterSplitter,
}

impl DocumentLoader {
    #[inline]
    pub fn new(data_dir: impl Into<PathBuf>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            splitter: RecursiveCharacterSplitter::new(chunk_size, chunk_overlap),
        }
    }

    #[inline]
    pub fn from_config(paths: &PathsConfig, chunking: &ChunkingConfig) -> Self {
        Self::new(
            &paths.data_dir,
            chunking.chunk_size,
            chunking.chunk_overlap,
        )
    }

    #[inline]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load every `*.pdf` in the data directory, one document per page
    #[inline]
    pub fn load_documents(&self) -> Result<Vec<Document>> {
        let entries = fs::read_dir(&self.data_dir).map_err(|e| RagError::Load {
            path: self.data_dir.clone(),
            message: e.to_string(),
        })?;

        let mut pdf_paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RagError::Load {
                path: self.data_dir.clone(),
                message: e.to_string(),
            })?;
            let path = entry.path();
            if path.is_file() && is_pdf(&path) {
                pdf_paths.push(path);
            }
        }
        pdf_paths.sort();

        if pdf_paths.is_empty() {
            warn!(
                "No PDF files found in {}, nothing will be indexed",
                self.data_dir.display()
            );
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for path in &pdf_paths {
            documents.extend(load_pdf(path)?);
        }

        info!(
            "Loaded {} pages from {} PDF files in {}",
            documents.len(),
            pdf_paths.len(),
            self.data_dir.display()
        );
        Ok(documents)
    }

    /// Split pages into overlapping chunks, copying metadata onto each chunk
    #[inline]
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        let chunks: Vec<Document> = documents
            .iter()
            .flat_map(|doc| {
                self.splitter
                    .split_text(&doc.text)
                    .into_iter()
                    .map(|text| Document {
                        text,
                        metadata: doc.metadata.clone(),
                    })
            })
            .collect();

        debug!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );
        chunks
    }

    #[inline]
    pub fn load_and_split(&self) -> Result<Vec<Document>> {
        let documents = self.load_documents()?;
        Ok(self.split_documents(&documents))
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn load_pdf(path: &Path) -> Result<Vec<Document>> {
    debug!("Extracting text from {}", path.display());

    let pdf = lopdf::Document::load(path).map_err(|e| RagError::Load {
        path: path.to_path_buf(),
        message: format!("Failed to parse PDF: {}", e),
    })?;

    let source = path.to_string_lossy().into_owned();
    let mut pages = Vec::new();
    for page_number in pdf.get_pages().into_keys() {
        let text = pdf.extract_text(&[page_number]).map_err(|e| RagError::Load {
            path: path.to_path_buf(),
            message: format!("Failed to extract text from page {}: {}", page_number, e),
        })?;
        pages.push(Document::new(text, source.clone(), page_number));
    }

    debug!("Extracted {} pages from {}", pages.len(), path.display());
    Ok(pages)
}
