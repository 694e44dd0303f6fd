// Generator module
// Grounded answer generation: retrieve, format the prompt, call the LLM

#[cfg(test)]
mod tests;

pub mod prompt;

use serde::Serialize;
use tracing::{debug, info};

use crate::llm::LanguageModel;
use crate::loader::{Document, DocumentMetadata};
use crate::retriever::Retriever;
use crate::{RagError, Result};

pub use prompt::{FALLBACK_ANSWER, PROMPT_TEMPLATE, build_context, render_prompt};

/// An answer with the attribution of every chunk it was generated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerWithSources {
    pub answer: String,
    pub sources: Vec<DocumentMetadata>,
}

#[derive(Debug)]
pub struct Generator {
    retriever: Retriever,
    llm: Box<dyn LanguageModel>,
}

impl Generator {
    #[inline]
    pub fn new(retriever: Retriever, llm: Box<dyn LanguageModel>) -> Self {
        Self { retriever, llm }
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `query` from retrieved context. The model's reply is returned verbatim.
    #[inline]
    pub fn generate(&self, query: &str, k: Option<usize>) -> Result<String> {
        let (answer, _) = self.answer(query, k)?;
        Ok(answer)
    }

    /// Like [`Self::generate`], also reporting the retrieved chunks' metadata
    /// in retrieval order
    #[inline]
    pub fn generate_with_sources(&self, query: &str, k: Option<usize>) -> Result<AnswerWithSources> {
        let (answer, documents) = self.answer(query, k)?;
        Ok(AnswerWithSources {
            answer,
            sources: documents.into_iter().map(|doc| doc.metadata).collect(),
        })
    }

    fn answer(&self, query: &str, k: Option<usize>) -> Result<(String, Vec<Document>)> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }

        let documents = self.retriever.retrieve(query, k)?;
        let context = build_context(&documents);
        let prompt = render_prompt(&context, query);

        debug!(
            "Prompting LLM with {} chunks ({} chars of context)",
            documents.len(),
            context.chars().count()
        );
        let answer = self.llm.invoke(&prompt)?;
        info!("Generated answer from {} chunks", documents.len());

        Ok((answer, documents))
    }
}
