use itertools::Itertools;

use crate::loader::Document;

/// Reply the model is told to give when the context lacks the answer
pub const FALLBACK_ANSWER: &str = "Answer not found in documents";

pub const PROMPT_TEMPLATE: &str = "You are a helpful AI assistant. Answer ONLY using the provided context.

Context:
{context}

Question:
{question}

Instructions:
- Answer accurately
- Use only context
- Do not hallucinate
- If not found, say \"Answer not found in documents\"

Answer:
";

/// Render retrieved chunks as attributed blocks separated by blank lines
#[inline]
pub fn build_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|doc| {
            format!(
                "Source: {} (Page {})\n{}",
                doc.metadata.source, doc.metadata.page, doc.text
            )
        })
        .join("\n\n")
}

/// Fill the template. The context is substituted last so chunk text that
/// happens to contain `{question}` is left alone.
#[inline]
pub fn render_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replacen("{question}", question, 1)
        .replacen("{context}", context, 1)
}
