use super::*;
use crate::config::RetrievalConfig;
use crate::test_util::{GroundedModel, KeywordEmbedder};
use crate::vectorstore::{StoreBackend, VectorStoreManager};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Records prompts and replies with a fixed string
#[derive(Debug, Default)]
struct EchoModel {
    prompts: Arc<Mutex<Vec<String>>>,
}

impl LanguageModel for EchoModel {
    fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(prompt.to_string());
        Ok("  raw model reply \n".to_string())
    }
}

fn geography() -> Vec<Document> {
    vec![
        Document::new("The capital of France is Paris.", "geo.pdf", 1),
        Document::new("Mount Everest is in Nepal.", "geo.pdf", 2),
        Document::new("The Nile flows through Egypt.", "rivers.pdf", 4),
    ]
}

fn retriever(temp_dir: &TempDir, search_type: &str, k: usize) -> Retriever {
    let index = VectorStoreManager::new(temp_dir.path(), Arc::new(KeywordEmbedder::default()))
        .with_backend(StoreBackend::Memory)
        .create(&geography())
        .expect("should create index");
    Retriever::new(
        index,
        &RetrievalConfig {
            search_type: search_type.to_string(),
            k,
            ..RetrievalConfig::default()
        },
    )
}

#[test]
fn empty_context_is_empty_string() {
    assert_eq!(build_context(&[]), "");
}

#[test]
fn context_blocks_carry_source_and_page() {
    let context = build_context(&geography());

    let blocks: Vec<&str> = context.split("\n\n").collect();
    assert_eq!(blocks.len(), 3);
    assert_eq!(
        blocks[0],
        "Source: geo.pdf (Page 1)\nThe capital of France is Paris."
    );
    assert_eq!(blocks[1], "Source: geo.pdf (Page 2)\nMount Everest is in Nepal.");
    assert_eq!(
        blocks[2],
        "Source: rivers.pdf (Page 4)\nThe Nile flows through Egypt."
    );
}

#[test]
fn prompt_template_layout() {
    let prompt = render_prompt("CTX", "QUESTION?");

    assert!(prompt.starts_with(
        "You are a helpful AI assistant. Answer ONLY using the provided context.\n\nContext:\nCTX\n\nQuestion:\nQUESTION?\n\nInstructions:\n"
    ));
    assert!(prompt.contains(&format!("- If not found, say \"{FALLBACK_ANSWER}\"")));
    assert!(prompt.ends_with("Answer:\n"));
}

#[test]
fn placeholders_inside_chunks_are_kept() {
    let prompt = render_prompt("literal {question} text", "real question");

    assert!(prompt.contains("Context:\nliteral {question} text\n"));
    assert!(prompt.contains("Question:\nreal question\n"));
}

#[test]
fn blank_query_never_reaches_model() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let model = EchoModel::default();
    let prompts = Arc::clone(&model.prompts);
    let generator = Generator::new(retriever(&temp_dir, "mmr", 3), Box::new(model));

    assert!(matches!(generator.generate("  ", None), Err(RagError::EmptyQuery)));
    assert!(matches!(
        generator.generate_with_sources("", None),
        Err(RagError::EmptyQuery)
    ));
    assert!(prompts.lock().expect("prompt lock").is_empty());
}

#[test]
fn model_reply_returned_verbatim() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let model = EchoModel::default();
    let prompts = Arc::clone(&model.prompts);
    let generator = Generator::new(retriever(&temp_dir, "similarity", 1), Box::new(model));

    let answer = generator
        .generate("What is the capital of France?", None)
        .expect("generate");

    assert_eq!(answer, "  raw model reply \n");
    let prompts = prompts.lock().expect("prompt lock");
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Source: geo.pdf (Page 1)\nThe capital of France is Paris."));
    assert!(prompts[0].contains("Question:\nWhat is the capital of France?\n"));
}

#[test]
fn empty_retrieval_still_calls_model() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let model = EchoModel::default();
    let prompts = Arc::clone(&model.prompts);
    let generator = Generator::new(retriever(&temp_dir, "similarity", 3), Box::new(model));

    generator
        .generate("What is the capital of France?", Some(0))
        .expect("generate");

    let prompts = prompts.lock().expect("prompt lock");
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Context:\n\n\nQuestion:"));
}

#[test]
fn sources_follow_retrieval_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let model = GroundedModel::default();
    let generator = Generator::new(retriever(&temp_dir, "similarity", 2), Box::new(model));

    let expected: Vec<DocumentMetadata> = generator
        .retriever()
        .retrieve("What is the capital of France?", Some(2))
        .expect("retrieve")
        .into_iter()
        .map(|doc| doc.metadata)
        .collect();
    let result = generator
        .generate_with_sources("What is the capital of France?", Some(2))
        .expect("generate");

    assert_eq!(result.answer, "The capital of France is Paris.");
    assert_eq!(result.sources, expected);
    assert_eq!(
        result.sources[0],
        DocumentMetadata {
            source: "geo.pdf".to_string(),
            page: 1
        }
    );
}

#[test]
fn answer_with_sources_serializes() {
    let result = AnswerWithSources {
        answer: "Paris".to_string(),
        sources: vec![DocumentMetadata {
            source: "geo.pdf".to_string(),
            page: 1,
        }],
    };

    let json = serde_json::to_value(&result).expect("serialize");

    assert_eq!(
        json,
        serde_json::json!({"answer": "Paris", "sources": [{"source": "geo.pdf", "page": 1}]})
    );
}
