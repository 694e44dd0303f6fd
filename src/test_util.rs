use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};

use crate::Result;
use crate::embeddings::Embedder;
use crate::generator::FALLBACK_ANSWER;
use crate::llm::LanguageModel;

pub const TEST_DIMENSION: usize = 64;

/// Hashed bag-of-words embedder with call counters
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    documents_embedded: AtomicUsize,
    queries_embedded: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn documents_embedded(&self) -> usize {
        self.documents_embedded.load(Ordering::SeqCst)
    }

    pub fn queries_embedded(&self) -> usize {
        self.queries_embedded.load(Ordering::SeqCst)
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; TEST_DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
    {
        let hash = word
            .to_lowercase()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
                (acc ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        vector[(hash % TEST_DIMENSION as u64) as usize] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

impl Embedder for KeywordEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.documents_embedded
            .fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.queries_embedded.fetch_add(1, Ordering::SeqCst);
        Ok(keyword_vector(text))
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// Language model that answers from the prompt's context section only.
///
/// The last capitalised word of the question is looked up in the context; the
/// first sentence mentioning it is the answer, otherwise the fallback phrase.
#[derive(Debug, Default)]
pub struct GroundedModel {
    pub prompts: Mutex<Vec<String>>,
}

impl GroundedModel {
    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().expect("prompt lock").len()
    }
}

impl LanguageModel for GroundedModel {
    fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .expect("prompt lock")
            .push(prompt.to_string());

        let context = section(prompt, "Context:\n", "\n\nQuestion:\n");
        let question = section(prompt, "Question:\n", "\n\nInstructions:");
        let key = question
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
            .last()
            .unwrap_or_default();

        let answer = context
            .lines()
            .filter(|line| !line.starts_with("Source: "))
            .flat_map(|line| line.split_inclusive(". "))
            .map(str::trim)
            .find(|sentence| !key.is_empty() && sentence.contains(key))
            .map_or_else(|| FALLBACK_ANSWER.to_string(), str::to_string);
        Ok(answer)
    }
}

fn section<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    text.split_once(start)
        .map(|(_, rest)| rest.split_once(end).map_or(rest, |(body, _)| body))
        .unwrap_or_default()
}

/// Write a minimal PDF with one text line per entry, one entry per page
pub fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let page_count = i64::try_from(kids.len()).expect("page count");
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save pdf");
}
