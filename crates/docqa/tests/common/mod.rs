//! Shared fixtures for API tests: scripted providers and multipart bodies

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use parking_lot::Mutex;

use docqa::providers::{Completion, EmbeddingProvider, Embeddings, LlmProvider, TokenUsage};
use docqa::{AppState, Error, RagConfig, RagServer, Result};

pub const BOUNDARY: &str = "docqa-test-boundary";

/// Embeds text as keyword counts over a fixed vocabulary, plus a bias term
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .vocabulary
            .iter()
            .map(|w| text.matches(w.as_str()).count() as f32)
            .collect();
        vector.push(0.01);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Embeddings> {
        Ok(Embeddings {
            vectors: texts.iter().map(|t| self.vector(t)).collect(),
            usage: TokenUsage::new(texts.len() as u64, 0),
        })
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len() + 1
    }

    fn name(&self) -> &str {
        "keyword"
    }

    fn model(&self) -> &str {
        "text-embedding-3-large"
    }
}

type Script = Box<dyn Fn(&str, &str) -> Result<String> + Send + Sync>;

/// LLM that answers through a closure and records the questions it saw
pub struct ScriptedLlm {
    script: Script,
    questions: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, &str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate_answer(&self, question: &str, context: &str) -> Result<Completion> {
        self.questions.lock().push(question.to_string());
        let text = (self.script)(question, context)?;
        Ok(Completion {
            text,
            usage: TokenUsage::new(200, 20),
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "gpt-4o-mini"
    }
}

/// LLM that fails every call
pub fn failing_llm() -> ScriptedLlm {
    ScriptedLlm::new(|_, _| Err(Error::llm("service unavailable")))
}

/// Router backed by scripted providers
pub fn router_with(config: RagConfig, llm: Arc<ScriptedLlm>) -> Router {
    let embedder = Arc::new(KeywordEmbedder::new(&["encryption", "backup", "retention"]));
    let state = AppState::with_providers(config, embedder, llm).expect("valid test config");
    RagServer::with_state(state).build_router()
}

pub fn router(llm: Arc<ScriptedLlm>) -> Router {
    router_with(RagConfig::default(), llm)
}

/// One multipart file part
pub struct Part<'a> {
    pub field: &'a str,
    pub filename: &'a str,
    pub data: Vec<u8>,
}

impl<'a> Part<'a> {
    pub fn new(field: &'a str, filename: &'a str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            field,
            filename,
            data: data.into(),
        }
    }

    pub fn document(filename: &'a str, data: impl Into<Vec<u8>>) -> Self {
        Self::new("document_file", filename, data)
    }

    pub fn questions(filename: &'a str, data: impl Into<Vec<u8>>) -> Self {
        Self::new("questions_file", filename, data)
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.field, part.filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn answer_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/answer")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("valid request")
}

/// Same as [`answer_request`], with the body delivered in `frame_size` frames
pub fn streamed_answer_request(parts: &[Part<'_>], frame_size: usize) -> Request<Body> {
    let frames: Vec<std::io::Result<Vec<u8>>> = multipart_body(parts)
        .chunks(frame_size)
        .map(|frame| Ok(frame.to_vec()))
        .collect();

    Request::builder()
        .method("POST")
        .uri("/answer")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from_stream(futures::stream::iter(frames)))
        .expect("valid request")
}

/// Small policy document as a JSON upload
pub fn policy_json() -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "backup": "Backups run nightly and are kept for 30 days.",
        "encryption": "Data at rest uses AES-256 encryption.",
    }))
    .expect("serializable")
}
