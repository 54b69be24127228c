//! Ingestion pipeline orchestration: parse, chunk, embed, index

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::processing::BlockingPool;
use crate::providers::usage::round_usd;
use crate::providers::{EmbeddingProvider, TokenUsage};
use crate::retrieval::{Retriever, VectorIndex};

use super::chunker::TextChunker;
use super::parser::{source_name, FileParser, ParsedDocument};

/// A document indexed for question answering
#[derive(Debug)]
pub struct KnowledgeBase {
    /// MMR retriever over the document's chunks
    pub retriever: Retriever,
    /// Source name used in citations
    pub source: String,
    /// SHA-256 of the uploaded bytes
    pub content_hash: String,
    /// Number of indexed chunks
    pub chunk_count: usize,
    /// Tokens spent embedding the chunks
    pub usage: TokenUsage,
}

/// Main ingestion pipeline
pub struct IngestPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    pool: BlockingPool,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(chunker: TextChunker, embedder: Arc<dyn EmbeddingProvider>, pool: BlockingPool) -> Self {
        Self {
            chunker,
            embedder,
            pool,
        }
    }

    /// Full ingestion: parse on the worker pool, then build the index
    pub async fn ingest(&self, filename: &str, data: Vec<u8>) -> Result<KnowledgeBase> {
        let name = filename.to_string();
        let parsed = self
            .pool
            .run("parse", move || FileParser::parse(&name, &data))
            .await?;

        tracing::info!(
            source = %source_name(filename),
            file_type = parsed.file_type.display_name(),
            pages = ?parsed.total_pages,
            chars = parsed.char_count(),
            "Document parsed"
        );

        self.build(parsed).await
    }

    /// Chunk, embed and index a parsed document
    pub async fn build(&self, parsed: ParsedDocument) -> Result<KnowledgeBase> {
        let source = parsed
            .segments
            .first()
            .map(|s| s.source.clone())
            .unwrap_or_default();
        let content_hash = parsed.content_hash;
        let segments = parsed.segments;

        let chunker = self.chunker.clone();
        let mut chunks = self
            .pool
            .run("chunk", move || Ok(chunker.chunk_segments(&segments)))
            .await?;

        if chunks.is_empty() {
            return Err(Error::EmptyDocument);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.vectors.len()
            )));
        }

        let usage = embeddings.usage;
        tracing::info!(
            event = "embedding_creation",
            model = self.embedder.model(),
            num_chunks = chunks.len(),
            total_tokens = usage.total_tokens,
            total_cost_usd = round_usd(usage.estimated_cost_usd(self.embedder.model())),
            "embedding_creation"
        );

        let chunk_count = chunks.len();
        let mut index = VectorIndex::new();
        for (chunk, vector) in chunks.iter_mut().zip(embeddings.vectors) {
            chunk.embedding = vector;
        }
        for chunk in chunks {
            index.insert(chunk)?;
        }

        Ok(KnowledgeBase {
            retriever: Retriever::new(index),
            source,
            content_hash,
            chunk_count,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::KeywordEmbedder;
    use crate::providers::Embeddings;
    use crate::retrieval::RetrievalParams;
    use crate::types::{FileType, PageSegment};
    use async_trait::async_trait;

    fn pipeline(embedder: Arc<dyn EmbeddingProvider>) -> IngestPipeline {
        IngestPipeline::new(TextChunker::new(20, 4).unwrap(), embedder, BlockingPool::new(2))
    }

    fn keyword_pipeline() -> IngestPipeline {
        pipeline(Arc::new(KeywordEmbedder::new(&["encryption", "backup"])))
    }

    fn parsed(pages: &[&str]) -> ParsedDocument {
        ParsedDocument {
            file_type: FileType::Pdf,
            content_hash: "abc".into(),
            total_pages: Some(pages.len() as u32),
            segments: pages
                .iter()
                .enumerate()
                .map(|(i, text)| PageSegment::new("policy.pdf", Some(i as u32), *text))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_build_indexes_every_chunk() {
        let kb = keyword_pipeline()
            .build(parsed(&["Backup runs nightly.", "Encryption uses AES-256."]))
            .await
            .unwrap();

        assert_eq!(kb.source, "policy.pdf");
        assert_eq!(kb.content_hash, "abc");
        assert_eq!(kb.chunk_count, 2);
        assert_eq!(kb.retriever.index().len(), 2);
        assert_eq!(kb.usage.prompt_tokens, 2);

        let embedder = KeywordEmbedder::new(&["encryption", "backup"]);
        let hits = kb
            .retriever
            .retrieve(&embedder.vector("encryption"), &RetrievalParams::default());
        assert_eq!(hits[0].chunk.page, Some(1));
    }

    #[tokio::test]
    async fn test_long_page_is_split() {
        let page = "backup ".repeat(60);
        let kb = keyword_pipeline().build(parsed(&[&page])).await.unwrap();
        assert!(kb.chunk_count > 1);
        assert!(kb
            .retriever
            .index()
            .chunks()
            .iter()
            .all(|c| c.token_count <= 20 && c.page == Some(0)));
    }

    #[tokio::test]
    async fn test_blank_document_is_empty() {
        let result = keyword_pipeline().build(parsed(&["   ", "\n\n"])).await;
        assert!(matches!(result, Err(Error::EmptyDocument)));
    }

    #[tokio::test]
    async fn test_ingest_json_upload() {
        let body = br#"{"controls": {"backup": "daily", "encryption": "AES-256"}}"#.to_vec();
        let kb = keyword_pipeline().ingest("controls.json", body).await.unwrap();

        assert_eq!(kb.source, "controls.json");
        assert!(kb.chunk_count >= 1);
        assert!(kb.retriever.index().chunks().iter().all(|c| c.page.is_none()));
    }

    #[tokio::test]
    async fn test_ingest_pdf_keeps_pages() {
        let data = crate::ingestion::parser::tests::build_pdf(&["Backup policy", "Encryption policy"]);
        let kb = keyword_pipeline().ingest("soc2.pdf", data).await.unwrap();

        let pages: Vec<Option<u32>> = kb.retriever.index().chunks().iter().map(|c| c.page).collect();
        assert_eq!(pages, vec![Some(0), Some(1)]);
        assert_eq!(kb.source, "soc2.pdf");
        assert_eq!(kb.content_hash.len(), 64);
    }

    #[tokio::test]
    async fn test_ingest_rejects_unsupported_type() {
        let result = keyword_pipeline().ingest("notes.txt", b"hello".to_vec()).await;
        assert!(matches!(result, Err(Error::UnsupportedFileType(ext)) if ext == ".txt"));
    }

    struct DroppingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for DroppingEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Embeddings> {
            Ok(Embeddings {
                vectors: vec![vec![1.0, 0.0]],
                usage: TokenUsage::default(),
            })
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn name(&self) -> &str {
            "dropping"
        }

        fn model(&self) -> &str {
            "dropping"
        }
    }

    #[tokio::test]
    async fn test_embedding_count_mismatch() {
        let result = pipeline(Arc::new(DroppingEmbedder))
            .build(parsed(&["backup one", "backup two"]))
            .await;
        assert!(matches!(result, Err(Error::Embedding(_))));
    }
}
