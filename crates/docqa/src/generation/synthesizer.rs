//! Answer synthesis: retrieve, prompt, and cite for one question

use std::sync::Arc;

use super::citation::select_citations;
use super::prompt::PromptBuilder;
use crate::error::{Error, Result};
use crate::providers::usage::round_usd;
use crate::providers::{EmbeddingProvider, LlmProvider, TokenUsage};
use crate::retrieval::{RetrievalParams, Retriever};
use crate::types::{Answer, AnswerStatus};

/// Characters of the question kept in log events
const QUESTION_PREVIEW_CHARS: usize = 100;

/// An answer together with the tokens spent producing it
#[derive(Debug, Clone)]
pub struct SynthesizedAnswer {
    /// The answer returned to the client
    pub answer: Answer,
    /// Tokens spent embedding the question
    pub embedding_usage: TokenUsage,
    /// Tokens spent on chat completions, both passes
    pub llm_usage: TokenUsage,
}

impl SynthesizedAnswer {
    fn failed() -> Self {
        Self {
            answer: Answer::error(),
            embedding_usage: TokenUsage::default(),
            llm_usage: TokenUsage::default(),
        }
    }

    /// Estimated cost, pricing each usage at its own model
    pub fn cost_usd(&self, embedding_model: &str, llm_model: &str) -> f64 {
        self.embedding_usage.estimated_cost_usd(embedding_model)
            + self.llm_usage.estimated_cost_usd(llm_model)
    }
}

/// Answers questions against one document's retriever
pub struct AnswerSynthesizer {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    params: RetrievalParams,
    max_citations: usize,
}

impl AnswerSynthesizer {
    /// Create a synthesizer
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        params: RetrievalParams,
        max_citations: usize,
    ) -> Self {
        Self {
            embedder,
            llm,
            params,
            max_citations,
        }
    }

    /// Answer a question. Failures become an error answer instead of an `Err`
    /// so one question never fails the whole batch.
    pub async fn answer(&self, retriever: &Retriever, question: &str) -> SynthesizedAnswer {
        match self.try_answer(retriever, question).await {
            Ok(answered) => answered,
            Err(e) => {
                tracing::error!(
                    question_preview = %preview(question),
                    error = %e,
                    "question failed"
                );
                SynthesizedAnswer::failed()
            }
        }
    }

    async fn try_answer(&self, retriever: &Retriever, question: &str) -> Result<SynthesizedAnswer> {
        let embedded = self.embedder.embed_batch(&[question.to_string()]).await?;
        let embedding_usage = embedded.usage;
        let query = embedded
            .vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("provider returned no embedding for the question"))?;

        let (mut answer, mut llm_usage) = self.attempt(retriever, question, &query, &self.params, 1).await?;

        if answer.status == AnswerStatus::NotFound {
            // Wider recall for this question only; `self.params` stays untouched
            let widened = self.params.widened();
            match self.attempt(retriever, question, &query, &widened, 2).await {
                Ok((second, second_usage)) => {
                    llm_usage += second_usage;
                    if second.status != AnswerStatus::NotFound {
                        answer = second;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        question_preview = %preview(question),
                        error = %e,
                        "widened retrieval pass failed, keeping first answer"
                    );
                }
            }
        }

        Ok(SynthesizedAnswer {
            answer,
            embedding_usage,
            llm_usage,
        })
    }

    /// One retrieve-and-generate pass
    async fn attempt(
        &self,
        retriever: &Retriever,
        question: &str,
        query: &[f32],
        params: &RetrievalParams,
        pass: u32,
    ) -> Result<(Answer, TokenUsage)> {
        let retrieved = retriever.retrieve(query, params);
        let context = PromptBuilder::build_context(retrieved.iter().map(|s| s.chunk));

        let completion = self.llm.generate_answer(question, &context).await?;
        let usage = completion.usage;

        tracing::info!(
            event = "llm_call",
            question_preview = %preview(question),
            pass,
            chunks = retrieved.len(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            total_cost_usd = round_usd(usage.estimated_cost_usd(self.llm.model())),
            "llm_call"
        );

        let citations = select_citations(
            &completion.text,
            retrieved.iter().map(|s| s.chunk),
            self.max_citations,
        );
        Ok((Answer::from_model(&completion.text, citations), usage))
    }
}

fn preview(question: &str) -> String {
    question.chars().take(QUESTION_PREVIEW_CHARS).collect()
}
