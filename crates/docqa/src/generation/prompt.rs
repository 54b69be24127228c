//! Prompt templates for document-grounded answers

use crate::types::response::NOT_FOUND_ANSWER;
use crate::types::Chunk;

/// Prompt builder for compliance-style Q&A
pub struct PromptBuilder;

impl PromptBuilder {
    /// Label a chunk with its source and page so the model can cite it
    pub fn format_document(chunk: &Chunk) -> String {
        let page = chunk
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        format!("(source={}, page={})\n{}", chunk.source, page, chunk.text)
    }

    /// Join labelled chunks into the context block, separated by blank lines
    pub fn build_context<'a, I>(chunks: I) -> String
    where
        I: IntoIterator<Item = &'a Chunk>,
    {
        chunks
            .into_iter()
            .map(Self::format_document)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full question-answering prompt
    pub fn build_qa_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a compliance assistant. Answer ONLY using the provided context.

Rules:
- If the answer is explicitly stated in the context, answer it.
- If the context contains partial information, answer what is known and list missing items under "Missing:".
- If the answer is NOT in the context, respond exactly: "{not_found}"
- Always include an "Evidence:" section with up to 2 short excerpts (max 25 words each) copied from the context,
  and include the page number shown in the context labels.

Context:
{context}

Question:
{question}

Answer:"#,
            not_found = NOT_FOUND_ANSWER,
            context = context,
            question = question,
        )
    }
}
