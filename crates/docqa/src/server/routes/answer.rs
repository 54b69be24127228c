//! Question answering endpoint

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use futures::stream::{self, StreamExt};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::processing::run_with_timeout;
use crate::providers::usage::round_usd;
use crate::server::state::AppState;
use crate::types::document::extension_of;
use crate::types::{AnswerSheet, AnswerStatus, FileType, QuestionBatch};

const DOCUMENT_FIELD: &str = "document_file";
const QUESTIONS_FIELD: &str = "questions_file";

/// An uploaded multipart file
struct Upload {
    filename: String,
    data: Bytes,
}

/// POST /answer - Answer a batch of questions about one document
pub async fn answer_questions(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnswerSheet>> {
    let start = Instant::now();
    let server = &state.config().server;

    let mut document = None;
    let mut questions_file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&state, None, e))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != DOCUMENT_FIELD && name != QUESTIONS_FIELD {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(&state, Some(&name), e))?;
        let upload = Upload { filename, data };

        if name == DOCUMENT_FIELD {
            document = Some(upload);
        } else {
            questions_file = Some(upload);
        }
    }

    let document = document.ok_or_else(|| missing_field(DOCUMENT_FIELD))?;
    let questions_file = questions_file.ok_or_else(|| missing_field(QUESTIONS_FIELD))?;

    // Upload validation, all before any parsing or API call
    if FileType::from_filename(&document.filename).is_none() {
        return Err(Error::UnsupportedFileType(extension_of(&document.filename)));
    }
    if document.data.len() > server.max_document_bytes {
        return Err(Error::FileTooLarge {
            limit_mb: server.max_document_mb(),
        });
    }
    if extension_of(&questions_file.filename) != ".json" {
        return Err(Error::BadRequest(format!(
            "{} must be a JSON file",
            QUESTIONS_FIELD
        )));
    }
    if questions_file.data.len() > server.max_questions_bytes {
        return Err(Error::FileTooLarge {
            limit_mb: server.max_questions_mb(),
        });
    }
    let batch = QuestionBatch::parse(&questions_file.data, server.max_questions)?;

    tracing::info!(
        filename = %document.filename,
        bytes = document.data.len(),
        questions = batch.len(),
        "Processing answer request"
    );

    let knowledge = run_with_timeout(
        "document processing",
        state.config().processing.document_timeout(),
        state
            .pipeline()
            .ingest(&document.filename, document.data.to_vec()),
    )
    .await?;

    let synthesizer = &state.synthesizer();
    let retriever = &knowledge.retriever;
    let concurrency = state.config().llm.max_concurrent_requests.max(1);
    let texts: Vec<String> = batch.into_questions().into_iter().map(|q| q.text).collect();

    let results: Vec<_> = stream::iter(texts)
        .map(move |text| async move {
            let answered = synthesizer.answer(retriever, &text).await;
            (text, answered)
        })
        .buffered(concurrency)
        .collect()
        .await;

    let mut total_usage = knowledge.usage;
    let mut total_cost = knowledge.usage.estimated_cost_usd(state.embedding_model());
    let mut sheet = AnswerSheet::new();
    for (text, answered) in results {
        total_usage += answered.embedding_usage + answered.llm_usage;
        total_cost += answered.cost_usd(state.embedding_model(), state.llm_model());
        sheet.push(text, answered.answer);
    }

    tracing::info!(
        event = "processed_request",
        duration_ms = start.elapsed().as_millis() as u64,
        question_count = sheet.len(),
        chunks = knowledge.chunk_count,
        found = sheet.count_status(AnswerStatus::Found),
        partial = sheet.count_status(AnswerStatus::Partial),
        not_found = sheet.count_status(AnswerStatus::NotFound),
        errors = sheet.count_status(AnswerStatus::Error),
        total_tokens = total_usage.total_tokens,
        total_cost_usd = round_usd(total_cost),
        "processed_request"
    );

    Ok(Json(sheet))
}

fn missing_field(name: &str) -> Error {
    Error::BadRequest(format!("{} is required", name))
}

/// Body limit rejections surface as an oversized upload, reporting the limit of
/// the field being read; anything else is malformed input
fn multipart_error(state: &AppState, field: Option<&str>, err: MultipartError) -> Error {
    if err.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return Error::BadRequest(format!("Invalid multipart body: {}", err.body_text()));
    }

    let server = &state.config().server;
    match field {
        Some(QUESTIONS_FIELD) => Error::FileTooLarge {
            limit_mb: server.max_questions_mb(),
        },
        Some(_) => Error::FileTooLarge {
            limit_mb: server.max_document_mb(),
        },
        None => Error::BadRequest(format!(
            "Request body too large. Limit is {}MB",
            server.answer_body_limit() / (1024 * 1024)
        )),
    }
}
