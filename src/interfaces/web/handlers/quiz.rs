use std::convert::Infallible;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
};
use tokio_stream::StreamExt;
use tracing::error;

use super::super::AppState;
use super::super::auth::Caller;
use crate::core::quiz::{build_quiz_prompt, run_quiz_stream};

#[derive(serde::Deserialize)]
pub struct QuizRequest {
    #[serde(rename = "documentId")]
    document_id: String,
}

/// Generate a quiz for a document, streaming questions over SSE as they
/// complete. Everything that can fail cleanly (authorization, material
/// lookup, the header insert) happens before the stream opens; after that
/// the only terminal signals are the `[DONE]` sentinel and the error
/// frame.
pub async fn stream_quiz(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<QuizRequest>,
) -> Response {
    let doc = match state
        .store
        .fetch_document(&payload.document_id, &caller.0)
        .await
    {
        Ok(Some(doc)) => doc,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Not found" })),
            )
                .into_response();
        }
        Err(e) => {
            error!("Quiz generation: document lookup failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to fetch document" })),
            )
                .into_response();
        }
    };

    let sentences = match state.store.fetch_sentences(&doc.id).await {
        Ok(s) => s,
        Err(e) => {
            error!("Quiz generation: sentence fetch failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to fetch sentences" })),
            )
                .into_response();
        }
    };
    let material = sentences
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = build_quiz_prompt(&doc.title, &material);

    let quiz = match state.store.create_quiz(&doc.id).await {
        Ok(q) => q,
        Err(e) => {
            error!("Quiz generation: header insert failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to save quiz" })),
            )
                .into_response();
        }
    };

    let (tx, rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(run_quiz_stream(
        state.store.clone(),
        state.llm.clone(),
        quiz.id,
        prompt,
        tx,
    ));

    let stream = tokio_stream::wrappers::ReceiverStream::new(rx)
        .map(|msg| Ok::<_, Infallible>(Event::default().data(msg)));

    Sse::new(stream).into_response()
}

/// Replay a persisted quiz in position order — the same sequence the live
/// session streamed.
pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(quiz_id): Path<String>,
) -> Response {
    match state.store.fetch_quiz(&quiz_id, &caller.0).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Not found" })),
            )
                .into_response();
        }
        Err(e) => {
            error!("Quiz lookup failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to fetch quiz" })),
            )
                .into_response();
        }
    }

    match state.store.fetch_quiz_questions(&quiz_id).await {
        Ok(questions) => Json(questions).into_response(),
        Err(e) => {
            error!("Quiz question fetch failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to fetch quiz questions" })),
            )
                .into_response()
        }
    }
}
