use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::super::AppState;
use super::super::auth::Caller;
use crate::core::ingest::split_into_sentences;

#[derive(serde::Deserialize)]
pub struct IngestRequest {
    title: String,
    #[serde(default)]
    original_filename: Option<String>,
    text: String,
}

/// Ingest extracted study text: segment into sentences and store the
/// document under the calling identity.
pub async fn ingest_document(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<IngestRequest>,
) -> Response {
    let title = payload.title.trim();
    if title.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "No title provided" })),
        )
            .into_response();
    }

    let sentences = split_into_sentences(&payload.text);
    if sentences.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Could not extract sentences from text" })),
        )
            .into_response();
    }

    match state
        .store
        .create_document(
            &caller.0,
            title,
            payload.original_filename.as_deref(),
            &sentences,
        )
        .await
    {
        Ok(doc) => Json(serde_json::json!({
            "documentId": doc.id,
            "sentenceCount": sentences.len(),
        }))
        .into_response(),
        Err(e) => {
            error!("Document insert error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to save document" })),
            )
                .into_response()
        }
    }
}
