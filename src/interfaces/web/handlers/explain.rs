use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
};
use tokio_stream::StreamExt;

use super::super::AppState;
use crate::core::explain::{build_explain_prompt, run_explain_stream};

#[derive(serde::Deserialize)]
pub struct ExplainRequest {
    #[serde(rename = "sentenceContent")]
    sentence_content: String,
    #[serde(rename = "documentTitle", default)]
    document_title: Option<String>,
}

/// Stream a tutor-style explanation of one sentence. Deltas are forwarded
/// as they arrive; `[DONE]` / `[ERROR]` terminate the stream.
pub async fn stream_explanation(
    State(state): State<AppState>,
    Json(payload): Json<ExplainRequest>,
) -> Response {
    if payload.sentence_content.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "No sentence provided" })),
        )
            .into_response();
    }

    let prompt = build_explain_prompt(
        &payload.sentence_content,
        payload.document_title.as_deref().unwrap_or_default(),
    );

    let (tx, rx) = tokio::sync::mpsc::channel::<String>(32);
    tokio::spawn(run_explain_stream(state.llm.clone(), prompt, tx));

    let stream = tokio_stream::wrappers::ReceiverStream::new(rx)
        .map(|msg| Ok::<_, Infallible>(Event::default().data(msg)));

    Sse::new(stream).into_response()
}
