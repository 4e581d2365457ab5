use axum::{
    Json,
    extract::{Path, State},
};
use tracing::error;

use super::super::AppState;

#[derive(serde::Deserialize)]
pub struct CreateTokenRequest {
    name: String,
}

pub async fn create_token(
    State(state): State<AppState>,
    Json(payload): Json<CreateTokenRequest>,
) -> Json<serde_json::Value> {
    match state.store.create_api_token(&payload.name).await {
        Ok((raw_token, record)) => Json(serde_json::json!({
            "success": true,
            "token": raw_token,
            "record": record,
        })),
        Err(e) => {
            error!("Token creation failed: {}", e);
            Json(serde_json::json!({ "success": false, "error": e.to_string() }))
        }
    }
}

pub async fn list_tokens(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.store.list_api_tokens().await {
        Ok(tokens) => Json(serde_json::json!({ "success": true, "tokens": tokens })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

pub async fn delete_token(
    State(state): State<AppState>,
    Path(token_id): Path<String>,
) -> Json<serde_json::Value> {
    match state.store.delete_api_token(&token_id).await {
        Ok(true) => Json(serde_json::json!({ "success": true })),
        Ok(false) => Json(serde_json::json!({ "success": false, "error": "Token not found" })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}
