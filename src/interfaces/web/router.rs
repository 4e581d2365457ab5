use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::auth;
use super::handlers::{documents, explain, quiz, tokens};

fn build_localhost_cors(api_port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", api_port),
        format!("http://localhost:{}", api_port),
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

pub(crate) fn build_api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/documents", post(documents::ingest_document))
        .route("/api/quiz", post(quiz::stream_quiz))
        .route("/api/quiz/{quiz_id}", get(quiz::get_quiz))
        .route("/api/explain", post(explain::stream_explanation))
        .route(
            "/api/tokens",
            get(tokens::list_tokens).post(tokens::create_token),
        )
        .route(
            "/api/tokens/{token_id}",
            axum::routing::delete(tokens::delete_token),
        )
        .route("/api/logs", get(super::sse_logs_endpoint))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .layer(middleware::from_fn(security_headers))
        .layer(build_localhost_cors(state.api_port))
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extractor::QuestionDraft;
    use crate::core::llm::testing::ScriptedProvider;
    use crate::core::store::StudyStore;
    use axum::http::StatusCode;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tower::util::ServiceExt;

    const Q1: &str = r#"{"question":"2+2?","options":["3","4","5","6"],"correct_answer":1,"explanation":"basic math"}"#;
    const Q2: &str = r#"{"question":"Capital of France?","options":["Berlin","Paris","Rome","Madrid"],"correct_answer":1,"explanation":"geo"}"#;

    async fn test_state(chunks: &[&str]) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp test dir");
        let store = StudyStore::open(dir.path()).await.expect("store opens");
        let (log_tx, _) = tokio::sync::broadcast::channel(16);
        let state = AppState {
            store,
            llm: Arc::new(ScriptedProvider::ok(chunks)),
            log_tx,
            api_host: "127.0.0.1".to_string(),
            api_port: 7470,
        };
        (state, dir)
    }

    async fn json_request(
        app: Router,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let body = match body {
            Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
            None => Body::empty(),
        };

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&body_bytes).unwrap_or(serde_json::json!({}));
        (status, json)
    }

    /// Collect the data payloads of an SSE response body.
    async fn sse_request(
        app: Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<String>) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let text = String::from_utf8_lossy(&body_bytes);
        let frames = text
            .lines()
            .filter_map(|line| line.strip_prefix("data: ").map(|d| d.to_string()))
            .collect();
        (status, frames)
    }

    #[tokio::test]
    async fn security_headers_present_on_responses() {
        let (state, _dir) = test_state(&[]).await;
        let app = build_api_router(state);

        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/tokens")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn ingest_document_segments_and_stores_sentences() {
        let (state, _dir) = test_state(&[]).await;
        let app = build_api_router(state.clone());

        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/documents",
            Some(serde_json::json!({
                "title": "Biology",
                "original_filename": "biology.pdf",
                "text": "The cell is the basic unit of life. Mitochondria produce energy for the cell.",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sentenceCount"], 2);
        let document_id = json["documentId"].as_str().expect("document id");

        let sentences = state.store.fetch_sentences(document_id).await.unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].position, 0);
        assert_eq!(sentences[0].content, "The cell is the basic unit of life.");
        assert_eq!(sentences[0].understanding, "not_understood");
    }

    #[tokio::test]
    async fn ingest_rejects_text_without_sentences() {
        let (state, _dir) = test_state(&[]).await;
        let app = build_api_router(state);

        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/documents",
            Some(serde_json::json!({ "title": "Empty", "text": "tiny" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("sentences"));
    }

    #[tokio::test]
    async fn quiz_stream_rejects_unknown_document_before_streaming() {
        let (state, _dir) = test_state(&[]).await;
        let app = build_api_router(state);

        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/quiz",
            Some(serde_json::json!({ "documentId": "missing" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Not found");
    }

    #[tokio::test]
    async fn quiz_stream_delivers_question_frames_then_done() {
        let chunks = ["Sure! [", Q1, ",", Q2, "]"];
        let (state, _dir) = test_state(&chunks).await;
        let doc = state
            .store
            .create_document("local", "Math", None, &["Two plus two is four.".to_string()])
            .await
            .unwrap();

        let app = build_api_router(state);
        let (status, frames) = sse_request(
            app,
            "/api/quiz",
            serde_json::json!({ "documentId": doc.id }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(frames.len(), 3);
        let first: serde_json::Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(first["question"], "2+2?");
        assert_eq!(first["position"], 0);
        let second: serde_json::Value = serde_json::from_str(&frames[1]).unwrap();
        assert_eq!(second["position"], 1);
        assert_eq!(frames[2], "[DONE]");
    }

    #[tokio::test]
    async fn quiz_replay_returns_questions_in_position_order() {
        let (state, _dir) = test_state(&[]).await;
        let doc = state
            .store
            .create_document("local", "Math", None, &["Two plus two is four.".to_string()])
            .await
            .unwrap();
        let quiz = state.store.create_quiz(&doc.id).await.unwrap();

        // Writes land out of order under concurrent slow persistence;
        // replay must not depend on insertion order.
        let q1: QuestionDraft = serde_json::from_str(Q1).unwrap();
        let q2: QuestionDraft = serde_json::from_str(Q2).unwrap();
        state.store.insert_question(&quiz.id, &q2, 1).await.unwrap();
        state.store.insert_question(&quiz.id, &q1, 0).await.unwrap();

        let app = build_api_router(state);
        let (status, json) = json_request(
            app,
            Method::GET,
            &format!("/api/quiz/{}", quiz.id),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let questions = json.as_array().expect("question array");
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0]["position"], 0);
        assert_eq!(questions[0]["question"], "2+2?");
        assert_eq!(questions[1]["position"], 1);
        assert_eq!(questions[1]["question"], "Capital of France?");
    }

    #[tokio::test]
    async fn quiz_replay_unknown_id_returns_not_found() {
        let (state, _dir) = test_state(&[]).await;
        let app = build_api_router(state);
        let (status, _) = json_request(app, Method::GET, "/api/quiz/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn explain_requires_a_sentence() {
        let (state, _dir) = test_state(&[]).await;
        let app = build_api_router(state);
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/explain",
            Some(serde_json::json!({ "sentenceContent": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No sentence provided");
    }

    #[tokio::test]
    async fn explain_streams_deltas_then_done() {
        let (state, _dir) = test_state(&["ATP is ", "cellular fuel."]).await;
        let app = build_api_router(state);
        let (status, frames) = sse_request(
            app,
            "/api/explain",
            serde_json::json!({ "sentenceContent": "Mitochondria produce ATP." }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(frames, vec!["ATP is ", "cellular fuel.", "[DONE]"]);
    }

    #[tokio::test]
    async fn token_create_list_delete_roundtrip() {
        let (state, _dir) = test_state(&[]).await;

        let app = build_api_router(state.clone());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/tokens",
            Some(serde_json::json!({ "name": "laptop" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        let raw = json["token"].as_str().unwrap();
        assert!(raw.starts_with("crk_"));
        let token_id = json["record"]["id"].as_str().unwrap().to_string();

        // Once a token exists the API requires it.
        let app = build_api_router(state.clone());
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/tokens")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let app = build_api_router(state.clone());
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/tokens")
            .header("authorization", format!("Bearer {}", raw))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(json["tokens"].as_array().unwrap().len(), 1);

        let app = build_api_router(state);
        let req = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/tokens/{}", token_id))
            .header("authorization", format!("Bearer {}", raw))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn method_not_allowed_returns_405() {
        let (state, _dir) = test_state(&[]).await;
        let app = build_api_router(state);
        let req = Request::builder()
            .method(Method::PATCH)
            .uri("/api/documents")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn api_route_contract_has_all_expected_paths() {
        let paths = [
            "/api/documents",
            "/api/quiz",
            "/api/quiz/quiz_1",
            "/api/explain",
            "/api/tokens",
            "/api/tokens/token_1",
            "/api/logs",
        ];

        let unique: HashSet<&str> = paths.iter().copied().collect();
        assert_eq!(unique.len(), paths.len(), "Duplicate routes in contract");

        let (state, _dir) = test_state(&[]).await;
        let app = build_api_router(state);
        for path in paths {
            let req = Request::builder()
                .method(Method::PUT)
                .uri(path)
                .body(Body::empty())
                .expect("request should build");
            let resp = app
                .clone()
                .oneshot(req)
                .await
                .expect("router oneshot should succeed");
            assert_ne!(
                resp.status(),
                StatusCode::NOT_FOUND,
                "Route missing from router: {}",
                path
            );
        }
    }
}
