pub(crate) mod auth;
mod handlers;
mod router;

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::info;

use crate::core::config::Config;
use crate::core::llm::LlmProvider;
use crate::core::store::StudyStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: StudyStore,
    pub(crate) llm: Arc<dyn LlmProvider>,
    pub(crate) log_tx: tokio::sync::broadcast::Sender<String>,
    pub(crate) api_host: String,
    pub(crate) api_port: u16,
}

pub async fn serve(
    config: &Config,
    store: StudyStore,
    llm: Arc<dyn LlmProvider>,
    log_tx: tokio::sync::broadcast::Sender<String>,
) -> Result<()> {
    let state = AppState {
        store,
        llm,
        log_tx,
        api_host: config.api_host.clone(),
        api_port: config.api_port,
    };
    let app = router::build_api_router(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("cram API running at http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

// --- SSE log tail (used by router) ---

async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(line) => Ok(Event::default().data(line)),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });

    Sse::new(stream)
}
