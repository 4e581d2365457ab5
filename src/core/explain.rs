//! Streaming sentence explanation: the quiz path's structurally identical
//! sibling, minus extraction and persistence. Deltas are forwarded raw and
//! the client renders them as they arrive.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::warn;

use crate::core::llm::{ChatMessage, GenerateRequest, LlmProvider};

pub const DONE_FRAME: &str = "[DONE]";
pub const ERROR_FRAME: &str = "[ERROR]";

const EXPLAIN_MAX_TOKENS: u32 = 500;
const EXPLAIN_TEMPERATURE: f32 = 0.7;

pub fn build_explain_prompt(sentence: &str, document_title: &str) -> String {
    let title = if document_title.is_empty() {
        "a topic"
    } else {
        document_title
    };
    format!(
        r#"You are an expert tutor. A student is studying "{title}" and wants to understand this sentence:

"{sentence}"

Give a clear, concise explanation in 3-5 sentences that:
1. Explains the concept in plain English
2. Mentions why this matters or how it connects to the broader topic
3. Gives a brief concrete example if applicable

Be direct and helpful. Do not use markdown formatting, just plain text paragraphs."#
    )
}

pub async fn run_explain_stream(llm: Arc<dyn LlmProvider>, prompt: String, tx: mpsc::Sender<String>) {
    let request = GenerateRequest {
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt,
        }],
        max_tokens: EXPLAIN_MAX_TOKENS,
        temperature: EXPLAIN_TEMPERATURE,
    };

    let mut tokens = match llm.stream_generate(request).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Explain stream failed to open: {}", e);
            let _ = tx.send(ERROR_FRAME.to_string()).await;
            return;
        }
    };

    loop {
        match tokens.next().await {
            None => {
                let _ = tx.send(DONE_FRAME.to_string()).await;
                return;
            }
            Some(Err(e)) => {
                warn!("Explain stream failed mid-flight: {}", e);
                let _ = tx.send(ERROR_FRAME.to_string()).await;
                return;
            }
            Some(Ok(delta)) => {
                if delta.is_empty() {
                    continue;
                }
                if tx.send(delta).await.is_err() {
                    // Client cancelled.
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::testing::ScriptedProvider;

    async fn collect_frames(mut rx: mpsc::Receiver<String>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn forwards_deltas_then_done() {
        let llm = Arc::new(ScriptedProvider::ok(&["A sine ", "wave ", "oscillates."]));
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(run_explain_stream(llm, "prompt".to_string(), tx));

        let frames = collect_frames(rx).await;
        assert_eq!(frames, vec!["A sine ", "wave ", "oscillates.", DONE_FRAME]);
    }

    #[tokio::test]
    async fn upstream_failure_ends_with_error_frame() {
        let llm = Arc::new(ScriptedProvider {
            chunks: vec![Ok("Part".to_string()), Err("timeout".to_string())],
        });
        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(run_explain_stream(llm, "prompt".to_string(), tx));

        let frames = collect_frames(rx).await;
        assert_eq!(frames, vec!["Part", ERROR_FRAME]);
    }
}
