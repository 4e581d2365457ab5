//! OpenAI-compatible streaming chat client.
//!
//! The completion is requested with `stream: true`; the response body is a
//! server-sent-event sequence of chunk objects terminated by `data:
//! [DONE]`. A pump task decodes events off the byte stream and feeds
//! content deltas into a channel; dropping the returned stream drops the
//! receiver, which stops the pump and aborts the HTTP transfer on its next
//! send.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use super::{GenerateRequest, LlmProvider, TokenStream};

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChunkResponse {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

enum SseData {
    Delta(String),
    Done,
    Skip,
}

/// Decode one `\n\n`-delimited SSE event into a content delta.
fn decode_event(event: &str) -> SseData {
    let Some(data) = event.trim_start().strip_prefix("data: ") else {
        // Comment or keep-alive frame.
        return SseData::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseData::Done;
    }
    match serde_json::from_str::<ChunkResponse>(data) {
        Ok(parsed) => {
            let delta = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .unwrap_or_default();
            if delta.is_empty() {
                SseData::Skip
            } else {
                SseData::Delta(delta)
            }
        }
        Err(_) => SseData::Skip,
    }
}

pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn stream_generate(&self, request: GenerateRequest) -> Result<TokenStream> {
        let req_messages: Vec<OpenAiMessage> = request
            .messages
            .iter()
            .map(|m| OpenAiMessage {
                role: &m.role,
                content: &m.content,
            })
            .collect();

        let req = OpenAiRequest {
            model: &self.model,
            messages: req_messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: true,
        };

        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(anyhow!(
                "OpenAI API Error: {}",
                res.text().await.unwrap_or_default()
            ));
        }

        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String>>(32);
        tokio::spawn(async move {
            let mut body = Box::pin(res.bytes_stream());
            let mut buffer = String::new();

            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(anyhow!("stream read failed: {}", e))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(pos) = buffer.find("\n\n") {
                    let event = buffer[..pos].to_string();
                    buffer.drain(..pos + 2);

                    match decode_event(&event) {
                        SseData::Delta(delta) => {
                            if tx.send(Ok(delta)).await.is_err() {
                                // Consumer cancelled; stop pulling tokens.
                                return;
                            }
                        }
                        SseData::Done => return,
                        SseData::Skip => {}
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
