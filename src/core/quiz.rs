//! Streaming quiz generation.
//!
//! One request-scoped task consumes the model token stream, re-extracts
//! completed questions from the growing buffer after every delta, pushes
//! each new question downstream exactly once in position order, and
//! dispatches its persistence write into a background set that is never
//! awaited on the delivery path. The channel receiver doubles as the
//! cancellation signal: when the client disconnects the next send fails
//! and the task stops consuming model tokens, while writes already
//! dispatched are drained to completion.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::core::extractor::{QuestionDraft, extract_questions};
use crate::core::llm::{ChatMessage, GenerateRequest, LlmProvider};
use crate::core::store::StudyStore;

pub const DONE_FRAME: &str = "[DONE]";

const QUIZ_MAX_TOKENS: u32 = 3000;
const QUIZ_TEMPERATURE: f32 = 0.7;

pub fn build_quiz_prompt(title: &str, material: &str) -> String {
    let title = if title.is_empty() { "a topic" } else { title };
    format!(
        r#"Based on the following study material about "{title}", generate exactly 10 multiple-choice questions to test the student's knowledge.

Study material:
{material}

Return your response as a JSON array with exactly this structure:
[
  {{
    "question": "The question text",
    "options": ["Option A", "Option B", "Option C", "Option D"],
    "correct_answer": 0,
    "explanation": "Brief explanation of why this is correct"
  }}
]

Rules:
- Each question must have exactly 4 options
- correct_answer is the 0-based index of the correct option
- Questions should range from easy to challenging
- Cover different aspects of the material
- Make incorrect options plausible but clearly wrong
- Return ONLY the JSON array, no other text"#
    )
}

/// One SSE frame per question, with the emission position stamped in.
fn question_frame(draft: &QuestionDraft, position: usize) -> String {
    json!({
        "question": draft.question,
        "options": draft.options,
        "correct_answer": draft.correct_answer,
        "explanation": draft.explanation,
        "position": position,
    })
    .to_string()
}

fn error_frame() -> String {
    json!({ "error": "Stream failed" }).to_string()
}

enum Outcome {
    Completed,
    Failed,
    Cancelled,
}

/// Drive one quiz generation from model stream to client channel. The
/// quiz header row must already exist; authorization and prompt building
/// happened in the handler.
pub async fn run_quiz_stream(
    store: StudyStore,
    llm: Arc<dyn LlmProvider>,
    quiz_id: String,
    prompt: String,
    tx: mpsc::Sender<String>,
) {
    let request = GenerateRequest {
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt,
        }],
        max_tokens: QUIZ_MAX_TOKENS,
        temperature: QUIZ_TEMPERATURE,
    };

    let mut tokens = match llm.stream_generate(request).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Quiz {}: model stream failed to open: {}", quiz_id, e);
            let _ = tx.send(error_frame()).await;
            return;
        }
    };

    let mut writes: JoinSet<()> = JoinSet::new();
    let mut accumulated = String::new();
    let mut sent_count = 0usize;

    let outcome = 'stream: loop {
        match tokens.next().await {
            None => break Outcome::Completed,
            Some(Err(e)) => {
                warn!("Quiz {}: model stream failed mid-flight: {}", quiz_id, e);
                break Outcome::Failed;
            }
            Some(Ok(delta)) => {
                accumulated.push_str(&delta);
                let (drafts, _remainder) = extract_questions(&accumulated);

                while sent_count < drafts.len() {
                    let draft = drafts[sent_count].clone();
                    let position = sent_count;

                    // Dispatch the write before the send: the record must
                    // land even if the client disconnects before this
                    // frame is delivered.
                    let write_store = store.clone();
                    let write_quiz_id = quiz_id.clone();
                    let write_draft = draft.clone();
                    writes.spawn(async move {
                        if let Err(e) = write_store
                            .insert_question(&write_quiz_id, &write_draft, position as i64)
                            .await
                        {
                            warn!(
                                "Quiz {}: failed to persist question {}: {}",
                                write_quiz_id, position, e
                            );
                        }
                    });

                    if tx.send(question_frame(&draft, position)).await.is_err() {
                        info!(
                            "Quiz {}: client disconnected after {} questions",
                            quiz_id, sent_count
                        );
                        break 'stream Outcome::Cancelled;
                    }
                    sent_count += 1;
                }
            }
        }
    };

    // Stop the upstream pump before draining writes.
    drop(tokens);

    match outcome {
        Outcome::Completed => {
            info!("Quiz {}: streamed {} questions", quiz_id, sent_count);
            let _ = tx.send(DONE_FRAME.to_string()).await;
        }
        Outcome::Failed => {
            let _ = tx.send(error_frame()).await;
        }
        Outcome::Cancelled => {}
    }
    drop(tx);

    // Drain outstanding writes. The client-facing channel is already
    // closed, so nothing downstream waits on this.
    while writes.join_next().await.is_some() {}
}
