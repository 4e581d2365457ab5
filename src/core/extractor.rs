//! Incremental extraction of quiz questions from a partially streamed
//! model completion.
//!
//! The model is asked for a JSON array of question objects, but deltas
//! arrive token by token, so at any instant the accumulated text is
//! usually not valid JSON. Rather than buffering the whole response, the
//! extractor tracks brace depth to find top-level `{...}` fragments that
//! have fully closed, parses each candidate on its own, and keeps whatever
//! parses and passes the schema check. Brace counting does not track
//! string/escape state, so a literal `{` or `}` inside an option string
//! corrupts the scan; accepted as a limitation for the flat
//! array-of-flat-objects shape the prompt requests.

use serde::{Deserialize, Serialize};

/// A fully parsed question recovered from the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    #[serde(default)]
    pub explanation: String,
}

/// Scan `accumulated` for complete question objects.
///
/// Returns every draft that has fully arrived, in array order, plus the
/// unconsumed suffix after the last closed fragment. Pure over its input:
/// feeding the same buffer twice yields the same drafts, and drafts found
/// in a prefix reappear unchanged, in the same order, for any extension of
/// that prefix. Callers re-supply the full accumulated buffer on every
/// call; the remainder is informational.
pub fn extract_questions(accumulated: &str) -> (Vec<QuestionDraft>, &str) {
    let Some(arr_start) = accumulated.find('[') else {
        // The model has not started emitting the array yet.
        return (Vec::new(), accumulated);
    };
    let rest = &accumulated[arr_start + 1..];

    let mut drafts = Vec::new();
    let mut depth: i32 = 0;
    let mut obj_start: Option<usize> = None;
    let mut consumed = 0usize;

    for (i, ch) in rest.char_indices() {
        match ch {
            '{' => {
                if depth == 0 {
                    obj_start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth -= 1;
                if depth == 0
                    && let Some(start) = obj_start.take()
                {
                    let fragment = &rest[start..=i];
                    if let Some(draft) = parse_fragment(fragment) {
                        drafts.push(draft);
                    }
                    // Valid or not, the fragment is consumed; the next `{`
                    // starts a fresh candidate.
                    consumed = i + 1;
                }
            }
            _ => {}
        }
    }

    (drafts, &rest[consumed..])
}

/// Parse one closed `{...}` fragment. Parse failures are the expected case
/// while a fragment is still mid-stream and are discarded without noise;
/// so are objects that do not satisfy the question schema (non-empty
/// `question`, `options` array, numeric `correct_answer`).
fn parse_fragment(fragment: &str) -> Option<QuestionDraft> {
    let draft: QuestionDraft = serde_json::from_str(fragment).ok()?;
    if draft.question.is_empty() {
        return None;
    }
    Some(draft)
}
