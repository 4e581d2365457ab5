/// A study document owned by the caller that ingested it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub original_filename: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SentenceRecord {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub position: i64,
    pub understanding: String,
    pub created_at: String,
}

/// Quiz header row. Created before any model tokens are requested, so a
/// quiz exists even if zero questions ever parse.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QuizRecord {
    pub id: String,
    pub document_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct QuizQuestionRecord {
    pub id: String,
    pub quiz_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i64,
    pub explanation: Option<String>,
    pub position: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ApiTokenRecord {
    pub id: String,
    pub name: String,
    pub created_at: String,
}
