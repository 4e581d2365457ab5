use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use super::StudyStore;
use super::types::{QuizQuestionRecord, QuizRecord};
use crate::core::extractor::QuestionDraft;

impl StudyStore {
    /// Create the quiz header row. Called before the model stream opens.
    pub async fn create_quiz(&self, document_id: &str) -> Result<QuizRecord> {
        let id = uuid::Uuid::new_v4().to_string();

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO quizzes (id, document_id) VALUES (?1, ?2)",
            params![id, document_id],
        )?;
        let created_at = db.query_row(
            "SELECT created_at FROM quizzes WHERE id = ?1",
            params![id],
            |row| row.get::<_, String>(0),
        )?;

        Ok(QuizRecord {
            id,
            document_id: document_id.to_string(),
            created_at,
        })
    }

    /// Persist one confirmed question. `position` is the emission index
    /// stamped by the orchestrator; replay relies on it, never on write
    /// completion order.
    pub async fn insert_question(
        &self,
        quiz_id: &str,
        draft: &QuestionDraft,
        position: i64,
    ) -> Result<()> {
        let id = uuid::Uuid::new_v4().to_string();
        let options = serde_json::to_string(&draft.options)?;

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO quiz_questions (id, quiz_id, question, options, correct_answer, explanation, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                quiz_id,
                draft.question,
                options,
                draft.correct_answer,
                draft.explanation,
                position
            ],
        )?;
        Ok(())
    }

    /// Fetch a quiz only if the owning document belongs to `owner_id`.
    pub async fn fetch_quiz(&self, quiz_id: &str, owner_id: &str) -> Result<Option<QuizRecord>> {
        let db = self.db.lock().await;
        let quiz = db
            .query_row(
                "SELECT q.id, q.document_id, q.created_at
                 FROM quizzes q JOIN documents d ON d.id = q.document_id
                 WHERE q.id = ?1 AND d.owner_id = ?2",
                params![quiz_id, owner_id],
                |row| {
                    Ok(QuizRecord {
                        id: row.get(0)?,
                        document_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(quiz)
    }

    /// Replay a quiz's questions in position order, reproducing the live
    /// session ordering.
    pub async fn fetch_quiz_questions(&self, quiz_id: &str) -> Result<Vec<QuizQuestionRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, quiz_id, question, options, correct_answer, explanation, position
             FROM quiz_questions WHERE quiz_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![quiz_id], |row| {
            let options_json: String = row.get(3)?;
            Ok(QuizQuestionRecord {
                id: row.get(0)?,
                quiz_id: row.get(1)?,
                question: row.get(2)?,
                options: serde_json::from_str(&options_json).unwrap_or_default(),
                correct_answer: row.get(4)?,
                explanation: row.get(5)?,
                position: row.get(6)?,
            })
        })?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row?);
        }
        Ok(questions)
    }
}
