use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use super::StudyStore;
use super::types::{DocumentRecord, SentenceRecord};

impl StudyStore {
    /// Insert a document and its segmented sentences in one transaction.
    /// Sentence positions follow slice order; understanding starts at the
    /// schema default.
    pub async fn create_document(
        &self,
        owner_id: &str,
        title: &str,
        original_filename: Option<&str>,
        sentences: &[String],
    ) -> Result<DocumentRecord> {
        let id = uuid::Uuid::new_v4().to_string();

        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO documents (id, owner_id, title, original_filename) VALUES (?1, ?2, ?3, ?4)",
            params![id, owner_id, title, original_filename],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sentences (id, document_id, content, position) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, content) in sentences.iter().enumerate() {
                let sentence_id = uuid::Uuid::new_v4().to_string();
                stmt.execute(params![sentence_id, id, content, position as i64])?;
            }
        }
        tx.commit()?;

        let created_at = db.query_row(
            "SELECT created_at FROM documents WHERE id = ?1",
            params![id],
            |row| row.get::<_, String>(0),
        )?;

        Ok(DocumentRecord {
            id,
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            original_filename: original_filename.map(|f| f.to_string()),
            created_at,
        })
    }

    /// Fetch a document only if `owner_id` owns it. Foreign and unknown
    /// documents are indistinguishable to the caller.
    pub async fn fetch_document(
        &self,
        document_id: &str,
        owner_id: &str,
    ) -> Result<Option<DocumentRecord>> {
        let db = self.db.lock().await;
        let doc = db
            .query_row(
                "SELECT id, owner_id, title, original_filename, created_at
                 FROM documents WHERE id = ?1 AND owner_id = ?2",
                params![document_id, owner_id],
                |row| {
                    Ok(DocumentRecord {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        title: row.get(2)?,
                        original_filename: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(doc)
    }

    /// All sentences of a document in position order.
    pub async fn fetch_sentences(&self, document_id: &str) -> Result<Vec<SentenceRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, document_id, content, position, understanding, created_at
             FROM sentences WHERE document_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![document_id], |row| {
            Ok(SentenceRecord {
                id: row.get(0)?,
                document_id: row.get(1)?,
                content: row.get(2)?,
                position: row.get(3)?,
                understanding: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        let mut sentences = Vec::new();
        for row in rows {
            sentences.push(row?);
        }
        Ok(sentences)
    }
}
