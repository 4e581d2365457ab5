use anyhow::Result;
use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::StudyStore;
use super::types::ApiTokenRecord;

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn generate_raw_token() -> String {
    let bytes: [u8; 16] = rand::random();
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("crk_{}", hex)
}

impl StudyStore {
    /// Mint a token; the raw value is returned once and only its hash is
    /// stored.
    pub async fn create_api_token(&self, name: &str) -> Result<(String, ApiTokenRecord)> {
        let raw_token = generate_raw_token();
        let token_hash = hash_token(&raw_token);
        let id = uuid::Uuid::new_v4().to_string();

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO api_tokens (id, name, token_hash) VALUES (?1, ?2, ?3)",
            params![id, name, token_hash],
        )?;

        let created_at = db.query_row(
            "SELECT created_at FROM api_tokens WHERE id = ?1",
            params![id],
            |row| row.get::<_, String>(0),
        )?;

        Ok((
            raw_token,
            ApiTokenRecord {
                id,
                name: name.to_string(),
                created_at,
            },
        ))
    }

    pub async fn list_api_tokens(&self) -> Result<Vec<ApiTokenRecord>> {
        let db = self.db.lock().await;
        let mut stmt =
            db.prepare("SELECT id, name, created_at FROM api_tokens ORDER BY created_at DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok(ApiTokenRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        let mut tokens = Vec::new();
        for row in rows {
            tokens.push(row?);
        }
        Ok(tokens)
    }

    pub async fn delete_api_token(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM api_tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Resolve a raw bearer token to its token id. The id doubles as the
    /// caller identity that documents are scoped to.
    pub async fn validate_api_token(&self, raw_token: &str) -> Result<Option<String>> {
        let token_hash = hash_token(raw_token);
        let db = self.db.lock().await;
        let id = db
            .query_row(
                "SELECT id FROM api_tokens WHERE token_hash = ?1",
                params![token_hash],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(id)
    }

    pub async fn has_any_api_tokens(&self) -> Result<bool> {
        let db = self.db.lock().await;
        let count: i64 = db.query_row("SELECT COUNT(*) FROM api_tokens", [], |row| row.get(0))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::store::StudyStore;

    #[tokio::test]
    async fn token_roundtrip_resolves_to_its_id() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = StudyStore::open(dir.path()).await.expect("store opens");

        assert!(!store.has_any_api_tokens().await.unwrap());

        let (raw, record) = store.create_api_token("laptop").await.unwrap();
        assert!(raw.starts_with("crk_"));
        assert!(store.has_any_api_tokens().await.unwrap());

        let resolved = store.validate_api_token(&raw).await.unwrap();
        assert_eq!(resolved.as_deref(), Some(record.id.as_str()));

        assert!(
            store
                .validate_api_token("crk_not_a_real_token")
                .await
                .unwrap()
                .is_none()
        );

        assert!(store.delete_api_token(&record.id).await.unwrap());
        assert!(store.validate_api_token(&raw).await.unwrap().is_none());
    }
}
