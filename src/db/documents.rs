//! Stored document operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::Result;

/// Stored document record. `doc` is the base64-encoded PDF content.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentRecord {
    pub id: String,
    pub doc: String,
    pub signed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Document repository
pub struct DocumentStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentStore<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new unsigned document; returns its identifier.
    pub async fn insert(&self, doc_base64: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO documents (id, doc, signed)
            VALUES (?, ?, 0)
            "#,
        )
        .bind(&id)
        .bind(doc_base64)
        .execute(self.pool)
        .await?;

        Ok(id)
    }

    /// Fetch a stored document
    pub async fn fetch(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            r#"
            SELECT id, doc, signed, created_at, updated_at
            FROM documents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(record)
    }

    /// Overwrite a document's bytes and signed flag.
    ///
    /// Returns whether a row was updated. Concurrent updates of the same
    /// identifier are last-writer-wins; no exclusivity is enforced here.
    pub async fn update(&self, id: &str, doc_base64: &str, signed: bool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET doc = ?, signed = ?, updated_at = datetime('now')
            WHERE id = ?
            "#,
        )
        .bind(doc_base64)
        .bind(signed)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
