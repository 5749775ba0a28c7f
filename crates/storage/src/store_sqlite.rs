//! SQLite-backed document store using sqlx.

use {
    async_trait::async_trait,
    ivebot_common::time::unix_now_ms,
    serde_json::Value,
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions},
    tracing::debug,
};

use crate::{
    Result,
    error::Context,
    store::{Document, DocumentStore, Filter},
};

/// Documents live in a single `documents` table keyed by collection; filters
/// are applied to the decoded JSON so the schema never changes per command.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a dedicated pool for `database_url` and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .with_context(|| format!("failed to connect to {database_url}"))?;

        crate::run_migrations(&pool).await?;
        debug!(database_url, "document store ready");

        Ok(Self { pool })
    }

    /// Use an existing pool. [`crate::run_migrations`] must have run on it.
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load(
        &self,
        conn: &mut sqlx::SqliteConnection,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT id, data, created_at FROM documents
             WHERE collection = ?
             ORDER BY created_at ASC, rowid ASC",
        )
        .bind(collection)
        .fetch_all(&mut *conn)
        .await?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.get("data");
            let data: Value = serde_json::from_str(&raw)?;
            if !filter.matches(&data) {
                continue;
            }
            docs.push(Document {
                id: row.get("id"),
                collection: collection.to_string(),
                data,
                created_at: row.get("created_at"),
            });
        }
        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert(&self, collection: &str, data: Value) -> Result<Document> {
        let doc = Document::new(collection, data, unix_now_ms())?;
        sqlx::query(
            "INSERT INTO documents (id, collection, data, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&doc.id)
        .bind(&doc.collection)
        .bind(serde_json::to_string(&doc.data)?)
        .bind(doc.created_at)
        .execute(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        self.load(&mut conn, collection, filter).await
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let doomed = self.load(&mut tx, collection, filter).await?;
        let mut removed = 0;
        for doc in &doomed {
            removed += sqlx::query("DELETE FROM documents WHERE id = ?")
                .bind(&doc.id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }
}
