use chrono::{DateTime, Utc};
use haven_core::error::AppError;
use haven_core::traits::DocumentStore;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use crate::config::DatabaseConfig;

/// One imported JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: Uuid,
    pub database_name: String,
    pub collection: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// Document store on PostgreSQL.
///
/// The database name and collection that address a document in a document
/// database become two columns of one `documents` table; the document
/// itself is the JSONB `payload`.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: Pool<Postgres>,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        tracing::debug!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Create the `documents` table if this database has not seen it yet.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    pub async fn insert(
        &self,
        database_name: &str,
        collection: &str,
        document: &Value,
    ) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO documents (database_name, collection, payload)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(database_name)
        .bind(collection)
        .bind(document)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.0)
    }

    pub async fn count(&self, database_name: &str, collection: &str) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM documents
            WHERE database_name = $1 AND collection = $2
            "#,
        )
        .bind(database_name)
        .bind(collection)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.0)
    }

    /// Documents of a collection in insertion order, at most `limit`.
    pub async fn list(
        &self,
        database_name: &str,
        collection: &str,
        limit: usize,
    ) -> Result<Vec<StoredDocument>, AppError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, database_name, collection, payload, created_at
            FROM documents
            WHERE database_name = $1 AND collection = $2
            ORDER BY created_at ASC, id ASC
            LIMIT $3
            "#,
        )
        .bind(database_name)
        .bind(collection)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    database_name: String,
    collection: String,
    payload: Value,
    created_at: DateTime<Utc>,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        StoredDocument {
            id: row.id,
            database_name: row.database_name,
            collection: row.collection,
            payload: row.payload,
            created_at: row.created_at,
        }
    }
}

impl DocumentStore for DocumentRepository {
    async fn insert(
        &self,
        database: &str,
        collection: &str,
        document: &Value,
    ) -> Result<Uuid, AppError> {
        DocumentRepository::insert(self, database, collection, document).await
    }
}
