//! Metadata catalog boundary and its SQLite implementation.

use crate::models::metadata_record::{MetadataRecord, NewMetadataRecord};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog record `{0}` not found")]
    RecordNotFound(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Relational catalog of file records. No transaction spans calls.
#[async_trait]
pub trait MetadataCatalog: Send + Sync {
    async fn find_all(&self) -> CatalogResult<Vec<MetadataRecord>>;

    async fn insert(&self, record: NewMetadataRecord) -> CatalogResult<MetadataRecord>;

    async fn delete_by_id(&self, id: Uuid) -> CatalogResult<()>;
}

/// Catalog backed by the `files` table.
#[derive(Clone)]
pub struct SqliteCatalog {
    pub db: Arc<SqlitePool>,
}

impl SqliteCatalog {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataCatalog for SqliteCatalog {
    async fn find_all(&self) -> CatalogResult<Vec<MetadataRecord>> {
        let rows = sqlx::query_as::<_, MetadataRecord>(
            "SELECT id, name, url, size_bytes, mime_type, uploaded_by, created_at
             FROM files ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    async fn insert(&self, record: NewMetadataRecord) -> CatalogResult<MetadataRecord> {
        let row = sqlx::query_as::<_, MetadataRecord>(
            r#"
            INSERT INTO files (id, name, url, size_bytes, mime_type, uploaded_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, name, url, size_bytes, mime_type, uploaded_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.name)
        .bind(&record.url)
        .bind(record.size_bytes)
        .bind(&record.mime_type)
        .bind(&record.uploaded_by)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(row)
    }

    async fn delete_by_id(&self, id: Uuid) -> CatalogResult<()> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::RecordNotFound(id));
        }
        Ok(())
    }
}
