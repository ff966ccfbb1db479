//! Metadata persistence for image records against the `tbl_images` table.
//!
//! Every query binds client-supplied values as parameters; nothing is ever
//! interpolated into SQL text.

use crate::models::image::ImageRecord;
use sqlx::SqlitePool;
use std::sync::Arc;

const RECORD_COLUMNS: &str =
    "id, client_id, original_name, hash, format, size_bites, url, status";

/// Repository over an injected SQLite pool.
///
/// The pool is shared, scoped per process and released with it; no global
/// connection state exists.
#[derive(Clone)]
pub struct ImageRepository {
    db: Arc<SqlitePool>,
}

impl ImageRepository {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Insert a not-yet-persisted record and return the assigned id.
    pub async fn insert(&self, record: &ImageRecord) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO tbl_images (client_id, original_name, hash, format, size_bites, url, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.client_id)
        .bind(&record.original_name)
        .bind(&record.hash)
        .bind(&record.format)
        .bind(record.size_bites)
        .bind(&record.url)
        .bind(&record.status)
        .execute(&*self.db)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Read-your-write fetch used right after `insert` so responses carry
    /// the canonical stored row, server-assigned id included.
    pub async fn fetch_by_id(&self, id: i64) -> Result<ImageRecord, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM tbl_images WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
    }

    /// All of a client's records whose hash equals the term or whose
    /// original name contains it. The OR is scoped inside the client match,
    /// and ordering is fixed at `id` ascending for determinism.
    pub async fn search(
        &self,
        client_id: &str,
        term: &str,
    ) -> Result<Vec<ImageRecord>, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM tbl_images
             WHERE client_id = ? AND (hash = ? OR original_name LIKE ?)
             ORDER BY id ASC"
        ))
        .bind(client_id)
        .bind(term)
        .bind(format!("%{term}%"))
        .fetch_all(&*self.db)
        .await
    }
}
