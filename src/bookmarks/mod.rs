pub mod models;

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use models::{format_timestamp, Bookmark};
use sqlx::{Pool, Sqlite};

const SELECT_BOOKMARK: &str = r#"
    SELECT path,
           COALESCE(CAST(position AS REAL), 0.0),
           COALESCE(CAST(duration AS REAL), 0.0),
           timestamp
    FROM bookmark
"#;

pub struct BookmarkManager {
    pool: Pool<Sqlite>,
}

impl BookmarkManager {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn lookup_bookmark(&self, path: &str) -> Result<Option<Bookmark>, AppError> {
        let row: Option<(String, f64, f64, String)> =
            sqlx::query_as(&format!("{} WHERE path = ? LIMIT 1", SELECT_BOOKMARK))
                .bind(path)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Bookmark::from_row).transpose()
    }

    /// Records the position for `path`, updating the existing row in place
    /// when there is one.
    pub async fn upsert_bookmark(
        &self,
        path: &str,
        position: f64,
        duration: f64,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let timestamp = format_timestamp(&now);
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE bookmark SET position = ?, duration = ?, timestamp = ? WHERE path = ?",
        )
        .bind(position)
        .bind(duration)
        .bind(&timestamp)
        .bind(path)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO bookmark (path, position, duration, timestamp) VALUES (?, ?, ?, ?)",
            )
            .bind(path)
            .bind(position)
            .bind(duration)
            .bind(&timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        log::debug!(
            "Stored bookmark for {}: {:.1}s of {:.1}s at {}",
            path,
            position,
            duration,
            timestamp
        );
        Ok(())
    }

    /// Removes the bookmark for `path`. Returns whether one existed.
    pub async fn delete_bookmark(&self, path: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM bookmark WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, AppError> {
        let rows: Vec<(String, f64, f64, String)> =
            sqlx::query_as(&format!("{} ORDER BY path", SELECT_BOOKMARK))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Bookmark::from_row).collect()
    }
}
