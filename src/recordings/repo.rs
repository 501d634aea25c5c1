use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::recordings::repo_types::{NewRecording, Recording};

#[async_trait]
pub trait RecordingRepo: Send + Sync {
    async fn create(&self, new: NewRecording) -> anyhow::Result<Recording>;
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Recording>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Recording>>;
    /// Returns `false` when no row had that id.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgRecordingRepo {
    db: PgPool,
}

impl PgRecordingRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordingRepo for PgRecordingRepo {
    async fn create(&self, new: NewRecording) -> anyhow::Result<Recording> {
        let row = sqlx::query_as::<_, Recording>(
            r#"
            INSERT INTO recordings (user_id, file_name, file_id)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, file_name, file_id, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.file_name)
        .bind(new.file_id)
        .fetch_one(&self.db)
        .await
        .context("insert recording")?;
        Ok(row)
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Recording>> {
        let rows = sqlx::query_as::<_, Recording>(
            r#"
            SELECT id, user_id, file_name, file_id, created_at
              FROM recordings
             WHERE user_id = $1
             ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list recordings by user")?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Recording>> {
        let row = sqlx::query_as::<_, Recording>(
            r#"
            SELECT id, user_id, file_name, file_id, created_at
              FROM recordings
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find recording by id")?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM recordings WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete recording")?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
pub use memory::MemoryRecordingRepo;
