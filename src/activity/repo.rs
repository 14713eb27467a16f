use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{ActivityLogView, AuditAction};

/// Append-only storage for user activity.
#[async_trait]
pub trait ActivityLogStore: Send + Sync {
    async fn insert(
        &self,
        user_id: i64,
        action: AuditAction,
        details: &serde_json::Value,
    ) -> anyhow::Result<()>;
    /// Entries newest first, joined with their user.
    async fn list_page(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<ActivityLogView>>;
    async fn count(&self) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgActivityLogStore {
    db: PgPool,
}

impl PgActivityLogStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActivityLogStore for PgActivityLogStore {
    async fn insert(
        &self,
        user_id: i64,
        action: AuditAction,
        details: &serde_json::Value,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (user_id, action, details)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(action.as_str())
        .bind(details)
        .execute(&self.db)
        .await
        .context("insert activity log")?;
        Ok(())
    }

    async fn list_page(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<ActivityLogView>> {
        let rows = sqlx::query_as::<_, ActivityLogView>(
            r#"
            SELECT l.id, l.action, l.details, l.created_at,
                   u.id AS user_id, u.name AS user_name, u.email AS user_email
              FROM activity_logs l
              JOIN users u ON u.id = l.user_id
             ORDER BY l.created_at DESC, l.id DESC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list activity logs")?;
        Ok(rows)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM activity_logs")
            .fetch_one(&self.db)
            .await
            .context("count activity logs")?;
        Ok(n)
    }
}
