use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, Instrument};

use super::{repo::ActivityLogStore, repo_types::AuditAction};

/// Best-effort audit trail writer.
///
/// Each [`AuditLog::record`] call spawns its own task. A failed write is
/// logged once and dropped; it never reaches the caller and is not retried.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn ActivityLogStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn ActivityLogStore>) -> Self {
        Self { store }
    }

    /// Handlers drop the returned handle; tests may await it.
    pub fn record(
        &self,
        user_id: i64,
        action: AuditAction,
        details: serde_json::Value,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(
            async move {
                match store.insert(user_id, action, &details).await {
                    Ok(()) => debug!(user_id, %action, "activity logged"),
                    Err(e) => error!(
                        error = %format!("{e:#}"),
                        user_id,
                        %action,
                        "failed to log activity"
                    ),
                }
            }
            .in_current_span(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn record_appends_one_entry() {
        let store = MemoryStore::new();
        let admin = store.seed_user("Admin", "boss@x.com", crate::users::Role::Admin).await;
        let audit = AuditLog::new(Arc::new(store.clone()));

        audit
            .record(admin.id, AuditAction::UserLogin, json!({ "email": "boss@x.com" }))
            .await
            .expect("audit task");

        let logs = store.list_page(10, 0).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, "user_login");
        assert_eq!(logs[0].user_email, "boss@x.com");
        assert_eq!(logs[0].details["email"], "boss@x.com");
    }

    #[tokio::test]
    async fn failed_write_is_swallowed() {
        let store = MemoryStore::new();
        store.fail_activity_writes(true);
        let audit = AuditLog::new(Arc::new(store.clone()));

        // The task must complete normally even though the insert fails.
        audit
            .record(1, AuditAction::AdminViewLogs, json!({}))
            .await
            .expect("audit task should not panic");
        assert_eq!(ActivityLogStore::count(&store).await.unwrap(), 0);
    }
}
