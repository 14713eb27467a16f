//! In-process stores used by the test suite in place of Postgres.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    activity::{ActivityLogStore, ActivityLogView, AuditAction},
    users::{NewUser, Role, StoreError, User, UserStore, UserSummary},
};

struct LogRow {
    id: i64,
    user_id: i64,
    action: AuditAction,
    details: serde_json::Value,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    logs: Vec<LogRow>,
    next_user_id: i64,
    next_log_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    fail_activity: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every activity insert fail until switched back off.
    pub fn fail_activity_writes(&self, fail: bool) {
        self.fail_activity.store(fail, Ordering::SeqCst);
    }

    /// Inserts a user whose password can never verify.
    pub async fn seed_user(&self, name: &str, email: &str, role: Role) -> User {
        UserStore::insert(
            self,
            NewUser {
                name: name.into(),
                email: email.into(),
                password_hash: "!".into(),
                role,
            },
        )
        .await
        .expect("seed user")
    }

    pub async fn seed_logs(&self, user_id: i64, n: usize) {
        for i in 0..n {
            ActivityLogStore::insert(
                self,
                user_id,
                AuditAction::UserLogin,
                &serde_json::json!({ "seq": i }),
            )
            .await
            .expect("seed log");
        }
    }

    /// Removes a user and, like the foreign key, their log entries.
    pub fn delete_user(&self, id: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.users.retain(|u| u.id != id);
        inner.logs.retain(|l| l.user_id != id);
    }

    pub fn users_with_email(&self, email: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.users.iter().filter(|u| u.email == email).count()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        let inner = self.inner.lock().unwrap();
        inner.logs.iter().map(|l| l.action).collect()
    }

    /// Every logged entry in insertion order, with the user it belongs to.
    pub fn audit_trail(&self) -> Vec<(i64, AuditAction, serde_json::Value)> {
        let inner = self.inner.lock().unwrap();
        inner
            .logs
            .iter()
            .map(|l| (l.user_id, l.action, l.details.clone()))
            .collect()
    }
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        inner.next_user_id += 1;
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: inner.next_user_id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(row.clone());
        Ok(row)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<UserSummary>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<UserSummary> = inner.users.iter().map(UserSummary::from).collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.inner.lock().unwrap().users.len() as i64)
    }
}

#[async_trait]
impl ActivityLogStore for MemoryStore {
    async fn insert(
        &self,
        user_id: i64,
        action: AuditAction,
        details: &serde_json::Value,
    ) -> anyhow::Result<()> {
        if self.fail_activity.load(Ordering::SeqCst) {
            anyhow::bail!("activity_logs unavailable");
        }
        let mut inner = self.inner.lock().unwrap();
        if !inner.users.iter().any(|u| u.id == user_id) {
            anyhow::bail!("activity_logs.user_id violates foreign key");
        }
        inner.next_log_id += 1;
        let id = inner.next_log_id;
        inner.logs.push(LogRow {
            id,
            user_id,
            action,
            details: details.clone(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    async fn list_page(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<ActivityLogView>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<ActivityLogView> = inner
            .logs
            .iter()
            .filter_map(|l| {
                let user = inner.users.iter().find(|u| u.id == l.user_id)?;
                Some(ActivityLogView {
                    id: l.id,
                    action: l.action.as_str().to_string(),
                    details: l.details.clone(),
                    created_at: l.created_at,
                    user_id: user.id,
                    user_name: user.name.clone(),
                    user_email: user.email.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count(&self) -> anyhow::Result<i64> {
        Ok(self.inner.lock().unwrap().logs.len() as i64)
    }
}
