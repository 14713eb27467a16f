use std::fmt;

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Tags written to `activity_logs.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserRegistered,
    UserLogin,
    AdminViewAllUsers,
    AdminViewLogs,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegistered => "user_registered",
            AuditAction::UserLogin => "user_login",
            AuditAction::AdminViewAllUsers => "admin_view_all_users",
            AuditAction::AdminViewLogs => "admin_view_logs",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log entry joined with the name and email of the user who triggered it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityLogView {
    pub id: i64,
    pub action: String,
    pub details: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_id: i64,
    pub user_name: String,
    pub user_email: String,
}
