pub mod audit;
pub mod repo;
pub mod repo_types;

pub use audit::AuditLog;
pub use repo::{ActivityLogStore, PgActivityLogStore};
pub use repo_types::{ActivityLogView, AuditAction};
