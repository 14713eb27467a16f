use axum::{extract::State, middleware, routing::get, Json, Router};
use serde_json::json;
use tracing::{debug, info, instrument};

use super::dto::{LogsQuery, LogsResponse, PageRequest, UsersResponse};
use crate::{
    activity::AuditAction,
    auth::middleware::{require_admin, require_auth, AuthUser},
    cache::ADMIN_USERS_KEY,
    error::AppResult,
    extract::AppQuery,
    state::AppState,
};

pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/logs", get(list_logs))
        // Outermost layer runs first: authenticate, then check the role.
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
) -> AppResult<Json<UsersResponse>> {
    let users = match state.users_cache.get(ADMIN_USERS_KEY).await {
        Some(users) => {
            debug!("cache hit for admin user listing");
            users
        }
        None => {
            let seen = state.users_cache.generation();
            let users = state.users.list_all().await?;
            if !state.users_cache.set(ADMIN_USERS_KEY, users.clone(), seen).await {
                debug!("user listing changed while loading; not cached");
            }
            users
        }
    };

    state
        .audit
        .record(admin.user_id, AuditAction::AdminViewAllUsers, json!({}));

    info!(admin_id = admin.user_id, count = users.len(), "admin fetched all users");
    Ok(Json(UsersResponse { users }))
}

#[instrument(skip(state))]
pub async fn list_logs(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
    AppQuery(query): AppQuery<LogsQuery>,
) -> AppResult<Json<LogsResponse>> {
    let page = PageRequest::from(query);

    let logs = state.activity.list_page(page.limit, page.offset()).await?;
    let total_count = state.activity.count().await?;

    info!(
        admin_id = admin.user_id,
        page = page.page,
        limit = page.limit,
        total_count,
        "admin fetched activity logs"
    );

    state.audit.record(
        admin.user_id,
        AuditAction::AdminViewLogs,
        json!({ "page": page.page, "limit": page.limit }),
    );

    Ok(Json(LogsResponse {
        logs,
        pagination: page.pagination(total_count),
    }))
}
