use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    activity::AuditAction,
    auth::{
        dto::{AuthResponse, LoginRequest, ProfileResponse, ProtectedResponse, RegisterRequest},
        jwt::Identity,
        middleware::{require_auth, AuthUser, OptionalAuthUser},
        password,
    },
    cache::ADMIN_USERS_KEY,
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
    users::{NewUser, PublicUser, Role, StoreError},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are stored and looked up trimmed and lower-cased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn identity_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/profile", get(profile))
        .route("/api/protected", get(protected))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Admin accounts can only be created by a caller who is currently an admin;
/// anyone else asking for `admin` gets a customer account.
async fn granted_role(
    state: &AppState,
    requested: Role,
    caller: Option<&Identity>,
) -> AppResult<Role> {
    if requested != Role::Admin {
        return Ok(requested);
    }
    if let Some(caller) = caller.filter(|c| c.role == Role::Admin) {
        // The token may predate a demotion; the stored account decides.
        if let Some(user) = state.users.find_by_id(caller.user_id).await? {
            if user.role == Role::Admin {
                return Ok(Role::Admin);
            }
        }
    }
    warn!(
        caller_id = caller.map(|c| c.user_id),
        "admin role requested without admin authority; registering as customer"
    );
    Ok(Role::Customer)
}

#[instrument(skip(state, caller, payload))]
pub async fn register(
    State(state): State<AppState>,
    OptionalAuthUser(caller): OptionalAuthUser,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let name = payload.name.trim().to_string();
    let email = normalize_email(&payload.email);

    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }

    let requested = match payload.role.as_deref() {
        None => Role::default(),
        Some(raw) => raw.parse::<Role>().map_err(|_| {
            warn!(email = %email, attempted_role = %raw, "registration with unsupported role");
            AppError::Validation("Invalid role specified".into())
        })?,
    };
    let role = granted_role(&state, requested, caller.as_ref()).await?;

    if state.users.find_by_email(&email).await?.is_some() {
        info!(email = %email, "registration failed: user exists");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = password::hash_password_blocking(payload.password).await?;

    // A concurrent registration can still win the race; the unique constraint decides.
    let user = state
        .users
        .insert(NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await
        .map_err(|e| {
            if matches!(e, StoreError::DuplicateEmail) {
                info!("registration lost race on unique email");
            }
            AppError::from(e)
        })?;

    let token = state.keys.sign(&Identity::from(&user))?;

    state.audit.record(
        user.id,
        AuditAction::UserRegistered,
        json!({ "email": user.email, "role": user.role }),
    );
    state.users_cache.invalidate(ADMIN_USERS_KEY).await;

    info!(user_id = user.id, email = %user.email, role = %user.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = normalize_email(&payload.email);
    let user = state.users.find_by_email(&email).await?;

    let hash = user
        .as_ref()
        .map(|u| u.password_hash.clone())
        .unwrap_or_else(|| password::dummy_hash().to_string());
    let password_ok = password::verify_password_blocking(payload.password, hash).await;

    let user = match user {
        Some(u) if password_ok => u,
        Some(u) => {
            warn!(user_id = u.id, "login failed: invalid password");
            return Err(invalid_credentials());
        }
        None => {
            info!(email = %email, "login failed: unknown email");
            return Err(invalid_credentials());
        }
    };

    let token = state.keys.sign(&Identity::from(&user))?;

    state
        .audit
        .record(user.id, AuditAction::UserLogin, json!({ "email": user.email }));

    info!(user_id = user.id, role = %user.role, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = identity.user_id, "profile fetch failed: user not found");
            AppError::NotFound("User not found".into())
        })?;

    Ok(Json(ProfileResponse {
        user: PublicUser::from(&user),
    }))
}

#[instrument]
pub async fn protected(AuthUser(identity): AuthUser) -> Json<ProtectedResponse> {
    info!(user_id = identity.user_id, "protected route accessed");
    Json(ProtectedResponse {
        message: "This is a protected route!".into(),
        user: identity,
        timestamp: OffsetDateTime::now_utc(),
    })
}
