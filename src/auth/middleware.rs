//! Request pipeline stages: `require_auth` verifies the bearer token and
//! attaches an [`Identity`]; `require_admin` then gates on its role.

use std::{convert::Infallible, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::jwt::{Identity, JwtKeys, TokenError};
use crate::{error::AppError, state::AppState, users::Role};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

pub fn authenticate(headers: &HeaderMap, keys: &JwtKeys) -> Result<Identity, AppError> {
    let token = bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    match keys.verify(token) {
        Ok(claims) => Ok(claims.identity()),
        Err(TokenError::Expired) => {
            warn!("expired token");
            Err(AppError::Unauthorized("Token has expired".into()))
        }
        Err(e) => {
            warn!(error = %e, "authentication error");
            Err(AppError::Unauthorized("Authentication failed".into()))
        }
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = authenticate(request.headers(), &state.keys)?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Denies unless an identity is present and holds one of `allowed`.
pub fn check_role(identity: Option<&Identity>, allowed: &[Role]) -> Result<(), AppError> {
    match identity {
        Some(id) if allowed.contains(&id.role) => Ok(()),
        other => {
            warn!(
                user_id = other.map(|i| i.user_id),
                role = other.map(|i| i.role.as_str()),
                "unauthorized admin access attempt"
            );
            Err(AppError::Forbidden(
                "Access denied: Admin privileges required".into(),
            ))
        }
    }
}

/// Must be layered inside `require_auth`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    check_role(request.extensions().get::<Identity>(), &[Role::Admin])?;
    Ok(next.run(request).await)
}

/// The identity attached by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

/// Identity of the caller on routes that do not require one. Missing or bad
/// tokens yield `None`.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<Identity>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
    Arc<JwtKeys>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = Arc::<JwtKeys>::from_ref(state);
        if bearer_token(&parts.headers).is_none() {
            return Ok(Self(None));
        }
        Ok(Self(authenticate(&parts.headers, &keys).ok()))
    }
}
