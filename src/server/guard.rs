//! Route guard: resolves the bearer token to a live session.

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::Role;
use crate::session::Session;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::sync::Arc;

/// Alternative header for clients that cannot set `Authorization`
pub const SESSION_HEADER: &str = "x-session-token";

/// Session of the caller; rejects with 401 when there is none
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl FromRequestParts<Arc<AppState>> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let session = state.sessions.get(token).ok_or(AppError::Unauthorized)?;
        Ok(CurrentSession(session))
    }
}

/// Token from `Authorization: Bearer` or `X-Session-Token`
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    bearer
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        })
        .filter(|t| !t.is_empty())
}

/// 403 unless the session has `role`
pub fn require_role(session: &Session, role: Role) -> AppResult<()> {
    if session.role != role {
        tracing::info!(
            user_id = session.user_id,
            role = %session.role,
            required = %role,
            "dashboard access refused"
        );
        return Err(AppError::Forbidden(format!(
            "This dashboard requires the {} role",
            role
        )));
    }
    Ok(())
}
