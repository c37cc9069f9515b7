//! Login, logout and session routes.

use super::extract::Json;
use super::guard::CurrentSession;
use super::AppState;
use crate::auth::{self, DemoCredential, LoginRequest};
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::Role;
use crate::session::Session;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Response for a successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: u64,
    pub name: String,
    pub role: Role,
    /// Dashboard to open next
    pub redirect: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/login/demo-users", get(demo_users_handler))
        .route("/logout", post(logout_handler))
        .route("/session", get(session_handler))
}

/// POST /login
async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let matched = state
        .store
        .view(|db| auth::attempt_request(&db.users, &req).cloned());

    let user = match matched {
        Ok(user) => user,
        Err(e) => {
            metrics::record_login(e.reason());
            tracing::info!(
                email = %req.email.trim().to_lowercase(),
                reason = e.reason(),
                "login refused"
            );
            return Err(AppError::Login(e));
        }
    };

    let session = state.sessions.create(&user);
    metrics::record_login("ok");
    tracing::info!(user_id = user.id, role = %user.role, "login ok");

    Ok(Json(LoginResponse {
        token: session.token,
        user_id: user.id,
        name: user.name,
        role: user.role,
        redirect: auth::landing_path(user.role).to_string(),
    }))
}

/// GET /login/demo-users
async fn demo_users_handler(State(state): State<Arc<AppState>>) -> Json<Vec<DemoCredential>> {
    Json(state.store.view(|db| auth::demo_credentials(&db.users)))
}

/// POST /logout
async fn logout_handler(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
) -> StatusCode {
    state.sessions.remove(&session.token);
    tracing::info!(user_id = session.user_id, "logout");
    StatusCode::NO_CONTENT
}

/// GET /session
async fn session_handler(CurrentSession(session): CurrentSession) -> Json<Session> {
    Json(session)
}
