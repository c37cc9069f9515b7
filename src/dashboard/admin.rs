//! Admin dashboard: moderation of users, providers and urgent requests.

use super::Profile;
use crate::error::{AppError, AppResult};
use crate::models::{
    Appointment, AppointmentStatus, Database, Role, ServiceProvider, UrgentRequest, UrgentStatus,
    VerificationStatus,
};
use crate::server::extract::{Json, Path, Query};
use crate::server::guard::{require_role, CurrentSession};
use crate::server::AppState;
use crate::store::Store;
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCounts {
    pub users: usize,
    pub providers: usize,
    /// Providers awaiting verification
    pub pending: usize,
    pub urgent: usize,
    pub appointments_today: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleFilter {
    /// `all`, `user`, `provider` or `admin`
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    /// `all` or an appointment status
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub verification_status: VerificationStatus,
}

#[derive(Debug, Deserialize)]
pub struct UrgentStatusRequest {
    pub status: UrgentStatus,
}

/// Overview counts; `today` is `YYYY-MM-DD`
pub fn counts(db: &Database, today: &str) -> AdminCounts {
    AdminCounts {
        users: db.users.len(),
        providers: db.service_providers.len(),
        pending: db
            .service_providers
            .iter()
            .filter(|p| p.verification_status == VerificationStatus::Pending)
            .count(),
        urgent: db.urgent_requests.len(),
        appointments_today: db
            .appointments
            .iter()
            .filter(|a| !a.date.is_empty() && a.date.starts_with(today))
            .count(),
    }
}

pub fn list_users(db: &Database, role: Option<&str>) -> AppResult<Vec<Profile>> {
    let role = match role.map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(r) => Some(r.parse::<Role>().map_err(AppError::BadRequest)?),
    };
    Ok(db
        .users
        .iter()
        .filter(|u| role.map_or(true, |r| u.role == r))
        .map(Profile::from)
        .collect())
}

/// Flip the blocked flag of a user
pub fn toggle_block(store: &Store, user_id: u64) -> AppResult<Profile> {
    store.update("toggle_block", |db| {
        let user = db
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::not_found("user", user_id))?;
        user.blocked = !user.blocked;
        Ok(Profile::from(&*user))
    })
}

pub fn pending_providers(db: &Database) -> Vec<ServiceProvider> {
    db.service_providers
        .iter()
        .filter(|p| p.verification_status == VerificationStatus::Pending)
        .cloned()
        .collect()
}

/// Verify or reject a provider
pub fn set_verification(
    store: &Store,
    provider_id: u64,
    status: VerificationStatus,
) -> AppResult<ServiceProvider> {
    if status == VerificationStatus::Pending {
        return Err(AppError::BadRequest(
            "Verification status must be verified or rejected".into(),
        ));
    }
    store.update("set_verification", |db| {
        let provider = db
            .service_providers
            .iter_mut()
            .find(|p| p.id == provider_id)
            .ok_or_else(|| AppError::not_found("service provider", provider_id))?;
        provider.verification_status = status;
        Ok(provider.clone())
    })
}

/// Accept or close an urgent request on behalf of the platform
pub fn set_urgent_status(store: &Store, urgent_id: u64, status: UrgentStatus) -> AppResult<UrgentRequest> {
    if !matches!(status, UrgentStatus::Accepted | UrgentStatus::Closed) {
        return Err(AppError::BadRequest("Status must be accepted or closed".into()));
    }
    store.update("set_urgent_status", |db| {
        let request = db
            .urgent_requests
            .iter_mut()
            .find(|r| r.id == urgent_id)
            .ok_or_else(|| AppError::not_found("urgent request", urgent_id))?;
        if request.status == status {
            return Err(AppError::Conflict(format!(
                "Urgent request {} already has that status",
                urgent_id
            )));
        }
        request.status = status;
        Ok(request.clone())
    })
}

pub fn list_appointments(db: &Database, status: Option<&str>) -> AppResult<Vec<Appointment>> {
    let status = match status.map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            serde_json::from_value::<AppointmentStatus>(serde_json::Value::String(s.to_string()))
                .map_err(|_| AppError::BadRequest(format!("Unknown appointment status: {}", s)))?,
        ),
    };
    Ok(db
        .appointments
        .iter()
        .filter(|a| status.map_or(true, |s| a.status == s))
        .cloned()
        .collect())
}

fn admin_session(CurrentSession(session): CurrentSession) -> AppResult<crate::session::Session> {
    require_role(&session, Role::Admin)?;
    Ok(session)
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(overview_handler))
        .route("/users", get(users_handler))
        .route("/users/{id}/block", post(block_handler))
        .route("/providers/pending", get(pending_handler))
        .route("/providers/{id}/verification", post(verification_handler))
        .route("/urgent", get(urgent_handler))
        .route("/urgent/{id}/status", post(urgent_status_handler))
        .route("/appointments", get(appointments_handler))
}

/// GET /admin/dashboard
async fn overview_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<AdminCounts>> {
    admin_session(current)?;
    let today = super::today();
    Ok(Json(state.store.view(|db| counts(db, &today))))
}

/// GET /admin/dashboard/users?role=
async fn users_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Query(filter): Query<RoleFilter>,
) -> AppResult<Json<Vec<Profile>>> {
    admin_session(current)?;
    let users = state.store.view(|db| list_users(db, filter.role.as_deref()))?;
    Ok(Json(users))
}

/// POST /admin/dashboard/users/{id}/block
async fn block_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<u64>,
) -> AppResult<Json<Profile>> {
    let session = admin_session(current)?;
    let profile = toggle_block(&state.store, id)?;
    tracing::info!(
        admin_id = session.user_id,
        user_id = id,
        blocked = profile.blocked,
        "user block toggled"
    );
    Ok(Json(profile))
}

/// GET /admin/dashboard/providers/pending
async fn pending_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<Vec<ServiceProvider>>> {
    admin_session(current)?;
    Ok(Json(state.store.view(pending_providers)))
}

/// POST /admin/dashboard/providers/{id}/verification
async fn verification_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<u64>,
    Json(req): Json<VerificationRequest>,
) -> AppResult<Json<ServiceProvider>> {
    let session = admin_session(current)?;
    let provider = set_verification(&state.store, id, req.verification_status)?;
    tracing::info!(
        admin_id = session.user_id,
        provider_id = id,
        status = ?provider.verification_status,
        "provider verification set"
    );
    Ok(Json(provider))
}

/// GET /admin/dashboard/urgent
async fn urgent_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<Vec<UrgentRequest>>> {
    admin_session(current)?;
    Ok(Json(state.store.view(|db| db.urgent_requests.clone())))
}

/// POST /admin/dashboard/urgent/{id}/status
async fn urgent_status_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<u64>,
    Json(req): Json<UrgentStatusRequest>,
) -> AppResult<Json<UrgentRequest>> {
    admin_session(current)?;
    Ok(Json(set_urgent_status(&state.store, id, req.status)?))
}

/// GET /admin/dashboard/appointments?status=
async fn appointments_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<Appointment>>> {
    admin_session(current)?;
    let appointments = state
        .store
        .view(|db| list_appointments(db, filter.status.as_deref()))?;
    Ok(Json(appointments))
}
