//! Service-provider dashboard.
//!
//! The caller's provider record is the one linked to its user id. Appointment
//! and urgent-request actions follow the states in which the dashboard offers
//! them; anything else is a 409.

use super::{push_message, update_profile, MessageBody, Profile, ProfileUpdate};
use crate::error::{AppError, AppResult};
use crate::models::{
    Appointment, AppointmentStatus, Chat, ChatMessage, Database, Review, Role, Sender,
    ServiceProvider, UrgentRequest, UrgentStatus,
};
use crate::server::extract::{Json, Path};
use crate::server::guard::{require_role, CurrentSession};
use crate::server::AppState;
use crate::store::Store;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// File name offered for the store snapshot
pub const SNAPSHOT_FILE_NAME: &str = "db_snapshot.json";

/// Provider-side decision on an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentAction {
    Approve,
    Reject,
    Complete,
}

impl AppointmentAction {
    fn from_path(action: &str) -> AppResult<Self> {
        match action {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "complete" => Ok(Self::Complete),
            other => Err(AppError::NotFound(format!("Unknown action: {}", other))),
        }
    }

    /// (required current status, resulting status)
    fn transition(&self) -> (AppointmentStatus, AppointmentStatus) {
        match self {
            Self::Approve => (AppointmentStatus::Pending, AppointmentStatus::Approved),
            Self::Reject => (AppointmentStatus::Pending, AppointmentStatus::Rejected),
            Self::Complete => (AppointmentStatus::Approved, AppointmentStatus::Completed),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderChatView {
    #[serde(flatten)]
    pub chat: Chat,
    pub user_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderOverview {
    pub service: ServiceProvider,
    pub profile: Profile,
    pub appointments: Vec<Appointment>,
    /// Assigned to this provider, or still open
    pub urgent_requests: Vec<UrgentRequest>,
    pub chats: Vec<ProviderChatView>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct SlotsRequest {
    pub slots: Vec<String>,
}

/// Provider record linked to a user account
pub fn provider_for_user(db: &Database, user_id: u64) -> AppResult<&ServiceProvider> {
    db.service_providers
        .iter()
        .find(|p| p.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("No provider profile found for this account".into()))
}

fn visible_urgent(request: &UrgentRequest, provider_id: u64) -> bool {
    request.assigned_provider_id == Some(provider_id) || request.status.is_open()
}

pub fn overview(store: &Store, user_id: u64) -> AppResult<ProviderOverview> {
    store.view(|db| -> AppResult<ProviderOverview> {
        let service = provider_for_user(db, user_id)?.clone();
        let profile = super::find_user(db, user_id).map(Profile::from)?;
        let id = service.id;

        Ok(ProviderOverview {
            appointments: db
                .appointments
                .iter()
                .filter(|a| a.provider_id == id)
                .cloned()
                .collect(),
            urgent_requests: db
                .urgent_requests
                .iter()
                .filter(|r| visible_urgent(r, id))
                .cloned()
                .collect(),
            chats: db
                .chats
                .iter()
                .filter(|c| c.provider_id == id)
                .map(|c| ProviderChatView {
                    chat: c.clone(),
                    user_name: db
                        .users
                        .iter()
                        .find(|u| u.id == c.user_id)
                        .map(|u| u.name.clone())
                        .unwrap_or_else(|| "User".to_string()),
                })
                .collect(),
            reviews: db
                .reviews
                .iter()
                .filter(|r| r.provider_id == id)
                .cloned()
                .collect(),
            service,
            profile,
        })
    })
}

/// Flip the availability flag; returns the new value
pub fn toggle_availability(store: &Store, user_id: u64) -> AppResult<bool> {
    store.update("toggle_availability", |db| {
        let id = provider_for_user(db, user_id)?.id;
        let provider = db
            .service_providers
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("service provider", id))?;
        provider.available = !provider.available;
        Ok(provider.available)
    })
}

pub fn decide_appointment(
    store: &Store,
    user_id: u64,
    appointment_id: u64,
    action: AppointmentAction,
) -> AppResult<Appointment> {
    store.update("decide_appointment", |db| {
        let provider_id = provider_for_user(db, user_id)?.id;
        let appointment = db
            .appointments
            .iter_mut()
            .find(|a| a.id == appointment_id && a.provider_id == provider_id)
            .ok_or_else(|| AppError::not_found("appointment", appointment_id))?;

        let (from, to) = action.transition();
        if appointment.status != from {
            return Err(AppError::Conflict(format!(
                "Appointment {} is {}, expected {}",
                appointment_id,
                appointment.status.as_str(),
                from.as_str()
            )));
        }
        appointment.status = to;
        Ok(appointment.clone())
    })
}

/// Take an open urgent request
pub fn accept_urgent(store: &Store, user_id: u64, urgent_id: u64) -> AppResult<UrgentRequest> {
    store.update("accept_urgent", |db| {
        let provider_id = provider_for_user(db, user_id)?.id;
        let request = db
            .urgent_requests
            .iter_mut()
            .find(|r| r.id == urgent_id && visible_urgent(r, provider_id))
            .ok_or_else(|| AppError::not_found("urgent request", urgent_id))?;

        if !request.status.is_open() {
            return Err(AppError::Conflict(format!(
                "Urgent request {} is no longer open",
                urgent_id
            )));
        }
        request.status = UrgentStatus::Accepted;
        request.assigned_provider_id = Some(provider_id);
        Ok(request.clone())
    })
}

pub fn close_urgent(store: &Store, user_id: u64, urgent_id: u64) -> AppResult<UrgentRequest> {
    store.update("close_urgent", |db| {
        let provider_id = provider_for_user(db, user_id)?.id;
        let request = db
            .urgent_requests
            .iter_mut()
            .find(|r| r.id == urgent_id && visible_urgent(r, provider_id))
            .ok_or_else(|| AppError::not_found("urgent request", urgent_id))?;

        if request.status == UrgentStatus::Closed {
            return Err(AppError::Conflict(format!(
                "Urgent request {} is already closed",
                urgent_id
            )));
        }
        request.status = UrgentStatus::Closed;
        Ok(request.clone())
    })
}

pub fn send_message(store: &Store, user_id: u64, chat_id: u64, text: &str) -> AppResult<ChatMessage> {
    store.update("provider_send_message", |db| {
        let provider_id = provider_for_user(db, user_id)?.id;
        let chat = db
            .chats
            .iter_mut()
            .find(|c| c.id == chat_id && c.provider_id == provider_id)
            .ok_or_else(|| AppError::not_found("chat", chat_id))?;
        push_message(chat, Sender::Provider, text)
    })
}

/// Trim slots, drop blanks and repeated entries
pub fn normalize_slots(slots: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(slots.len());
    for slot in slots {
        let slot = slot.trim();
        if slot.is_empty() || out.iter().any(|s| s == slot) {
            continue;
        }
        out.push(slot.to_string());
    }
    out
}

pub fn update_slots(store: &Store, user_id: u64, slots: Vec<String>) -> AppResult<ServiceProvider> {
    let slots = normalize_slots(slots);
    store.update("update_slots", |db| {
        let id = provider_for_user(db, user_id)?.id;
        let provider = db
            .service_providers
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::not_found("service provider", id))?;
        provider.slots = slots;
        Ok(provider.clone())
    })
}

fn provider_session(CurrentSession(session): CurrentSession) -> AppResult<crate::session::Session> {
    require_role(&session, Role::Provider)?;
    Ok(session)
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(overview_handler))
        .route("/availability", post(availability_handler))
        .route("/appointments/{id}/{action}", post(appointment_handler))
        .route("/urgent/{id}/accept", post(accept_urgent_handler))
        .route("/urgent/{id}/close", post(close_urgent_handler))
        .route("/chats/{id}/messages", post(message_handler))
        .route("/slots", put(slots_handler))
        .route("/profile", patch(profile_handler))
        .route("/snapshot", get(snapshot_handler))
}

/// GET /provider/dashboard
async fn overview_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<ProviderOverview>> {
    let session = provider_session(current)?;
    Ok(Json(overview(&state.store, session.user_id)?))
}

/// POST /provider/dashboard/availability
async fn availability_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<AvailabilityResponse>> {
    let session = provider_session(current)?;
    let available = toggle_availability(&state.store, session.user_id)?;
    tracing::info!(user_id = session.user_id, available, "availability changed");
    Ok(Json(AvailabilityResponse { available }))
}

/// POST /provider/dashboard/appointments/{id}/{approve|reject|complete}
async fn appointment_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path((id, action)): Path<(u64, String)>,
) -> AppResult<Json<Appointment>> {
    let session = provider_session(current)?;
    let action = AppointmentAction::from_path(&action)?;
    let appointment = decide_appointment(&state.store, session.user_id, id, action)?;
    tracing::info!(
        user_id = session.user_id,
        appointment_id = id,
        status = appointment.status.as_str(),
        "appointment updated"
    );
    Ok(Json(appointment))
}

/// POST /provider/dashboard/urgent/{id}/accept
async fn accept_urgent_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<u64>,
) -> AppResult<Json<UrgentRequest>> {
    let session = provider_session(current)?;
    Ok(Json(accept_urgent(&state.store, session.user_id, id)?))
}

/// POST /provider/dashboard/urgent/{id}/close
async fn close_urgent_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<u64>,
) -> AppResult<Json<UrgentRequest>> {
    let session = provider_session(current)?;
    Ok(Json(close_urgent(&state.store, session.user_id, id)?))
}

/// POST /provider/dashboard/chats/{id}/messages
async fn message_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<u64>,
    Json(body): Json<MessageBody>,
) -> AppResult<Json<ChatMessage>> {
    let session = provider_session(current)?;
    Ok(Json(send_message(&state.store, session.user_id, id, &body.text)?))
}

/// PUT /provider/dashboard/slots
async fn slots_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Json(req): Json<SlotsRequest>,
) -> AppResult<Json<ServiceProvider>> {
    let session = provider_session(current)?;
    Ok(Json(update_slots(&state.store, session.user_id, req.slots)?))
}

/// PATCH /provider/dashboard/profile
async fn profile_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<Profile>> {
    let session = provider_session(current)?;
    let profile = state
        .store
        .update("provider_save_profile", |db| update_profile(db, session.user_id, update))?;
    Ok(Json(profile))
}

/// GET /provider/dashboard/snapshot - download the in-memory store
async fn snapshot_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<impl IntoResponse> {
    provider_session(current)?;
    let body = state
        .store
        .snapshot_json()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", SNAPSHOT_FILE_NAME),
            ),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_store;

    // Dr. Rohit Mehta: user 3, provider 101
    const ROHIT: u64 = 3;
    // Kavita Iyer: user 5, provider 103 (pending verification)
    const KAVITA: u64 = 5;

    #[test]
    fn test_overview_scoping() {
        let store = sample_store();
        let overview = overview(&store, ROHIT).unwrap();
        assert_eq!(overview.service.id, 101);
        assert_eq!(overview.appointments.len(), 2);
        assert!(overview.appointments.iter().all(|a| a.provider_id == 101));
        // 3001 is open, 3002 is assigned to 101
        assert_eq!(overview.urgent_requests.len(), 2);
        assert_eq!(overview.chats.len(), 1);
        assert_eq!(overview.chats[0].user_name, "Amit Sharma");
        assert_eq!(overview.reviews.len(), 1);
    }

    #[test]
    fn test_missing_provider_profile() {
        let store = sample_store();
        // user 1 is a plain user
        let err = overview(&store, 1).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_toggle_availability() {
        let store = sample_store();
        assert!(!toggle_availability(&store, ROHIT).unwrap());
        assert!(toggle_availability(&store, ROHIT).unwrap());
    }

    #[test]
    fn test_appointment_transitions() {
        let store = sample_store();
        // 1001 is approved, so it can only be completed
        let err = decide_appointment(&store, ROHIT, 1001, AppointmentAction::Approve).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let done = decide_appointment(&store, ROHIT, 1001, AppointmentAction::Complete).unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);

        let again = decide_appointment(&store, ROHIT, 1001, AppointmentAction::Complete);
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_approve_and_reject_pending() {
        let store = sample_store();
        let appt = crate::dashboard::user::quick_book(&store, 1, 101).unwrap();
        let approved = decide_appointment(&store, ROHIT, appt.id, AppointmentAction::Approve).unwrap();
        assert_eq!(approved.status, AppointmentStatus::Approved);

        let appt = crate::dashboard::user::quick_book(&store, 2, 101).unwrap();
        let rejected = decide_appointment(&store, ROHIT, appt.id, AppointmentAction::Reject).unwrap();
        assert_eq!(rejected.status, AppointmentStatus::Rejected);
    }

    #[test]
    fn test_cannot_touch_other_providers_appointments() {
        let store = sample_store();
        // 1002 belongs to provider 102
        let err = decide_appointment(&store, ROHIT, 1002, AppointmentAction::Approve).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_accept_and_close_urgent() {
        let store = sample_store();
        let accepted = accept_urgent(&store, KAVITA, 3001).unwrap();
        assert_eq!(accepted.status, UrgentStatus::Accepted);
        assert_eq!(accepted.assigned_provider_id, Some(103));

        // now assigned to 103, invisible to 101
        assert!(matches!(accept_urgent(&store, ROHIT, 3001), Err(AppError::NotFound(_))));
        // and no longer open for 103 either
        assert!(matches!(accept_urgent(&store, KAVITA, 3001), Err(AppError::Conflict(_))));

        let closed = close_urgent(&store, KAVITA, 3001).unwrap();
        assert_eq!(closed.status, UrgentStatus::Closed);
        assert!(matches!(close_urgent(&store, KAVITA, 3001), Err(AppError::Conflict(_))));
    }

    #[test]
    fn test_searching_requests_can_be_accepted() {
        let store = sample_store();
        let created = crate::dashboard::user::create_urgent(&store, 2, "Doctor", "Sprained ankle").unwrap();
        let accepted = accept_urgent(&store, ROHIT, created.id).unwrap();
        assert_eq!(accepted.assigned_provider_id, Some(101));
    }

    #[test]
    fn test_provider_message() {
        let store = sample_store();
        let msg = send_message(&store, ROHIT, 2001, "See you at 10").unwrap();
        assert_eq!(msg.sender, Sender::Provider);
        assert!(matches!(send_message(&store, KAVITA, 2001, "hi"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_normalize_slots() {
        let slots = vec![
            " 9:00 AM ".to_string(),
            "".to_string(),
            "9:00 AM".to_string(),
            "1:00 PM".to_string(),
        ];
        assert_eq!(normalize_slots(slots), vec!["9:00 AM", "1:00 PM"]);
    }

    #[test]
    fn test_update_slots() {
        let store = sample_store();
        let updated = update_slots(&store, KAVITA, vec!["5:00 PM".into()]).unwrap();
        assert_eq!(updated.slots, vec!["5:00 PM"]);
    }

    #[test]
    fn test_action_from_path() {
        assert_eq!(AppointmentAction::from_path("approve").unwrap(), AppointmentAction::Approve);
        assert!(AppointmentAction::from_path("delete").is_err());
    }
}
