//! End-user dashboard.
//!
//! Every operation is scoped to the caller's user id: appointments, chats,
//! reviews and urgent requests of other users are invisible here.

use super::{find_user, provider_name, push_message, require_text, MessageBody, Profile, ProfileUpdate};
use crate::error::{AppError, AppResult};
use crate::models::{
    next_id, Appointment, AppointmentStatus, Chat, ChatMessage, Database, Review, Role, Sender,
    ServiceProvider, UrgentRequest, UrgentStatus, VerificationStatus,
};
use crate::server::extract::{Json, Path, Query};
use crate::server::guard::{require_role, CurrentSession};
use crate::server::AppState;
use crate::store::Store;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Slot assigned by a quick booking
pub const QUICK_BOOK_TIME: &str = "10:00 AM";

const RECENT_LIMIT: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_appointments: usize,
    pub active_chats: usize,
    pub urgent_count: usize,
    pub completed: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOverview {
    pub profile: Profile,
    pub stats: UserStats,
    pub recent_appointments: Vec<Appointment>,
    pub recent_reviews: Vec<Review>,
    /// Shown as a badge when any appointment got approved
    pub has_approved: bool,
}

/// Filters of the "Find Services" view
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderQuery {
    /// Exact category, or `All`
    pub category: Option<String>,
    pub min_rating: Option<f64>,
    /// Case-insensitive match on specialization, address and name
    pub search: Option<String>,
}

/// A provider card
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderListing {
    #[serde(flatten)]
    pub provider: ServiceProvider,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    #[serde(flatten)]
    pub chat: Chat,
    pub provider_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub provider_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub provider_id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub provider_id: u64,
    pub rating: u8,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct UrgentCreateRequest {
    pub category: String,
    pub description: String,
}

pub fn overview(store: &Store, user_id: u64) -> AppResult<UserOverview> {
    store.view(|db| -> AppResult<UserOverview> {
        // A session whose account vanished is treated as logged out.
        let user = find_user(db, user_id).map_err(|_| AppError::Unauthorized)?;
        let appointments = own(&db.appointments, |a| a.user_id == user_id);
        let stats = UserStats {
            total_appointments: appointments.len(),
            active_chats: db.chats.iter().filter(|c| c.user_id == user_id).count(),
            urgent_count: db.urgent_requests.iter().filter(|r| r.user_id == user_id).count(),
            completed: appointments
                .iter()
                .filter(|a| a.status == AppointmentStatus::Completed)
                .count(),
        };

        Ok(UserOverview {
            profile: Profile::from(user),
            stats,
            has_approved: appointments
                .iter()
                .any(|a| a.status == AppointmentStatus::Approved),
            recent_appointments: appointments.into_iter().take(RECENT_LIMIT).collect(),
            recent_reviews: own(&db.reviews, |r| r.user_id == user_id)
                .into_iter()
                .take(RECENT_LIMIT)
                .collect(),
        })
    })
}

fn own<T: Clone>(records: &[T], pred: impl Fn(&T) -> bool) -> Vec<T> {
    records.iter().filter(|r| pred(r)).cloned().collect()
}

/// Verified providers matching the filters
pub fn find_providers(db: &Database, query: &ProviderQuery) -> Vec<ProviderListing> {
    let category = query.category.as_deref().unwrap_or("All");
    let min_rating = query.min_rating.unwrap_or(0.0);
    let search = query
        .search
        .as_deref()
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    db.service_providers
        .iter()
        .filter(|p| p.verification_status == VerificationStatus::Verified)
        .filter(|p| category == "All" || p.category == category)
        .filter(|p| p.rating >= min_rating)
        .filter_map(|p| {
            let user = db.users.iter().find(|u| u.id == p.user_id);
            let name = user.map(|u| u.name.clone()).unwrap_or_default();
            let address = user.map(|u| u.address.clone()).unwrap_or_default();
            let haystack = format!("{} {} {}", p.specialization, address, name).to_lowercase();
            if !search.is_empty() && !haystack.contains(&search) {
                return None;
            }
            Some(ProviderListing {
                provider: p.clone(),
                name,
                address,
            })
        })
        .collect()
}

/// Request an appointment with a provider for today at the default slot
pub fn quick_book(store: &Store, user_id: u64, provider_id: u64) -> AppResult<Appointment> {
    store.update("quick_book", |db| {
        let provider = db
            .service_providers
            .iter()
            .find(|p| p.id == provider_id)
            .ok_or_else(|| AppError::not_found("service provider", provider_id))?;
        if provider.verification_status != VerificationStatus::Verified {
            return Err(AppError::Conflict(format!(
                "Service provider {} is not verified",
                provider_id
            )));
        }
        let appointment = Appointment {
            id: next_id(&db.appointments)?,
            user_id,
            provider_id,
            date: super::today(),
            time: QUICK_BOOK_TIME.to_string(),
            status: AppointmentStatus::Pending,
        };
        db.appointments.insert(0, appointment.clone());
        Ok(appointment)
    })
}

pub fn cancel_appointment(store: &Store, user_id: u64, id: u64) -> AppResult<Appointment> {
    store.update("cancel_appointment", |db| {
        let appointment = db
            .appointments
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id)
            .ok_or_else(|| AppError::not_found("appointment", id))?;
        appointment.status = AppointmentStatus::Cancelled;
        Ok(appointment.clone())
    })
}

/// Existing chat with the provider, or a new empty one.
///
/// Returns the chat and whether it was created.
pub fn start_chat(store: &Store, user_id: u64, provider_id: u64) -> AppResult<(Chat, bool)> {
    store.update("start_chat", |db| {
        if let Some(existing) = db
            .chats
            .iter()
            .find(|c| c.user_id == user_id && c.provider_id == provider_id)
        {
            return Ok((existing.clone(), false));
        }
        if !db.service_providers.iter().any(|p| p.id == provider_id) {
            return Err(AppError::not_found("service provider", provider_id));
        }
        let chat = Chat {
            id: next_id(&db.chats)?,
            user_id,
            provider_id,
            messages: Vec::new(),
        };
        db.chats.insert(0, chat.clone());
        Ok((chat, true))
    })
}

pub fn send_message(store: &Store, user_id: u64, chat_id: u64, text: &str) -> AppResult<ChatMessage> {
    store.update("user_send_message", |db| {
        let chat = db
            .chats
            .iter_mut()
            .find(|c| c.id == chat_id && c.user_id == user_id)
            .ok_or_else(|| AppError::not_found("chat", chat_id))?;
        push_message(chat, Sender::User, text)
    })
}

pub fn leave_review(store: &Store, user_id: u64, req: ReviewRequest) -> AppResult<Review> {
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5".into()));
    }
    let comment = require_text("comment", &req.comment)?;

    store.update("leave_review", |db| {
        if !db.service_providers.iter().any(|p| p.id == req.provider_id) {
            return Err(AppError::not_found("service provider", req.provider_id));
        }
        let review = Review {
            id: next_id(&db.reviews)?,
            user_id,
            provider_id: req.provider_id,
            rating: req.rating,
            comment,
        };
        db.reviews.insert(0, review.clone());
        Ok(review)
    })
}

/// New urgent request, left `searching` with no provider assigned
pub fn create_urgent(store: &Store, user_id: u64, category: &str, description: &str) -> AppResult<UrgentRequest> {
    let category = require_text("category", category)?;
    let description = require_text("description", description)?;

    store.update("create_urgent", |db| {
        let request = UrgentRequest {
            id: next_id(&db.urgent_requests)?,
            user_id,
            category,
            description,
            status: UrgentStatus::Searching,
            assigned_provider_id: None,
        };
        db.urgent_requests.insert(0, request.clone());
        Ok(request)
    })
}

fn user_session(CurrentSession(session): CurrentSession) -> AppResult<crate::session::Session> {
    require_role(&session, Role::User)?;
    Ok(session)
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(overview_handler))
        .route("/providers", get(providers_handler))
        .route("/appointments", get(appointments_handler).post(book_handler))
        .route("/appointments/{id}/cancel", post(cancel_handler))
        .route("/chats", get(chats_handler).post(start_chat_handler))
        .route("/chats/{id}/messages", post(message_handler))
        .route("/reviews", get(reviews_handler).post(review_handler))
        .route("/urgent", get(urgent_handler).post(create_urgent_handler))
        .route("/profile", get(profile_handler).patch(update_profile_handler))
}

/// GET /dashboard
async fn overview_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<UserOverview>> {
    let session = user_session(current)?;
    Ok(Json(overview(&state.store, session.user_id)?))
}

/// GET /dashboard/providers
async fn providers_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Query(query): Query<ProviderQuery>,
) -> AppResult<Json<Vec<ProviderListing>>> {
    user_session(current)?;
    Ok(Json(state.store.view(|db| find_providers(db, &query))))
}

/// GET /dashboard/appointments
async fn appointments_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<Vec<Appointment>>> {
    let session = user_session(current)?;
    Ok(Json(state.store.view(|db| {
        own(&db.appointments, |a| a.user_id == session.user_id)
    })))
}

/// POST /dashboard/appointments
async fn book_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Json(req): Json<BookRequest>,
) -> AppResult<(StatusCode, Json<Appointment>)> {
    let session = user_session(current)?;
    let appointment = quick_book(&state.store, session.user_id, req.provider_id)?;
    tracing::info!(
        user_id = session.user_id,
        provider_id = req.provider_id,
        appointment_id = appointment.id,
        "appointment requested"
    );
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// POST /dashboard/appointments/{id}/cancel
async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<u64>,
) -> AppResult<Json<Appointment>> {
    let session = user_session(current)?;
    Ok(Json(cancel_appointment(&state.store, session.user_id, id)?))
}

/// GET /dashboard/chats
async fn chats_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<Vec<ChatView>>> {
    let session = user_session(current)?;
    let chats = state.store.view(|db| {
        db.chats
            .iter()
            .filter(|c| c.user_id == session.user_id)
            .map(|c| ChatView {
                chat: c.clone(),
                provider_name: provider_name(db, c.provider_id),
            })
            .collect()
    });
    Ok(Json(chats))
}

/// POST /dashboard/chats
async fn start_chat_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Json(req): Json<ChatRequest>,
) -> AppResult<(StatusCode, Json<Chat>)> {
    let session = user_session(current)?;
    let (chat, created) = start_chat(&state.store, session.user_id, req.provider_id)?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(chat)))
}

/// POST /dashboard/chats/{id}/messages
async fn message_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Path(id): Path<u64>,
    Json(body): Json<MessageBody>,
) -> AppResult<Json<ChatMessage>> {
    let session = user_session(current)?;
    Ok(Json(send_message(&state.store, session.user_id, id, &body.text)?))
}

/// GET /dashboard/reviews
async fn reviews_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<Vec<Review>>> {
    let session = user_session(current)?;
    Ok(Json(state.store.view(|db| {
        own(&db.reviews, |r| r.user_id == session.user_id)
    })))
}

/// POST /dashboard/reviews
async fn review_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Json(req): Json<ReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let session = user_session(current)?;
    let review = leave_review(&state.store, session.user_id, req)?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /dashboard/urgent
async fn urgent_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<Vec<UrgentRequest>>> {
    let session = user_session(current)?;
    Ok(Json(state.store.view(|db| {
        own(&db.urgent_requests, |r| r.user_id == session.user_id)
    })))
}

/// POST /dashboard/urgent
async fn create_urgent_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Json(req): Json<UrgentCreateRequest>,
) -> AppResult<(StatusCode, Json<UrgentRequest>)> {
    let session = user_session(current)?;
    let request = create_urgent(&state.store, session.user_id, &req.category, &req.description)?;
    tracing::info!(
        user_id = session.user_id,
        urgent_id = request.id,
        category = %request.category,
        "urgent request created"
    );
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /dashboard/profile
async fn profile_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
) -> AppResult<Json<Profile>> {
    let session = user_session(current)?;
    let profile = state
        .store
        .view(|db| find_user(db, session.user_id).map(Profile::from))?;
    Ok(Json(profile))
}

/// PATCH /dashboard/profile
async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    current: CurrentSession,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<Profile>> {
    let session = user_session(current)?;
    let profile = state
        .store
        .update("user_save_profile", |db| super::update_profile(db, session.user_id, update))?;
    Ok(Json(profile))
}
