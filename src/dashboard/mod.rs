//! Role dashboards: filtered views over the store plus the mutations each
//! role may issue.
//!
//! ```text
//!   /dashboard            user      bookings, chats, urgent help, reviews
//!   /provider/dashboard   provider  appointment decisions, urgent pickup, slots
//!   /admin/dashboard      admin     moderation and overview counts
//! ```
//!
//! Every route sits behind the session guard and a role check.

pub mod admin;
pub mod provider;
pub mod user;

use crate::error::{AppError, AppResult};
use crate::models::{Chat, ChatMessage, Database, Sender, User};
use crate::server::AppState;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// All dashboard routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/dashboard", user::routes())
        .nest("/provider/dashboard", provider::routes())
        .nest("/admin/dashboard", admin::routes())
}

/// Today's date as stored on appointments (UTC, `YYYY-MM-DD`)
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Trimmed, non-blank text or a 400
pub fn require_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("Missing {}", field)));
    }
    Ok(trimmed.to_string())
}

/// Body of a chat message
#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub text: String,
}

/// Append a message to a chat
pub(crate) fn push_message(chat: &mut Chat, sender: Sender, text: &str) -> AppResult<ChatMessage> {
    let message = ChatMessage {
        sender,
        text: require_text("message text", text)?,
        timestamp: Utc::now().to_rfc3339(),
    };
    chat.messages.push(message.clone());
    Ok(message)
}

/// Editable profile fields; absent fields are left alone
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Account details without the password
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: crate::models::Role,
    pub phone: String,
    pub address: String,
    pub blocked: bool,
}

impl From<&User> for Profile {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
            phone: u.phone.clone(),
            address: u.address.clone(),
            blocked: u.blocked,
        }
    }
}

pub(crate) fn find_user(db: &Database, user_id: u64) -> AppResult<&User> {
    db.users
        .iter()
        .find(|u| u.id == user_id)
        .ok_or_else(|| AppError::not_found("user", user_id))
}

/// Apply a profile update to a user record
pub(crate) fn update_profile(db: &mut Database, user_id: u64, update: ProfileUpdate) -> AppResult<Profile> {
    let user = db
        .users
        .iter_mut()
        .find(|u| u.id == user_id)
        .ok_or_else(|| AppError::not_found("user", user_id))?;

    if let Some(name) = update.name {
        user.name = require_text("name", &name)?;
    }
    if let Some(phone) = update.phone {
        user.phone = phone.trim().to_string();
    }
    if let Some(address) = update.address {
        user.address = address.trim().to_string();
    }

    Ok(Profile::from(&*user))
}

/// Display name of a provider's linked user
pub(crate) fn provider_name(db: &Database, provider_id: u64) -> String {
    db.service_providers
        .iter()
        .find(|p| p.id == provider_id)
        .and_then(|p| db.users.iter().find(|u| u.id == p.user_id))
        .map(|u| u.name.clone())
        .unwrap_or_else(|| "Provider".to_string())
}
