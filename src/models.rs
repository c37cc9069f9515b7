//! Records of the mock store, in the JSON shape of `db.json`.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Provider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Provider => "provider",
            Role::Admin => "admin",
        }
    }

    /// Label shown next to demo credentials
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Provider => "Provider",
            Role::Admin => "Admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    /// Parses a role, ignoring surrounding whitespace and case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "provider" => Ok(Role::Provider),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    /// Stored in plaintext, as in the demo document
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProvider {
    pub id: u64,
    /// Linked user account
    pub user_id: u64,
    pub category: String,
    #[serde(default)]
    pub specialization: String,
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: u64,
    pub user_id: u64,
    pub provider_id: u64,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Display time such as `10:00 AM`
    pub time: String,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgentStatus {
    /// Visible to every provider
    Open,
    /// Created by a user, still being routed
    Searching,
    Accepted,
    Closed,
}

impl UrgentStatus {
    /// Still waiting for a provider to pick it up
    pub fn is_open(&self) -> bool {
        matches!(self, UrgentStatus::Open | UrgentStatus::Searching)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgentRequest {
    pub id: u64,
    pub user_id: u64,
    pub category: String,
    pub description: String,
    pub status: UrgentStatus,
    #[serde(default)]
    pub assigned_provider_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Provider,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(alias = "senderRole")]
    pub sender: Sender,
    pub text: String,
    #[serde(default, alias = "time")]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: u64,
    pub user_id: u64,
    pub provider_id: u64,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: u64,
    pub user_id: u64,
    pub provider_id: u64,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

/// The whole mock document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub service_providers: Vec<ServiceProvider>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub chats: Vec<Chat>,
    #[serde(default)]
    pub urgent_requests: Vec<UrgentRequest>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// A record addressable by numeric id
pub trait Record {
    fn id(&self) -> u64;
}

macro_rules! impl_record {
    ($($ty:ty),*) => {
        $(impl Record for $ty {
            fn id(&self) -> u64 {
                self.id
            }
        })*
    };
}

impl_record!(User, ServiceProvider, Appointment, Chat, UrgentRequest, Review);

/// Next free id in a collection (`max + 1`, starting at 1)
pub fn next_id<T: Record>(records: &[T]) -> AppResult<u64> {
    records
        .iter()
        .map(Record::id)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| AppError::Conflict("No ids left in this collection".into()))
}
