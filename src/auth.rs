//! Credential matching against the mock store.

use crate::models::{Role, User};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a login attempt was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginError {
    /// No account with that email
    #[error("Invalid email or password")]
    NoUser,
    /// Account exists but the password differs
    #[error("Invalid email or password")]
    BadPassword,
    /// Credentials are valid but the account has another role
    #[error("Selected role does not match account role")]
    RoleMismatch { actual: Role },
}

impl LoginError {
    pub fn reason(&self) -> &'static str {
        match self {
            LoginError::NoUser => "no-user",
            LoginError::BadPassword => "bad-password",
            LoginError::RoleMismatch { .. } => "role-mismatch",
        }
    }
}

/// Credentials submitted by a client
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: SecretString,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    Role::User.as_str().to_string()
}

/// Entry of the demo credential list shown on the login page
#[derive(Debug, Clone, Serialize)]
pub struct DemoCredential {
    pub label: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Match `(email, password, role)` against the user list.
///
/// The email is compared trimmed and case-insensitively, the entered password
/// is trimmed and must equal the stored one exactly, and the role is compared
/// case-insensitively. Checks run in that order, so the first failing one
/// decides the reason.
pub fn attempt_login<'a>(
    users: &'a [User],
    email: &str,
    password: &str,
    role: &str,
) -> Result<&'a User, LoginError> {
    let email_norm = email.trim().to_lowercase();
    let found = users
        .iter()
        .find(|u| u.email.trim().to_lowercase() == email_norm)
        .ok_or(LoginError::NoUser)?;

    if found.password != password.trim() {
        return Err(LoginError::BadPassword);
    }

    let selected = role.trim().to_lowercase();
    if found.role.as_str() != selected {
        return Err(LoginError::RoleMismatch { actual: found.role });
    }

    Ok(found)
}

/// Same as [`attempt_login`] for a deserialized request
pub fn attempt_request<'a>(users: &'a [User], req: &LoginRequest) -> Result<&'a User, LoginError> {
    attempt_login(users, &req.email, req.password.expose_secret(), &req.role)
}

/// Dashboard a role lands on after login
pub fn landing_path(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin/dashboard",
        Role::Provider => "/provider/dashboard",
        Role::User => "/dashboard",
    }
}

pub fn demo_credentials(users: &[User]) -> Vec<DemoCredential> {
    users
        .iter()
        .map(|u| DemoCredential {
            label: format!("{}: {}", u.role.label(), u.name),
            email: u.email.clone(),
            password: u.password.clone(),
            role: u.role,
        })
        .collect()
}
