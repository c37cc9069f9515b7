//! Login sessions, keyed by bearer token.
//!
//! A session holds what the browser used to keep in session storage after a
//! successful login: display name, user id and role. There is no expiry; a
//! session lives until logout or process exit.

use crate::models::{Role, User};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

/// State recorded for a logged-in user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Bearer token handed to the client
    pub token: String,
    pub user_id: u64,
    /// Display name at login time
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Live sessions
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
        })
    }

    /// Start a session for a matched user
    pub fn create(&self, user: &User) -> Session {
        let session = Session {
            token: uuid::Uuid::new_v4().to_string(),
            user_id: user.id,
            name: user.name.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        self.sessions.insert(session.token.clone(), session.clone());
        session
    }

    pub fn get(&self, token: &str) -> Option<Session> {
        self.sessions.get(token).map(|r| r.clone())
    }

    /// End a session; false when the token was unknown
    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_database;

    #[test]
    fn test_create_and_lookup() {
        let store = SessionStore::new();
        let db = sample_database();
        let user = &db.users[2];

        let session = store.create(user);
        assert!(!session.token.is_empty());
        assert_eq!(session.role, Role::Provider);

        let found = store.get(&session.token).unwrap();
        assert_eq!(found, session);
        assert!(store.get("not-a-token").is_none());
    }

    #[test]
    fn test_each_login_gets_its_own_token() {
        let store = SessionStore::new();
        let db = sample_database();

        let a = store.create(&db.users[0]);
        let b = store.create(&db.users[0]);
        assert_ne!(a.token, b.token);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_remove() {
        let store = SessionStore::new();
        let db = sample_database();
        let session = store.create(&db.users[0]);

        assert!(store.remove(&session.token));
        assert!(store.get(&session.token).is_none());
        // Can't remove twice
        assert!(!store.remove(&session.token));
    }
}
