//! In-memory mock store.
//!
//! The document is loaded once at startup and every write stays in memory.
//! `snapshot_json` is the only way to get the mutated state back out.

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{Database, Record};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const DEMO_DOCUMENT: &str = include_str!("../data/db.json");

static DEMO_DATABASE: Lazy<Database> = Lazy::new(|| {
    serde_json::from_str(DEMO_DOCUMENT).unwrap_or_else(|e| {
        tracing::error!(error = %e, "bundled demo document is invalid");
        Database::default()
    })
});

/// The bundled demo document
pub fn demo_database() -> Database {
    DEMO_DATABASE.clone()
}

/// Load a `db.json` document from disk
pub fn load_database(path: &Path) -> Result<Database> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let db: Database = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(db)
}

/// Collections exposed over the REST resources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    ServiceProviders,
    Appointments,
    Chats,
    UrgentRequests,
    Reviews,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::ServiceProviders,
        Collection::Appointments,
        Collection::Chats,
        Collection::UrgentRequests,
        Collection::Reviews,
    ];

    /// Path segment and JSON key
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::ServiceProviders => "serviceProviders",
            Collection::Appointments => "appointments",
            Collection::Chats => "chats",
            Collection::UrgentRequests => "urgentRequests",
            Collection::Reviews => "reviews",
        }
    }

    fn singular(&self) -> &'static str {
        match self {
            Collection::Users => "user",
            Collection::ServiceProviders => "service provider",
            Collection::Appointments => "appointment",
            Collection::Chats => "chat",
            Collection::UrgentRequests => "urgent request",
            Collection::Reviews => "review",
        }
    }
}

/// Record counts, used by `/health`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCounts {
    pub users: usize,
    pub service_providers: usize,
    pub appointments: usize,
    pub chats: usize,
    pub urgent_requests: usize,
    pub reviews: usize,
}

/// Shared mock store
#[derive(Debug)]
pub struct Store {
    db: RwLock<Database>,
}

impl Store {
    pub fn new(db: Database) -> Arc<Self> {
        Arc::new(Self {
            db: RwLock::new(db),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Database> {
        self.db.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Database> {
        self.db.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a read-only view over the document
    pub fn view<R>(&self, f: impl FnOnce(&Database) -> R) -> R {
        f(&self.read())
    }

    /// Run a mutation against the document.
    ///
    /// `op` names the mutation for logs and metrics.
    pub fn update<R>(&self, op: &str, f: impl FnOnce(&mut Database) -> AppResult<R>) -> AppResult<R> {
        let result = f(&mut self.write());
        match &result {
            Ok(_) => {
                metrics::record_mutation(op);
                tracing::debug!(op, "store mutation applied");
            }
            Err(e) => tracing::debug!(op, error = %e, "store mutation refused"),
        }
        result
    }

    pub fn snapshot(&self) -> Database {
        self.read().clone()
    }

    /// Pretty JSON of the current in-memory state
    pub fn snapshot_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&*self.read())?)
    }

    pub fn counts(&self) -> StoreCounts {
        let db = self.read();
        StoreCounts {
            users: db.users.len(),
            service_providers: db.service_providers.len(),
            appointments: db.appointments.len(),
            chats: db.chats.len(),
            urgent_requests: db.urgent_requests.len(),
            reviews: db.reviews.len(),
        }
    }

    /// Whole collection as JSON
    pub fn list_json(&self, coll: Collection) -> AppResult<Value> {
        let db = self.read();
        let value = match coll {
            Collection::Users => serde_json::to_value(&db.users)?,
            Collection::ServiceProviders => serde_json::to_value(&db.service_providers)?,
            Collection::Appointments => serde_json::to_value(&db.appointments)?,
            Collection::Chats => serde_json::to_value(&db.chats)?,
            Collection::UrgentRequests => serde_json::to_value(&db.urgent_requests)?,
            Collection::Reviews => serde_json::to_value(&db.reviews)?,
        };
        Ok(value)
    }

    /// One record as JSON
    pub fn get_json(&self, coll: Collection, id: u64) -> AppResult<Value> {
        let db = self.read();
        let value = match coll {
            Collection::Users => find_json(&db.users, id),
            Collection::ServiceProviders => find_json(&db.service_providers, id),
            Collection::Appointments => find_json(&db.appointments, id),
            Collection::Chats => find_json(&db.chats, id),
            Collection::UrgentRequests => find_json(&db.urgent_requests, id),
            Collection::Reviews => find_json(&db.reviews, id),
        }?;
        value.ok_or_else(|| AppError::not_found(coll.singular(), id))
    }

    /// Shallow-merge `patch` into a record and return the updated record
    pub fn patch_json(&self, coll: Collection, id: u64, patch: &Value) -> AppResult<Value> {
        let op = format!("patch_{}", coll.as_str());
        self.update(&op, |db| {
            let updated = match coll {
                Collection::Users => patch_in(&mut db.users, id, patch),
                Collection::ServiceProviders => patch_in(&mut db.service_providers, id, patch),
                Collection::Appointments => patch_in(&mut db.appointments, id, patch),
                Collection::Chats => patch_in(&mut db.chats, id, patch),
                Collection::UrgentRequests => patch_in(&mut db.urgent_requests, id, patch),
                Collection::Reviews => patch_in(&mut db.reviews, id, patch),
            }?;
            updated.ok_or_else(|| AppError::not_found(coll.singular(), id))
        })
    }
}

fn find_json<T: Record + Serialize>(records: &[T], id: u64) -> AppResult<Option<Value>> {
    match records.iter().find(|r| r.id() == id) {
        Some(r) => Ok(Some(serde_json::to_value(r)?)),
        None => Ok(None),
    }
}

fn patch_in<T>(records: &mut [T], id: u64, patch: &Value) -> AppResult<Option<Value>>
where
    T: Record + Serialize + DeserializeOwned,
{
    let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
        return Ok(None);
    };
    let merged = merge_patch(&*record, patch)?;
    *record = merged;
    Ok(Some(serde_json::to_value(&*record)?))
}

/// `{ ...record, ...patch }` with the result re-validated as `T`.
///
/// The `id` field is never overwritten.
pub fn merge_patch<T>(record: &T, patch: &Value) -> AppResult<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    let Value::Object(fields) = patch else {
        return Err(AppError::BadRequest("Patch body must be a JSON object".into()));
    };

    let mut value = serde_json::to_value(record)?;
    if let Value::Object(target) = &mut value {
        for (key, field) in fields {
            if key == "id" {
                continue;
            }
            target.insert(key.clone(), field.clone());
        }
    }

    serde_json::from_value(value).map_err(|e| AppError::BadRequest(format!("Invalid patch: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, VerificationStatus};
    use serde_json::json;

    fn store() -> Arc<Store> {
        Store::new(demo_database())
    }

    #[test]
    fn test_demo_document_parses() {
        let counts = store().counts();
        assert_eq!(counts.users, 6);
        assert_eq!(counts.service_providers, 3);
        assert!(counts.appointments > 0);
    }

    #[test]
    fn test_load_database_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"users": [], "reviews": []}"#).unwrap();
        let db = load_database(&path).unwrap();
        assert!(db.users.is_empty());

        assert!(load_database(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_get_json_unknown_id() {
        let err = store().get_json(Collection::Appointments, 9999).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_patch_is_shallow_merge() {
        let store = store();
        let updated = store
            .patch_json(
                Collection::ServiceProviders,
                103,
                &json!({ "verificationStatus": "verified" }),
            )
            .unwrap();
        assert_eq!(updated["verificationStatus"], "verified");
        assert_eq!(updated["category"], "Teacher");

        let status = store.view(|db| {
            db.service_providers
                .iter()
                .find(|p| p.id == 103)
                .map(|p| p.verification_status)
        });
        assert_eq!(status, Some(VerificationStatus::Verified));
    }

    #[test]
    fn test_patch_cannot_change_id() {
        let store = store();
        let updated = store
            .patch_json(Collection::Appointments, 1002, &json!({ "id": 1, "status": "cancelled" }))
            .unwrap();
        assert_eq!(updated["id"], 1002);
        assert_eq!(updated["status"], AppointmentStatus::Cancelled.as_str());
    }

    #[test]
    fn test_patch_rejects_invalid_values() {
        let store = store();
        let err = store
            .patch_json(Collection::Appointments, 1002, &json!({ "status": "teleported" }))
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = store
            .patch_json(Collection::Users, 1, &json!(["blocked"]))
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        // refused patches leave the record untouched
        let status = store.get_json(Collection::Appointments, 1002).unwrap()["status"].clone();
        assert_eq!(status, "pending");
    }

    #[test]
    fn test_snapshot_round_trips() {
        let store = store();
        let json = store.snapshot_json().unwrap();
        let parsed: Database = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, store.snapshot());
        assert!(json.contains("\"serviceProviders\""));
    }
}
