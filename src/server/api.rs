//! REST resources over the mock store collections.
//!
//! `GET /<collection>`, `GET /<collection>/{id}` and `PATCH /<collection>/{id}`
//! for each collection. PATCH is a shallow merge applied in memory only.

use super::extract::{Json, Path};
use super::AppState;
use crate::error::AppResult;
use crate::store::Collection;
use axum::{extract::State, routing::get, Router};
use serde_json::Value;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Collection::ALL
        .into_iter()
        .fold(Router::new(), |router, coll| router.merge(resource(coll)))
}

fn resource(coll: Collection) -> Router<Arc<AppState>> {
    let base = format!("/{}", coll.as_str());
    let item = format!("{}/{{id}}", base);

    Router::new()
        .route(
            &base,
            get(move |State(state): State<Arc<AppState>>| async move { list(&state, coll) }),
        )
        .route(
            &item,
            get(
                move |State(state): State<Arc<AppState>>, Path(id): Path<u64>| async move {
                    get_one(&state, coll, id)
                },
            )
            .patch(
                move |State(state): State<Arc<AppState>>,
                      Path(id): Path<u64>,
                      Json(patch): Json<Value>| async move {
                    patch_one(&state, coll, id, &patch)
                },
            ),
        )
}

fn list(state: &AppState, coll: Collection) -> AppResult<Json<Value>> {
    Ok(Json(state.store.list_json(coll)?))
}

fn get_one(state: &AppState, coll: Collection, id: u64) -> AppResult<Json<Value>> {
    Ok(Json(state.store.get_json(coll, id)?))
}

fn patch_one(state: &AppState, coll: Collection, id: u64, patch: &Value) -> AppResult<Json<Value>> {
    let updated = state.store.patch_json(coll, id, patch)?;
    tracing::info!(collection = coll.as_str(), id, "record patched");
    Ok(Json(updated))
}
