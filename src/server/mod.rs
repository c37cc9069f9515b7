//! HTTP server using axum.

pub mod api;
pub mod extract;
pub mod guard;
pub mod login;

use crate::config::Config;
use crate::dashboard;
use crate::metrics;
use crate::models::Database;
use crate::session::SessionStore;
use crate::store::Store;
use anyhow::Result;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state for the server
pub struct AppState {
    pub store: Arc<Store>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(db: Database) -> Arc<Self> {
        Arc::new(Self {
            store: Store::new(db),
            sessions: SessionStore::new(),
        })
    }
}

/// Full application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(login::routes())
        .merge(api::routes())
        .merge(dashboard::routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the server until it fails
pub async fn run(config: Config) -> Result<()> {
    let db = config.load_database()?;
    let state = AppState::new(db);
    let counts = state.store.counts();
    tracing::info!(
        users = counts.users,
        providers = counts.service_providers,
        appointments = counts.appointments,
        source = config.db_path.as_deref().unwrap_or("bundled demo"),
        "mock store loaded"
    );

    let app = router(state);
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> &'static str {
    "Hello World"
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "store": state.store.counts(),
        "sessions": state.sessions.count(),
    }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render(),
    )
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{sample_state, spawn_server};
    use reqwest::{Client, StatusCode};
    use serde_json::{json, Value};

    async fn login(client: &Client, base: &str, email: &str, password: &str, role: &str) -> String {
        let resp = client
            .post(format!("{}/login", base))
            .json(&json!({ "email": email, "password": password, "role": role }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_index_and_health() {
        let base = spawn_server(sample_state()).await;
        let client = Client::new();

        let text = client.get(&base).send().await.unwrap().text().await.unwrap();
        assert_eq!(text, "Hello World");

        let health: Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["sessions"], 0);
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let base = spawn_server(sample_state()).await;
        let client = Client::new();

        let resp = client
            .post(format!("{}/login", base))
            .json(&json!({ "email": " Rohit.Doctor@gmail.com ", "password": "123456", "role": "provider" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["userId"], 3);
        assert_eq!(body["redirect"], "/provider/dashboard");

        for (password, role, reason) in [
            ("wrong", "user", "bad-password"),
            ("123456", "admin", "role-mismatch"),
        ] {
            let resp = client
                .post(format!("{}/login", base))
                .json(&json!({ "email": "amit.user@gmail.com", "password": password, "role": role }))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["error"], reason);
        }
    }

    #[tokio::test]
    async fn test_dashboard_guard() {
        let base = spawn_server(sample_state()).await;
        let client = Client::new();

        let resp = client.get(format!("{}/dashboard", base)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["redirect"], "/login");

        let token = login(&client, &base, "amit.user@gmail.com", "123456", "user").await;
        let resp = client
            .get(format!("{}/admin/dashboard", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = client
            .get(format!("{}/dashboard", base))
            .header(super::guard::SESSION_HEADER, &token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_book_then_provider_approves() {
        let base = spawn_server(sample_state()).await;
        let client = Client::new();
        let user = login(&client, &base, "amit.user@gmail.com", "123456", "user").await;
        let provider = login(&client, &base, "rohit.doctor@gmail.com", "123456", "provider").await;

        let resp = client
            .post(format!("{}/dashboard/appointments", base))
            .bearer_auth(&user)
            .json(&json!({ "providerId": 101 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let booked: Value = resp.json().await.unwrap();
        assert_eq!(booked["id"], 1004);
        assert_eq!(booked["status"], "pending");

        let resp = client
            .post(format!("{}/provider/dashboard/appointments/1004/approve", base))
            .bearer_auth(&provider)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let approved: Value = resp.json().await.unwrap();
        assert_eq!(approved["status"], "approved");

        // Approving twice is not a valid transition
        let resp = client
            .post(format!("{}/provider/dashboard/appointments/1004/approve", base))
            .bearer_auth(&provider)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let stored: Value = client
            .get(format!("{}/appointments/1004", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stored["status"], "approved");
    }

    #[tokio::test]
    async fn test_patch_resource_keeps_id() {
        let base = spawn_server(sample_state()).await;
        let client = Client::new();

        let resp = client
            .patch(format!("{}/serviceProviders/102", base))
            .json(&json!({ "id": 999, "available": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["id"], 102);
        assert_eq!(body["available"], true);

        let resp = client
            .get(format!("{}/serviceProviders/999", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_requests_get_error_body() {
        let base = spawn_server(sample_state()).await;
        let client = Client::new();

        let resp = client
            .post(format!("{}/login", base))
            .json(&json!({ "email": "amit.user@gmail.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "invalid_params");
        assert!(body["message"].as_str().unwrap().contains("password"));

        let resp = client
            .patch(format!("{}/users/abc", base))
            .json(&json!({ "phone": "1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "invalid_params");

        let token = login(&client, &base, "amit.user@gmail.com", "123456", "user").await;
        let resp = client
            .get(format!("{}/dashboard/providers?minRating=high", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "invalid_params");
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let base = spawn_server(sample_state()).await;
        let client = Client::new();
        let token = login(&client, &base, "admin@easyfind.com", "admin123", "admin").await;

        let resp = client
            .post(format!("{}/logout", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = client
            .get(format!("{}/session", base))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
