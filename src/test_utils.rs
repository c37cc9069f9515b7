use crate::models::Database;
use crate::server::AppState;
use crate::session::Session;
use crate::store::{demo_database, Store};
use std::sync::Arc;

pub fn sample_database() -> Database {
    demo_database()
}

pub fn sample_store() -> Arc<Store> {
    Store::new(sample_database())
}

/// State backed by the demo document
pub fn sample_state() -> Arc<AppState> {
    AppState::new(sample_database())
}

/// Log in directly through the session store, bypassing the matcher
pub fn session_for(state: &AppState, user_id: u64) -> Session {
    let user = state
        .store
        .view(|db| db.users.iter().find(|u| u.id == user_id).cloned())
        .expect("user in sample database");
    state.sessions.create(&user)
}

/// Serve the full router on an ephemeral port and return its base URL
pub async fn spawn_server(state: Arc<AppState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, crate::server::router(state))
            .await
            .ok();
    });
    format!("http://{}", addr)
}
