//! Web boundary (axum)

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::orchestrator::CheckCoordinator;
use crate::store::StatusStore;

mod error;
pub mod handlers;
pub mod views;

/// Shared state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    pub store: StatusStore,
    pub coordinator: CheckCoordinator,
}

impl AppState {
    pub fn new(store: StatusStore, coordinator: CheckCoordinator) -> Self {
        Self { store, coordinator }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/user/create",
            get(handlers::create_form).post(handlers::create_user),
        )
        .route(
            "/check/{user_id}",
            get(handlers::start_check).post(handlers::submit_check),
        )
        .route("/user/screenshot/{user_id}", get(handlers::screenshot))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
