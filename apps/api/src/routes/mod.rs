pub mod health;

use axum::{routing::get, routing::post, Router};

use crate::evaluation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/evaluations",
            post(handlers::handle_evaluate).get(handlers::handle_recent),
        )
        .route(
            "/api/v1/evaluations/:id/report",
            get(handlers::handle_report),
        )
        .with_state(state)
}
