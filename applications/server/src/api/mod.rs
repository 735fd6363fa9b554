/// API route modules
pub mod auth;
pub mod google;
pub mod health;

use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Build the application router
///
/// Transport layers (tracing, CORS) are added by the binary.
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/auth/refresh", post(auth::refresh))
        .route(
            "/login/api/google",
            get(google::initiate_login)
                .post(google::complete_login)
                .delete(google::unlink_provider),
        )
        .route("/login/api/google/callback", get(google::callback))
        .with_state(app_state)
}
