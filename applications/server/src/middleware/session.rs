/// Session resolution - maps the caller's bearer token to a stored user
use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::http::{header, HeaderMap};
use tether_core::User;

/// Extract the bearer token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Resolve the user owning the current request's session
///
/// # Errors
/// Fails when the header is missing, the access token does not verify, or
/// the user it names no longer exists.
pub async fn get_user_session(app_state: &AppState, headers: &HeaderMap) -> Result<User> {
    let token = bearer_token(headers)
        .ok_or_else(|| ServerError::Auth("Not authenticated".to_string()))?;

    let user_id = app_state.auth_service.verify_access_token(token).map_err(|e| {
        tracing::warn!("Token verification failed: {}", e);
        e
    })?;

    app_state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ServerError::Auth(format!("Session user {user_id} no longer exists")))
}
