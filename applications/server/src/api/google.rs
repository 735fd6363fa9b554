/// Google sign-in routes (`/login/api/google`)
use crate::{
    error::{Result, ServerError, DEFAULT_ERROR},
    middleware::get_user_session,
    services::{
        google::{CALLBACK_PATH, GOOGLE_PROVIDER},
        linking::{subject_key, LinkOutcome, ProfileClaims},
    },
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use tether_core::{UserId, UserUpdate};

const LAST_AUTH_PATH_ERROR: &str = "You must have at least one provider or a username set.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateLoginQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLoginRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub sub: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    #[serde(flatten)]
    pub outcome: LinkOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnlinkResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /login/api/google - redirect to Google's consent screen
///
/// With `?userId=` the redirect carries a signed state token so the callback
/// links Google to that account instead of signing in.
pub async fn initiate_login(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<InitiateLoginQuery>,
) -> Result<Response> {
    let state = match query.user_id.filter(|id| !id.is_empty()) {
        Some(user_id) => app_state
            .auth_service
            .sign_state_token(&UserId::new(user_id))?,
        None => String::new(),
    };

    let redirect_uri = callback_url(&app_state, &headers)?;
    let authorize_url = app_state.google.authorization_url(&redirect_uri, &state)?;

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, authorize_url.to_string())],
    )
        .into_response())
}

/// POST /login/api/google - exchange verified Google claims for an account
pub async fn complete_login(
    State(app_state): State<AppState>,
    payload: std::result::Result<Json<CompleteLoginRequest>, JsonRejection>,
) -> Result<Json<LinkOutcome>> {
    let Json(req) = payload?;
    let outcome = resolve_account(&app_state, req).await?;
    Ok(Json(outcome))
}

/// DELETE /login/api/google - unlink Google from the signed-in account
///
/// Every failure here is reported as a generic 500; business-rule rejections
/// are a normal `{"ok":false}` body.
pub async fn unlink_provider(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    match unlink(&app_state, &headers).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::error!("Failed to unlink {} provider: {}", GOOGLE_PROVIDER, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": DEFAULT_ERROR })),
            )
                .into_response()
        }
    }
}

/// GET /login/api/google/callback - Google redirects here after consent
pub async fn callback(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>> {
    if let Some(error) = query.error {
        return Err(ServerError::BadRequest(format!(
            "Google sign-in failed: {error}"
        )));
    }

    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing authorization code".to_string()))?;

    let user_id = match query.state.as_deref().filter(|s| !s.is_empty()) {
        Some(state) => Some(app_state.auth_service.verify_state_token(state)?),
        None => None,
    };

    let redirect_uri = callback_url(&app_state, &headers)?;
    let tokens = app_state.google.exchange_code(&code, &redirect_uri).await?;
    let info = app_state.google.fetch_user_info(&tokens.access_token).await?;

    let outcome = resolve_account(
        &app_state,
        CompleteLoginRequest {
            name: info.name,
            email: info.email,
            user_id: user_id.map(|id| id.as_str().to_string()),
            sub: info.sub,
        },
    )
    .await?;

    let (access_token, refresh_token) = match outcome.user.as_ref().filter(|_| outcome.ok) {
        Some(user) => (
            Some(app_state.auth_service.create_access_token(&user.id)?),
            Some(app_state.auth_service.create_refresh_token(&user.id)?),
        ),
        None => (None, None),
    };

    let response = CallbackResponse {
        token_type: access_token.as_ref().map(|_| "Bearer".to_string()),
        access_token,
        refresh_token,
        outcome,
    };

    Ok(Json(response))
}

/// Link to the given account, sign in the owner of `sub`, or sign up
///
/// The `(google, sub)` identity is the de-duplication key: once it belongs
/// to a user, later logins return that user instead of creating another.
pub async fn resolve_account(app_state: &AppState, req: CompleteLoginRequest) -> Result<LinkOutcome> {
    let claims = ProfileClaims {
        name: req.name,
        email: req.email,
    };
    let metadata = BTreeMap::from([(subject_key(GOOGLE_PROVIDER), req.sub.clone())]);

    if let Some(user_id) = req.user_id.filter(|id| !id.is_empty()) {
        return app_state
            .linking
            .link_existing_user(&UserId::new(user_id), &claims, GOOGLE_PROVIDER, metadata)
            .await;
    }

    match app_state
        .store
        .find_by_provider(GOOGLE_PROVIDER, &req.sub)
        .await?
    {
        Some(user) => Ok(LinkOutcome::success(user)),
        None => {
            app_state
                .linking
                .sign_up_new_user(&claims, GOOGLE_PROVIDER, metadata)
                .await
        }
    }
}

async fn unlink(app_state: &AppState, headers: &HeaderMap) -> Result<UnlinkResponse> {
    let user = get_user_session(app_state, headers).await?;

    let updated_providers = user.providers_without(GOOGLE_PROVIDER);

    if updated_providers.is_empty() && !user.has_username() {
        return Ok(UnlinkResponse {
            ok: false,
            error: Some(LAST_AUTH_PATH_ERROR.to_string()),
        });
    }

    // Email goes with the last provider, even when a username remains
    let clear_email = updated_providers.is_empty();
    let mut update = UserUpdate::default().providers(updated_providers);
    if clear_email {
        update = update.clear_email();
    }

    app_state.store.update_user(&user.id, update).await?;
    tracing::info!(user_id = %user.id, provider = GOOGLE_PROVIDER, "Unlinked provider");

    Ok(UnlinkResponse {
        ok: true,
        error: None,
    })
}

/// Callback URL: the configured public origin, or the request's own origin
fn callback_url(app_state: &AppState, headers: &HeaderMap) -> Result<String> {
    if let Some(public_url) = &app_state.public_url {
        return Ok(format!("{}{}", public_url.trim_end_matches('/'), CALLBACK_PATH));
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ServerError::BadRequest("Missing Host header".to_string()))?;

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");

    Ok(format!("{scheme}://{host}{CALLBACK_PATH}"))
}
