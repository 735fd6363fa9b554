/// Common test utilities and fixtures
use axum::{body::Body, http::Request, Router};
use std::sync::Arc;
use tempfile::TempDir;
use tether_core::{NewUser, ProviderLink, User, UserStore};
use tether_server::{
    api,
    config::{GoogleSettings, ServerConfig},
    services::{AuthService, GoogleOAuthClient},
    state::AppState,
};
use tether_storage::SqliteUserStore;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-key";
pub const TEST_HOST: &str = "localhost:8080";

/// Router plus handles on the pieces tests need to inspect
pub struct TestApp {
    pub router: Router,
    pub auth_service: Arc<AuthService>,
    pub store: Arc<SqliteUserStore>,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Send a request and decode the JSON body (Null when empty)
    pub async fn send(&self, request: Request<Body>) -> (axum::http::StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Access token for `user`, as issued after sign-in
    pub fn access_token(&self, user: &User) -> String {
        self.auth_service.create_access_token(&user.id).unwrap()
    }
}

/// Google settings pointing the token and userinfo endpoints at `base`
pub fn google_settings(base: Option<&str>) -> GoogleSettings {
    let mut settings = ServerConfig::default().google;
    settings.client_id = "test-client-id".to_string();
    settings.client_secret = "test-client-secret".to_string();
    if let Some(base) = base {
        settings.token_url = format!("{base}/token");
        settings.userinfo_url = format!("{base}/userinfo");
    }
    settings
}

/// Create a test app backed by a temporary SQLite file
pub async fn create_test_app() -> TestApp {
    create_test_app_with(google_settings(None), None).await
}

pub async fn create_test_app_with(
    google: GoogleSettings,
    public_url: Option<String>,
) -> TestApp {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());
    let store = Arc::new(SqliteUserStore::connect(&db_url).await.unwrap());

    let auth_service = Arc::new(AuthService::new(TEST_SECRET.to_string(), 1, 1));
    let google = Arc::new(GoogleOAuthClient::new(google).unwrap());

    let store_handle: Arc<dyn UserStore> = store.clone();
    let app_state =
        AppState::new(store_handle, Arc::clone(&auth_service), google).with_public_url(public_url);

    TestApp {
        router: api::router(app_state),
        auth_service,
        store,
        _temp_dir: temp_dir,
    }
}

/// Test fixtures
pub mod fixtures {
    use super::*;

    pub fn google_link(sub: &str) -> ProviderLink {
        ProviderLink::new("google", sub).with_metadata("googleSub", sub)
    }

    /// Store a user linked to Google, optionally with a username
    pub async fn google_user(
        app: &TestApp,
        sub: &str,
        email: &str,
        username: Option<&str>,
    ) -> User {
        app.store
            .create_user(NewUser {
                name: Some("Test User".to_string()),
                username: username.map(str::to_string),
                email: Some(email.to_string()),
                providers: vec![google_link(sub)],
            })
            .await
            .unwrap()
    }
}
