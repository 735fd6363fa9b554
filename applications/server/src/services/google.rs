//! Google OAuth2 client: consent URL, code exchange, userinfo.

use crate::config::GoogleSettings;
use crate::error::{Result, ServerError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Provider name stored in `ProviderLink::name`
pub const GOOGLE_PROVIDER: &str = "google";

/// Fixed callback path appended to the request origin
pub const CALLBACK_PATH: &str = "/login/api/google/callback";

pub const PROFILE_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.profile";
pub const EMAIL_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.email";

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Claims returned by the userinfo endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

/// The identity provider seen by the route handlers
///
/// `GoogleOAuthClient` talks to Google; tests substitute their own.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent URL the browser is redirected to
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url>;

    /// Exchange an authorization code for tokens
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse>;

    /// Fetch the signed-in identity's claims
    async fn fetch_user_info(&self, access_token: &str) -> Result<GoogleUserInfo>;
}

/// Google OAuth client, constructed once per process from configuration
pub struct GoogleOAuthClient {
    http: Client,
    settings: GoogleSettings,
}

impl GoogleOAuthClient {
    pub fn new(settings: GoogleSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("tether-server/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, settings })
    }
}

#[async_trait]
impl IdentityProvider for GoogleOAuthClient {
    fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url> {
        let mut url = Url::parse(&self.settings.auth_url)?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &[PROFILE_SCOPE, EMAIL_SCOPE].join(" "))
            .append_pair("state", state);

        Ok(url)
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenResponse> {
        tracing::debug!(token_url = %self.settings.token_url, "Exchanging authorization code");

        let response = self
            .http
            .post(&self.settings.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServerError::OAuth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<GoogleUserInfo> {
        let response = self
            .http
            .get(&self.settings.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServerError::OAuth(format!(
                "userinfo endpoint returned {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GoogleOAuthClient {
        let mut settings = crate::config::ServerConfig::default().google;
        settings.client_id = "client-id".to_string();
        settings.client_secret = "client-secret".to_string();
        GoogleOAuthClient::new(settings).unwrap()
    }

    #[test]
    fn test_authorization_url_parameters() {
        let url = client()
            .authorization_url("http://localhost:8080/login/api/google/callback", "abc")
            .unwrap();

        assert_eq!(url.host_str(), Some("accounts.google.com"));

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "client-id");
        assert_eq!(
            pairs["redirect_uri"],
            "http://localhost:8080/login/api/google/callback"
        );
        assert_eq!(pairs["scope"], format!("{PROFILE_SCOPE} {EMAIL_SCOPE}"));
        assert_eq!(pairs["state"], "abc");
        assert!(!pairs.contains_key("client_secret"));
    }

    #[test]
    fn test_empty_state_is_still_sent() {
        let url = client().authorization_url("http://localhost/cb", "").unwrap();
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned());
        assert_eq!(state.as_deref(), Some(""));
    }
}
