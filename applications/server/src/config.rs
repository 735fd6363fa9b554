/// Server configuration
use crate::error::{Result, ServerError};
use crate::services::auth::{token_lifetime, MAX_TOKEN_LIFETIME_DAYS};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_auth")]
    pub auth: AuthSettings,

    #[serde(default = "default_google")]
    pub google: GoogleSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally visible origin (e.g. `https://id.example.com`). When unset
    /// the OAuth callback URL is derived from each request's origin.
    #[serde(default)]
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiration_hours")]
    pub jwt_expiration_hours: u64,

    #[serde(default = "default_jwt_refresh_expiration_days")]
    pub jwt_refresh_expiration_days: u64,

    #[serde(default = "default_state_token_expiration_minutes")]
    pub state_token_expiration_minutes: u64,
}

/// Google OAuth client settings, built once per process
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleSettings {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_google_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_google_token_url")]
    pub token_url: String,

    #[serde(default = "default_google_userinfo_url")]
    pub userinfo_url: String,
}

impl ServerConfig {
    /// Load configuration from `config.toml` and environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file (or `config.toml` if present)
    /// and environment
    ///
    /// Environment variables are prefixed with `TETHER_` and use `__` between
    /// nesting levels, e.g. `TETHER_AUTH__JWT_SECRET`. `GOOGLE_CLIENT_ID` and
    /// `GOOGLE_CLIENT_SECRET` override the Google section.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from("config.toml");
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("TETHER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        settings = settings
            .set_override_option("google.client_id", std::env::var("GOOGLE_CLIENT_ID").ok())
            .and_then(|s| {
                s.set_override_option(
                    "google.client_secret",
                    std::env::var("GOOGLE_CLIENT_SECRET").ok(),
                )
            })
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ServerError::Config(
                "JWT secret is required (set TETHER_AUTH__JWT_SECRET)".to_string(),
            ));
        }

        if self.google.client_id.is_empty() || self.google.client_secret.is_empty() {
            return Err(ServerError::Config(
                "Google client credentials are required (set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET)"
                    .to_string(),
            ));
        }

        let lifetimes: [(&str, u64, fn(i64) -> Option<Duration>); 3] = [
            (
                "auth.jwt_expiration_hours",
                self.auth.jwt_expiration_hours,
                Duration::try_hours,
            ),
            (
                "auth.jwt_refresh_expiration_days",
                self.auth.jwt_refresh_expiration_days,
                Duration::try_days,
            ),
            (
                "auth.state_token_expiration_minutes",
                self.auth.state_token_expiration_minutes,
                Duration::try_minutes,
            ),
        ];
        for (key, value, unit) in lifetimes {
            if value == 0 || token_lifetime(value, unit).is_none() {
                return Err(ServerError::Config(format!(
                    "{key} must be positive and at most {MAX_TOKEN_LIFETIME_DAYS} days"
                )));
            }
        }

        for endpoint in [
            &self.google.auth_url,
            &self.google.token_url,
            &self.google.userinfo_url,
        ] {
            url::Url::parse(endpoint).map_err(|e| {
                ServerError::Config(format!("Invalid Google endpoint {endpoint:?}: {e}"))
            })?;
        }

        if let Some(public_url) = &self.server.public_url {
            url::Url::parse(public_url)
                .map_err(|e| ServerError::Config(format!("Invalid public_url: {e}")))?;
        }

        Ok(())
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
        public_url: None,
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/tether.db".to_string()
}

fn default_auth() -> AuthSettings {
    AuthSettings {
        jwt_secret: String::new(),
        jwt_expiration_hours: default_jwt_expiration_hours(),
        jwt_refresh_expiration_days: default_jwt_refresh_expiration_days(),
        state_token_expiration_minutes: default_state_token_expiration_minutes(),
    }
}

fn default_jwt_expiration_hours() -> u64 {
    24
}

fn default_jwt_refresh_expiration_days() -> u64 {
    30
}

fn default_state_token_expiration_minutes() -> u64 {
    60
}

fn default_google() -> GoogleSettings {
    GoogleSettings {
        client_id: String::new(),
        client_secret: String::new(),
        auth_url: default_google_auth_url(),
        token_url: default_google_token_url(),
        userinfo_url: default_google_userinfo_url(),
    }
}

fn default_google_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_google_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_google_userinfo_url() -> String {
    "https://openidconnect.googleapis.com/v1/userinfo".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            auth: default_auth(),
            google: default_google(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = "secret".to_string();
        config.google.client_id = "client-id".to_string();
        config.google.client_secret = "client-secret".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.state_token_expiration_minutes, 60);
        assert!(config.google.auth_url.contains("accounts.google.com"));
    }

    #[test]
    fn test_validate_requires_jwt_secret() {
        let mut config = valid_config();
        config.auth.jwt_secret.clear();
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_validate_requires_google_credentials() {
        let mut config = valid_config();
        config.google.client_secret.clear();
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_lifetimes() {
        let mut config = valid_config();
        config.auth.jwt_expiration_hours = u64::MAX;
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));

        let mut config = valid_config();
        config.auth.jwt_refresh_expiration_days = 100_000;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.auth.state_token_expiration_minutes = 0;
        assert!(config.validate().is_err());

        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_public_url() {
        let mut config = valid_config();
        config.server.public_url = Some("not a url".to_string());
        assert!(config.validate().is_err());

        config.server.public_url = Some("https://id.example.com".to_string());
        assert!(config.validate().is_ok());
    }
}
