/// Token service - session JWTs and OAuth state tokens
use crate::error::{Result, ServerError};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tether_core::UserId;

#[derive(Debug, Clone)]
pub struct AuthService {
    secret: String,
    access_token_expiration: Duration,
    refresh_token_expiration: Duration,
    state_token_expiration: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    pub token_type: TokenType,
}

/// Claims of a state token, binding an OAuth redirect to a signed-in user
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateClaims {
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
    State,
}

/// Upper bound on any configured token lifetime
pub const MAX_TOKEN_LIFETIME_DAYS: i64 = 3650;

/// Clock skew tolerated on session tokens
const SESSION_LEEWAY_SECS: u64 = 60;

/// Convert a configured lifetime, `None` if it overflows or exceeds the cap
///
/// `unit` is one of chrono's fallible constructors, e.g. `Duration::try_hours`.
pub fn token_lifetime(value: u64, unit: fn(i64) -> Option<Duration>) -> Option<Duration> {
    i64::try_from(value)
        .ok()
        .and_then(unit)
        .filter(|lifetime| *lifetime <= Duration::days(MAX_TOKEN_LIFETIME_DAYS))
}

fn capped_lifetime(value: u64, unit: fn(i64) -> Option<Duration>) -> Duration {
    token_lifetime(value, unit).unwrap_or_else(|| Duration::days(MAX_TOKEN_LIFETIME_DAYS))
}

impl AuthService {
    /// Lifetimes above `MAX_TOKEN_LIFETIME_DAYS` are capped
    pub fn new(secret: String, access_expiration_hours: u64, refresh_expiration_days: u64) -> Self {
        Self {
            secret,
            access_token_expiration: capped_lifetime(access_expiration_hours, Duration::try_hours),
            refresh_token_expiration: capped_lifetime(refresh_expiration_days, Duration::try_days),
            state_token_expiration: Duration::hours(1),
        }
    }

    /// Override the lifetime of OAuth state tokens (one hour by default)
    #[must_use]
    pub fn with_state_expiration_minutes(mut self, minutes: u64) -> Self {
        self.state_token_expiration = capped_lifetime(minutes, Duration::try_minutes);
        self
    }

    /// Create an access token
    pub fn create_access_token(&self, user_id: &UserId) -> Result<String> {
        self.create_token(user_id, TokenType::Access, self.access_token_expiration)
    }

    /// Create a refresh token
    pub fn create_refresh_token(&self, user_id: &UserId) -> Result<String> {
        self.create_token(user_id, TokenType::Refresh, self.refresh_token_expiration)
    }

    /// Verify and decode a session token
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        self.decode_claims(token, SESSION_LEEWAY_SECS)
    }

    /// Verify that a token is an access token
    pub fn verify_access_token(&self, token: &str) -> Result<UserId> {
        let claims = self.verify_token(token)?;
        if claims.token_type != TokenType::Access {
            return Err(ServerError::Auth("Invalid token type".to_string()));
        }
        Ok(UserId::new(claims.sub))
    }

    /// Verify that a token is a refresh token
    pub fn verify_refresh_token(&self, token: &str) -> Result<UserId> {
        let claims = self.verify_token(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(ServerError::Auth("Invalid token type".to_string()));
        }
        Ok(UserId::new(claims.sub))
    }

    /// Sign a state token carrying `user_id` with the configured lifetime
    pub fn sign_state_token(&self, user_id: &UserId) -> Result<String> {
        self.sign_state_token_with_ttl(user_id, self.state_token_expiration)
    }

    /// Sign a state token carrying `user_id` that expires after `ttl`
    pub fn sign_state_token_with_ttl(&self, user_id: &UserId, ttl: Duration) -> Result<String> {
        let now = Utc::now();

        let claims = StateClaims {
            user_id: user_id.as_str().to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            token_type: TokenType::State,
        };

        self.encode_claims(&claims)
    }

    /// Verify a state token and return the user ID it carries
    pub fn verify_state_token(&self, token: &str) -> Result<UserId> {
        // State tokens are short-lived; expiry is exact.
        let claims: StateClaims = self.decode_claims(token, 0)?;
        if claims.token_type != TokenType::State {
            return Err(ServerError::Auth("Invalid token type".to_string()));
        }
        Ok(UserId::new(claims.user_id))
    }

    fn create_token(
        &self,
        user_id: &UserId,
        token_type: TokenType,
        expiration: Duration,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + expiration;

        let claims = Claims {
            sub: user_id.as_str().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type,
        };

        self.encode_claims(&claims)
    }

    fn encode_claims<T: Serialize>(&self, claims: &T) -> Result<String> {
        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), claims, &encoding_key).map_err(ServerError::from)
    }

    fn decode_claims<T: DeserializeOwned>(&self, token: &str, leeway: u64) -> Result<T> {
        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let mut validation = Validation::default();
        validation.leeway = leeway;

        let token_data = decode::<T>(token, &decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation_and_verification() {
        let auth = AuthService::new("secret".to_string(), 24, 30);
        let user_id = UserId::new("user-123");

        let access_token = auth.create_access_token(&user_id).unwrap();
        let verified_id = auth.verify_access_token(&access_token).unwrap();
        assert_eq!(verified_id, user_id);

        let refresh_token = auth.create_refresh_token(&user_id).unwrap();
        let verified_id = auth.verify_refresh_token(&refresh_token).unwrap();
        assert_eq!(verified_id, user_id);
    }

    #[test]
    fn test_token_type_validation() {
        let auth = AuthService::new("secret".to_string(), 24, 30);
        let user_id = UserId::new("user-123");

        let access_token = auth.create_access_token(&user_id).unwrap();
        assert!(auth.verify_refresh_token(&access_token).is_err());
        assert!(auth.verify_state_token(&access_token).is_err());

        let state_token = auth.sign_state_token(&user_id).unwrap();
        assert!(auth.verify_access_token(&state_token).is_err());
    }

    #[test]
    fn test_state_token_round_trip() {
        let auth = AuthService::new("secret".to_string(), 24, 30);
        let user_id = UserId::new("42");

        let token = auth.sign_state_token(&user_id).unwrap();
        assert_eq!(auth.verify_state_token(&token).unwrap(), user_id);
    }

    #[test]
    fn test_state_token_lifetime_is_one_hour() {
        let auth = AuthService::new("secret".to_string(), 24, 30);
        let token = auth.sign_state_token(&UserId::new("42")).unwrap();

        let claims: StateClaims = auth.decode_claims(&token, 0).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_huge_lifetimes_are_capped() {
        let auth = AuthService::new("secret".to_string(), u64::MAX, u64::MAX)
            .with_state_expiration_minutes(u64::MAX);
        let user_id = UserId::new("42");

        let access_token = auth.create_access_token(&user_id).unwrap();
        assert_eq!(auth.verify_access_token(&access_token).unwrap(), user_id);

        let state = auth.sign_state_token(&user_id).unwrap();
        let claims: StateClaims = auth.decode_claims(&state, 0).unwrap();
        assert_eq!(claims.exp - claims.iat, Duration::days(MAX_TOKEN_LIFETIME_DAYS).num_seconds());
    }

    #[test]
    fn test_token_lifetime_bounds() {
        assert_eq!(token_lifetime(24, Duration::try_hours), Some(Duration::hours(24)));
        assert_eq!(token_lifetime(u64::MAX, Duration::try_hours), None);
        assert_eq!(token_lifetime(i64::MAX as u64, Duration::try_minutes), None);
        assert_eq!(token_lifetime(3651, Duration::try_days), None);
    }

    /// Session tokens tolerate small clock skew; state tokens do not
    #[test]
    fn test_leeway_applies_to_session_tokens_only() {
        let auth = AuthService::new("secret".to_string(), 24, 30);
        let user_id = UserId::new("42");
        let now = Utc::now().timestamp();

        let recently_expired = auth
            .encode_claims(&Claims {
                sub: user_id.as_str().to_string(),
                exp: now - 5,
                iat: now - 65,
                token_type: TokenType::Access,
            })
            .unwrap();
        assert_eq!(auth.verify_access_token(&recently_expired).unwrap(), user_id);

        let state = auth
            .sign_state_token_with_ttl(&user_id, Duration::seconds(-5))
            .unwrap();
        assert!(auth.verify_state_token(&state).is_err());
    }
}
