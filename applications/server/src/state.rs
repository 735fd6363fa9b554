/// Shared application state
use crate::services::{AccountLinkingService, AuthService, IdentityProvider};
use std::sync::Arc;
use tether_core::UserStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub auth_service: Arc<AuthService>,
    pub google: Arc<dyn IdentityProvider>,
    pub linking: Arc<AccountLinkingService>,
    /// Externally visible origin used for the OAuth callback URL
    pub public_url: Option<String>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn UserStore>,
        auth_service: Arc<AuthService>,
        google: Arc<dyn IdentityProvider>,
    ) -> Self {
        let linking = Arc::new(AccountLinkingService::new(Arc::clone(&store)));

        Self {
            store,
            auth_service,
            google,
            linking,
            public_url: None,
        }
    }

    #[must_use]
    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url;
        self
    }
}
