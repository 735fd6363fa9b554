/// Server services
pub mod auth;
pub mod google;
pub mod linking;

pub use auth::AuthService;
pub use google::{GoogleOAuthClient, IdentityProvider};
pub use linking::AccountLinkingService;
