//! Tether Server Library
//!
//! Google sign-in and account linking over HTTP: consent redirect, claims
//! exchange, and provider unlinking.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use services::{
    auth::AuthService, google::GoogleOAuthClient, linking::AccountLinkingService,
};
pub use state::AppState;
