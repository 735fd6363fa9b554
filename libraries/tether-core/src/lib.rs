//! Tether Core
//!
//! Domain types, the user store trait, and error handling shared by the
//! storage layer and the HTTP server.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `User`, `ProviderLink`, `NewUser`, `UserUpdate`
//! - **Core Traits**: `UserStore`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use tether_core::types::{NewUser, ProviderLink};
//!
//! let link = ProviderLink::new("google", "1234567890").with_metadata("googleSub", "1234567890");
//! let new_user = NewUser::with_provider(Some("Alice".into()), Some("alice@example.com".into()), link);
//!
//! assert_eq!(new_user.providers.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use traits::UserStore;

pub use types::{NewUser, ProviderLink, User, UserId, UserUpdate};
