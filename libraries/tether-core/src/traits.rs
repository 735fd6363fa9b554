/// Core traits for Tether
use crate::error::Result;
use crate::types::{NewUser, User, UserId, UserUpdate};
use async_trait::async_trait;

/// Persistent user accounts
///
/// Implemented by `tether-storage` on top of `SQLite`. Route handlers and
/// services only see this trait.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Point lookup by user ID
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    /// Find the user owning the `(provider, identifier)` identity
    ///
    /// Backed by an index on the pair; at most one user can match.
    async fn find_by_provider(&self, provider: &str, identifier: &str) -> Result<Option<User>>;

    /// Create a user
    ///
    /// # Errors
    /// Returns `CoreError::Duplicate` if one of the provider identities or
    /// the username is already taken
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Apply a partial update and return the stored user
    ///
    /// # Errors
    /// Returns `CoreError::UserNotFound` if the user does not exist
    async fn update_user(&self, id: &UserId, update: UserUpdate) -> Result<User>;

    /// All users, oldest first
    async fn list_users(&self) -> Result<Vec<User>>;
}
