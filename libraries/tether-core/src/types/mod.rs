/// Domain types for Tether
mod ids;
mod user;

pub use ids::UserId;
pub use user::{NewUser, ProviderLink, User, UserUpdate};
