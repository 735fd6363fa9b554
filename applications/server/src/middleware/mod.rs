/// Request-level helpers shared by handlers
pub mod session;

pub use session::{bearer_token, get_user_session};
