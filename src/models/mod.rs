pub mod session;
pub mod token;
pub mod user;

// Re-export so callers can "use crate::models::{Session, TokenPair, User};"
pub use session::Session;
pub use token::{Claims, TokenPair};
pub use user::User;
