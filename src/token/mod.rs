//! Bearer token handling: reading claims and persisting the pair.

pub mod codec;
pub mod store;

pub use codec::{decode, is_expired};
pub use store::TokenStore;
