//! Typed bindings to the backend REST contract.

pub mod backend;
pub mod endpoints;
pub mod types;

pub use backend::TradebitApi;
pub use types::{BrokerCredentials, Registration, SyncSummary};
