//! The external brokerage linking sequence.

pub mod link_flow;
pub mod navigator;

pub use link_flow::{BrokerLinkFlow, BrokerLinkState};
pub use navigator::{MemoryNavigator, Navigator};
