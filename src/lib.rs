//! Library exports for the Tradebit client, shared between the CLI and tests.

pub mod api;
pub mod broker;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod models;
pub mod session;
pub mod startup;
pub mod state;
pub mod storage;
pub mod token;
pub mod utils;
