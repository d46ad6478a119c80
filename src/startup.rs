//! Application startup.
//!
//! Builds the storage, transport, session and gateway from configuration and
//! ties them into one [`AppContext`].

use std::sync::Arc;

use tracing::info;

use crate::api::TradebitApi;
use crate::config::ConfigV1;
use crate::errors::StartupError;
use crate::gateway::{ReqwestTransport, RequestGateway, Transport};
use crate::session::SessionController;
use crate::state::AppContext;
use crate::storage::{create_storage, Storage};
use crate::token::TokenStore;

/// Wires the context against the real backend and the configured storage.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn build_context(config: ConfigV1) -> Result<AppContext, StartupError> {
    let storage = create_storage(&config.storage);
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::from_config(&config.api)?);
    Ok(build_context_with(config, storage, transport))
}

/// Wires the context over the given storage and transport.
pub fn build_context_with(
    config: ConfigV1,
    storage: Arc<dyn Storage>,
    transport: Arc<dyn Transport>,
) -> AppContext {
    info!(
        "Using backend at {} (durable storage: {})",
        config.api.base_url,
        storage.is_durable()
    );

    let tokens = TokenStore::from_config(storage, &config.storage);
    let session = Arc::new(SessionController::new(tokens.clone(), transport.clone()));
    let gateway = Arc::new(RequestGateway::with_session(
        transport,
        tokens,
        session.refresher(),
    ));

    AppContext {
        config: Arc::new(config),
        session,
        api: TradebitApi::new(gateway.clone()),
        gateway,
    }
}
