//! Shared application context.
//!
//! The context is owned by the application root and handed to whatever
//! needs the session or the backend; there is no global session.

use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::api::TradebitApi;
use crate::broker::{BrokerLinkFlow, MemoryNavigator, Navigator};
use crate::config::ConfigV1;
use crate::errors::{ConfigError, SignInError};
use crate::gateway::RequestGateway;
use crate::models::Session;
use crate::session::SessionController;

/// Everything a collaborator needs to act on behalf of the user.
#[derive(Clone)]
pub struct AppContext {
    /// Configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// The single source of truth for "is the user logged in".
    pub session: Arc<SessionController>,
    /// Dispatches every backend call with the current bearer token.
    pub gateway: Arc<RequestGateway>,
    /// Typed endpoint bindings over the gateway.
    pub api: TradebitApi,
}

impl AppContext {
    /// Password sign-in: obtains a token pair and logs the session in with it.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<Session, SignInError> {
        let pair = self.api.obtain_token_pair(username, password).await?;
        self.session.login(&pair.access, &pair.refresh).await?;
        info!("Signed in as '{}'", username);
        Ok(self.session.session().await)
    }

    /// A link flow for one lifetime of the linking page.
    pub fn broker_link_flow(&self, navigator: Arc<dyn Navigator>) -> BrokerLinkFlow {
        BrokerLinkFlow::new(self.api.clone(), navigator)
    }

    /// A navigator positioned at the configured linking page, or at `location`
    /// when the page was reached through a redirect.
    pub fn link_page(&self, location: Option<&str>) -> Result<Arc<MemoryNavigator>, ConfigError> {
        let url = Url::parse(location.unwrap_or(&self.config.broker.link_page_url))?;
        Ok(Arc::new(MemoryNavigator::new(url)))
    }
}
