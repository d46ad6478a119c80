//! Linking an external brokerage account.
//!
//! 1. Ask the backend for the brokerage login URL and leave for it.
//! 2. The brokerage redirects back with a one-time `request_token`.
//! 3. Submit that token once, then strip it from the location.
//!
//! Holdings can be synced independently once linked, or from a fresh page
//! when the link was made in an earlier session.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use super::navigator::Navigator;
use crate::api::endpoints::REQUEST_TOKEN_PARAM;
use crate::api::{SyncSummary, TradebitApi};
use crate::errors::BrokerLinkError;

const LOGIN_URL_FALLBACK: &str =
    "Failed to get Zerodha login URL. Please check your API credentials in Settings.";
const CALLBACK_FALLBACK: &str = "Failed to authenticate with Zerodha. Please try again.";
const SYNC_FALLBACK: &str = "Failed to sync holdings. Please check your Zerodha connection.";

/// Where the linking page is in the protocol. Lives as long as the page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BrokerLinkState {
    #[default]
    Idle,
    AwaitingExternalRedirect,
    ExchangingCallback,
    Linked,
    Failed(String),
}

pub struct BrokerLinkFlow {
    api: TradebitApi,
    navigator: Arc<dyn Navigator>,
    state: BrokerLinkState,
    /// Callback tokens already submitted on this page.
    submitted: HashSet<String>,
}

impl BrokerLinkFlow {
    pub fn new(api: TradebitApi, navigator: Arc<dyn Navigator>) -> Self {
        BrokerLinkFlow {
            api,
            navigator,
            state: BrokerLinkState::Idle,
            submitted: HashSet::new(),
        }
    }

    pub fn state(&self) -> &BrokerLinkState {
        &self.state
    }

    /// Fetches the brokerage login URL and navigates to it.
    pub async fn start_login(&mut self) -> Result<Url, BrokerLinkError> {
        if self.state == BrokerLinkState::ExchangingCallback {
            return Err(BrokerLinkError::InvalidState(self.state.clone()));
        }

        match self.api.broker_login_url().await {
            Ok(login_url) => {
                info!("Redirecting to brokerage login at '{}'", login_url.host_str().unwrap_or(""));
                self.navigator.assign(&login_url);
                self.state = BrokerLinkState::AwaitingExternalRedirect;
                Ok(login_url)
            }
            Err(e) => {
                warn!("Could not obtain brokerage login URL: {}", e);
                Err(self.fail(e.reason("error"), LOGIN_URL_FALLBACK))
            }
        }
    }

    /// Looks for a callback token in the current location and, if it has not
    /// been submitted yet, exchanges it. Returns whether an exchange linked
    /// the account. The token is stripped from the location afterwards
    /// whatever the outcome, so a reload does not submit it again.
    pub async fn handle_callback(&mut self) -> Result<bool, BrokerLinkError> {
        let current = self.navigator.current_url();
        let Some(request_token) = request_token(&current) else {
            return Ok(false);
        };
        if !self.submitted.insert(request_token.clone()) {
            debug!("Callback token already submitted on this page");
            return Ok(false);
        }

        self.state = BrokerLinkState::ExchangingCallback;
        let outcome = self.api.exchange_callback(&request_token).await;
        self.navigator.replace(&strip_request_token(&current));

        match outcome {
            Ok(()) => {
                info!("Brokerage account linked");
                self.state = BrokerLinkState::Linked;
                Ok(true)
            }
            Err(e) => {
                warn!("Brokerage callback exchange failed: {}", e);
                Err(self.fail(e.reason("error"), CALLBACK_FALLBACK))
            }
        }
    }

    /// Imports holdings from the linked brokerage account. Failures are
    /// reported but leave the link state as it was.
    pub async fn sync_holdings(&self) -> Result<SyncSummary, BrokerLinkError> {
        if !matches!(self.state, BrokerLinkState::Idle | BrokerLinkState::Linked) {
            return Err(BrokerLinkError::InvalidState(self.state.clone()));
        }

        match self.api.sync_holdings().await {
            Ok(summary) => {
                info!("Holdings synced: {}", summary);
                Ok(summary)
            }
            Err(e) => {
                warn!("Holdings sync failed: {}", e);
                Err(BrokerLinkError::Failed(
                    e.reason("message").unwrap_or_else(|| SYNC_FALLBACK.to_string()),
                ))
            }
        }
    }

    fn fail(&mut self, reason: Option<String>, fallback: &str) -> BrokerLinkError {
        let reason = reason.unwrap_or_else(|| fallback.to_string());
        self.state = BrokerLinkState::Failed(reason.clone());
        BrokerLinkError::Failed(reason)
    }
}

fn request_token(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == REQUEST_TOKEN_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// The same location without `request_token`; other parameters are kept.
fn strip_request_token(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != REQUEST_TOKEN_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}
