//! Single-flight access token refresh.
//!
//! At most one refresh call is outstanding at any time. The first caller
//! to need a new token records the in-flight marker and starts the refresh;
//! every later caller joins the waiter list and receives the same outcome.
//! The refresh itself runs on a detached task, so a caller that stops
//! waiting cannot interrupt the token write.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::api::endpoints::TOKEN_REFRESH;
use crate::errors::RefreshError;
use crate::gateway::{ApiRequest, Transport};
use crate::models::{Session, User};
use crate::token::{codec, TokenStore};

type Outcome = Result<String, RefreshError>;

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh tokens.
    refresh: Option<String>,
}

pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    session: Arc<RwLock<Session>>,
    /// `Some` while a refresh is running; holds everyone awaiting it.
    in_flight: Mutex<Option<Vec<oneshot::Sender<Outcome>>>>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        session: Arc<RwLock<Session>>,
    ) -> Self {
        RefreshCoordinator {
            transport,
            tokens,
            session,
            in_flight: Mutex::new(None),
        }
    }

    /// Returns a fresh access token.
    ///
    /// `stale` is the token the caller last used. When no refresh is running
    /// and the store already holds a different token, that token is returned
    /// without a new refresh call.
    pub async fn refresh(self: &Arc<Self>, stale: Option<&str>) -> Outcome {
        let receiver = {
            let mut in_flight = self.in_flight.lock().await;

            if in_flight.is_none() {
                match self.tokens.access_token().await {
                    Ok(Some(current)) if Some(current.as_str()) != stale => {
                        debug!("Access token was already replaced; skipping refresh");
                        return Ok(current);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Could not read current access token: {}", e),
                }
            }

            let (sender, receiver) = oneshot::channel();
            match in_flight.as_mut() {
                Some(waiters) => {
                    waiters.push(sender);
                    debug!(waiters = waiters.len(), "Joined in-flight token refresh");
                }
                None => {
                    *in_flight = Some(vec![sender]);
                    debug!("Starting token refresh");
                    let coordinator = Arc::clone(self);
                    tokio::spawn(async move { coordinator.run().await });
                }
            }
            receiver
        };

        receiver.await.unwrap_or(Err(RefreshError::Abandoned))
    }

    /// True while a refresh call is outstanding.
    pub async fn is_refreshing(&self) -> bool {
        self.in_flight.lock().await.is_some()
    }

    async fn run(self: Arc<Self>) {
        let used_refresh = self.tokens.refresh_token().await;
        let outcome = match &used_refresh {
            Ok(Some(refresh)) => self.exchange(refresh).await,
            Ok(None) => Err(RefreshError::MissingRefreshToken),
            Err(e) => Err(RefreshError::Storage(e.to_string())),
        };

        match &outcome {
            Ok(_) => info!("Access token refreshed"),
            Err(RefreshError::Superseded) => {
                info!("Session changed during token refresh; outcome discarded")
            }
            Err(e) => {
                let used = used_refresh.ok().flatten();
                self.end_session(used.as_deref(), e).await;
            }
        }

        let waiters = self.in_flight.lock().await.take().unwrap_or_default();
        debug!(waiters = waiters.len(), "Releasing token refresh waiters");
        for waiter in waiters {
            // A waiter that went away no longer needs the outcome.
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn exchange(&self, refresh: &str) -> Outcome {
        let request = ApiRequest::post(TOKEN_REFRESH).with_json(json!({ "refresh": refresh }));
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
            });
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        let guard = self
            .tokens
            .commit_refresh(refresh, &body.access, body.refresh.as_deref())
            .await
            .map_err(|e| RefreshError::Storage(e.to_string()))?
            .ok_or(RefreshError::Superseded)?;

        let user = codec::decode(&body.access).ok().map(|claims| User::from(&claims));
        *self.session.write().await = Session::Authenticated(user);
        drop(guard);

        Ok(body.access)
    }

    /// Clears the pair the failed refresh was working from and logs out. A
    /// pair installed since then is left alone, together with its session.
    async fn end_session(&self, used_refresh: Option<&str>, cause: &RefreshError) {
        match self.tokens.clear_if_current(used_refresh).await {
            Ok(Some(_guard)) => {
                *self.session.write().await = Session::LoggedOut;
                warn!("Token refresh failed; session ended: {}", cause);
            }
            Ok(None) => info!("Token refresh failed after the session changed: {}", cause),
            Err(clear_err) => {
                error!("Failed to clear tokens after refresh failure: {}", clear_err);
                *self.session.write().await = Session::LoggedOut;
            }
        }
    }
}
