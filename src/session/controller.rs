use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::refresh::RefreshCoordinator;
use crate::errors::{RefreshError, SessionError};
use crate::gateway::Transport;
use crate::models::{Session, TokenPair, User};
use crate::token::{codec, TokenStore};

/// Owns the authentication state of the client.
///
/// The session is never persisted; it is re-derived from the stored token
/// pair by [`SessionController::reconcile`] and after every refresh.
pub struct SessionController {
    tokens: TokenStore,
    state: Arc<RwLock<Session>>,
    refresher: Arc<RefreshCoordinator>,
}

impl SessionController {
    pub fn new(tokens: TokenStore, transport: Arc<dyn Transport>) -> Self {
        let state = Arc::new(RwLock::new(Session::LoggedOut));
        let refresher = Arc::new(RefreshCoordinator::new(
            transport,
            tokens.clone(),
            state.clone(),
        ));
        SessionController {
            tokens,
            state,
            refresher,
        }
    }

    /// The coordinator shared with the gateway, so both use one in-flight refresh.
    pub fn refresher(&self) -> Arc<RefreshCoordinator> {
        self.refresher.clone()
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub async fn session(&self) -> Session {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user().cloned()
    }

    /// Stores a freshly issued pair and marks the session authenticated.
    /// An unreadable access token still grants access, without user details.
    pub async fn login(&self, access: &str, refresh: &str) -> Result<(), SessionError> {
        self.tokens.save(&TokenPair::new(access, refresh)).await?;

        let user = match codec::decode(access) {
            Ok(claims) => Some(User::from(&claims)),
            Err(e) => {
                warn!("Issued access token could not be decoded: {}", e);
                None
            }
        };
        info!(
            "Logged in as '{}'",
            user.as_ref().map(|u| u.username.as_str()).unwrap_or("<unknown>")
        );
        *self.state.write().await = Session::Authenticated(user);
        Ok(())
    }

    /// Clears the stored pair and ends the session. Safe to call repeatedly.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let cleared = self.tokens.clear().await;
        *self.state.write().await = Session::LoggedOut;
        cleared?;
        info!("Logged out");
        Ok(())
    }

    /// Brings the session in line with what is persisted.
    ///
    /// No token logs out. A live token authenticates without any network
    /// call. An expired one goes through the shared refresh; if that fails
    /// the client is logged out.
    pub async fn reconcile(&self) -> bool {
        let access = match self.tokens.access_token().await {
            Ok(access) => access,
            Err(e) => {
                warn!("Could not read persisted access token: {}", e);
                None
            }
        };

        let Some(access) = access else {
            self.logout_quietly().await;
            return false;
        };

        if !codec::is_expired(&access, Utc::now()) {
            self.authenticate_with(&access).await;
            return true;
        }

        info!("Persisted access token has expired; refreshing");
        match self.refresher.refresh(Some(&access)).await {
            Ok(fresh) => {
                self.authenticate_with(&fresh).await;
                true
            }
            // A login or logout ran meanwhile; its state stands.
            Err(RefreshError::Superseded) => self.is_authenticated().await,
            Err(e) => {
                info!("{} ({})", e.user_message(), e);
                self.logout_quietly().await;
                false
            }
        }
    }

    async fn authenticate_with(&self, access: &str) {
        let user = codec::decode(access).ok().map(|claims| User::from(&claims));
        *self.state.write().await = Session::Authenticated(user);
    }

    async fn logout_quietly(&self) {
        if let Err(e) = self.logout().await {
            warn!("Failed to clear tokens during logout: {}", e);
        }
    }
}
