use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use tracing::{debug, info, warn};

use super::request::{ApiRequest, ApiResponse};
use super::transport::Transport;
use crate::errors::GatewayError;
use crate::session::RefreshCoordinator;
use crate::token::TokenStore;

/// One step of the gateway pipeline. A middleware may rewrite the request,
/// call `next` zero or more times, and rewrite the response.
#[async_trait]
pub trait Middleware: Send + Sync {
    fn get_name(&self) -> &str;
    async fn handle(&self, request: ApiRequest, next: Next<'_>)
        -> Result<ApiResponse, GatewayError>;
}

/// The remainder of the pipeline after the current middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn Transport,
    chain: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(transport: &'a dyn Transport, chain: &'a [Arc<dyn Middleware>]) -> Self {
        Next { transport, chain }
    }

    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        match self.chain.split_first() {
            Some((current, rest)) => {
                current
                    .handle(
                        request,
                        Next {
                            transport: self.transport,
                            chain: rest,
                        },
                    )
                    .await
            }
            None => self.transport.send(request).await,
        }
    }
}

/// Attaches the persisted access token. A missing token is not an error;
/// some endpoints are anonymous.
pub struct BearerAuth {
    tokens: TokenStore,
}

impl BearerAuth {
    pub fn new(tokens: TokenStore) -> Self {
        BearerAuth { tokens }
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    fn get_name(&self) -> &str {
        "bearer-auth"
    }

    async fn handle(
        &self,
        mut request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, GatewayError> {
        if !request.anonymous && request.bearer_token().is_none() {
            match self.tokens.access_token().await {
                Ok(Some(token)) => request.set_bearer(&token)?,
                Ok(None) => debug!("No access token persisted; sending anonymously"),
                Err(e) => warn!("Could not read access token, sending anonymously: {}", e),
            }
        }
        next.run(request).await
    }
}

/// Recovers from one expired-token 401 per request: refreshes through the
/// single-flight coordinator and redispatches once with the new token.
/// If the refresh fails the original 401 goes back to the caller.
pub struct RefreshOnUnauthorized {
    refresher: Arc<RefreshCoordinator>,
}

impl RefreshOnUnauthorized {
    pub fn new(refresher: Arc<RefreshCoordinator>) -> Self {
        RefreshOnUnauthorized { refresher }
    }
}

#[async_trait]
impl Middleware for RefreshOnUnauthorized {
    fn get_name(&self) -> &str {
        "refresh-on-unauthorized"
    }

    async fn handle(
        &self,
        mut request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, GatewayError> {
        if request.retried || request.anonymous {
            return next.run(request).await;
        }

        let response = next.run(request.clone()).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        request.retried = true;
        let stale = request.bearer_token().map(str::to_string);
        match self.refresher.refresh(stale.as_deref()).await {
            Ok(token) => {
                request.set_bearer(&token)?;
                info!(
                    "Retrying {} {} once with a refreshed token",
                    request.method, request.path
                );
                next.run(request).await
            }
            Err(e) => {
                warn!(
                    "Token refresh failed; returning the original 401 for {} {}: {}",
                    request.method, request.path, e
                );
                Ok(response)
            }
        }
    }
}
