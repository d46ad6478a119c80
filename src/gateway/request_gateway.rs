use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use super::middleware::{BearerAuth, Middleware, Next, RefreshOnUnauthorized};
use super::request::{ApiRequest, ApiResponse};
use super::transport::Transport;
use crate::errors::GatewayError;
use crate::session::RefreshCoordinator;
use crate::token::TokenStore;

/// Dispatches backend calls through the middleware pipeline.
///
/// Success statuses come back as `Ok`; every other status is returned as
/// [`GatewayError::Http`] carrying the backend response untouched.
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl RequestGateway {
    /// A gateway with an explicit pipeline, run in order before the transport.
    pub fn new(transport: Arc<dyn Transport>, middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        RequestGateway {
            transport,
            middlewares,
        }
    }

    /// The standard pipeline: attach the bearer token, then recover from 401s.
    /// Refresh sits after bearer so it sees the token actually sent.
    pub fn with_session(
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        refresher: Arc<RefreshCoordinator>,
    ) -> Self {
        Self::new(
            transport,
            vec![
                Arc::new(BearerAuth::new(tokens)),
                Arc::new(RefreshOnUnauthorized::new(refresher)),
            ],
        )
    }

    pub fn middleware_names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.get_name()).collect()
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let span = info_span!(
            "gateway",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            path = %request.path
        );

        async move {
            let response = Next::new(self.transport.as_ref(), &self.middlewares)
                .run(request)
                .await?;
            debug!(status = response.status.as_u16(), "Backend responded");
            if response.is_success() {
                Ok(response)
            } else {
                Err(GatewayError::Http {
                    response: Box::new(response),
                })
            }
        }
        .instrument(span)
        .await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        self.send(ApiRequest::get(path)).await?.json()
    }
}
