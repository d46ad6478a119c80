use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::endpoints::*;
use super::types::{BrokerCredentials, LoginUrlResponse, Registration, SyncSummary};
use crate::errors::GatewayError;
use crate::gateway::{ApiRequest, RequestGateway};
use crate::models::TokenPair;

/// The backend calls this client makes, all dispatched through the gateway.
#[derive(Clone)]
pub struct TradebitApi {
    gateway: Arc<RequestGateway>,
}

impl TradebitApi {
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        TradebitApi { gateway }
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    /// Exchanges username and password for a token pair.
    pub async fn obtain_token_pair(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, GatewayError> {
        debug!("Requesting token pair for '{}'", username);
        let request = ApiRequest::post(TOKEN_OBTAIN)
            .with_json(json!({ "username": username, "password": password }))
            .anonymous();
        self.gateway.send(request).await?.json()
    }

    pub async fn register(&self, registration: &Registration) -> Result<Value, GatewayError> {
        let body = serde_json::to_value(registration)
            .map_err(|e| GatewayError::Body(format!("Failed to encode registration: {}", e)))?;
        self.gateway
            .send(ApiRequest::post(REGISTER).with_json(body).anonymous())
            .await?
            .json()
    }

    /// Stores the upstream brokerage API key and secret; returns the backend's message.
    pub async fn save_broker_credentials(
        &self,
        credentials: &BrokerCredentials,
    ) -> Result<Option<String>, GatewayError> {
        let body = serde_json::to_value(credentials)
            .map_err(|e| GatewayError::Body(format!("Failed to encode credentials: {}", e)))?;
        let response = self
            .gateway
            .send(ApiRequest::post(BROKER_CREDENTIALS).with_json(body))
            .await?;
        Ok(response.json_field("message"))
    }

    pub async fn broker_login_url(&self) -> Result<Url, GatewayError> {
        let body: LoginUrlResponse = self.gateway.get_json(BROKER_LOGIN).await?;
        Url::parse(&body.login_url)
            .map_err(|e| GatewayError::Body(format!("Invalid login_url '{}': {}", body.login_url, e)))
    }

    pub async fn exchange_callback(&self, request_token: &str) -> Result<(), GatewayError> {
        self.gateway
            .send(ApiRequest::get(BROKER_CALLBACK).with_query(REQUEST_TOKEN_PARAM, request_token))
            .await?;
        Ok(())
    }

    pub async fn sync_holdings(&self) -> Result<SyncSummary, GatewayError> {
        self.gateway.send(ApiRequest::post(BROKER_SYNC_HOLDINGS)).await?.json()
    }

    pub async fn portfolio_summary(&self) -> Result<Value, GatewayError> {
        self.gateway.get_json(PORTFOLIO_SUMMARY).await
    }

    pub async fn holdings(&self) -> Result<Value, GatewayError> {
        self.gateway.get_json(PORTFOLIO_HOLDINGS).await
    }
}
