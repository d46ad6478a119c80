#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use http::StatusCode;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use tradebit_client::api::endpoints::TOKEN_REFRESH;
use tradebit_client::config::ConfigV1;
use tradebit_client::errors::GatewayError;
use tradebit_client::gateway::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use tradebit_client::models::TokenPair;
use tradebit_client::startup::build_context_with;
use tradebit_client::state::AppContext;
use tradebit_client::storage::{MemoryStorage, Storage};

/// A token shaped like the backend's, expiring `expires_in_secs` from now
/// (negative for one that has already expired).
pub fn mint_token(user_id: u64, username: &str, expires_in_secs: i64) -> String {
    encode(
        &Header::default(),
        &json!({
            "token_type": "access",
            "user_id": user_id,
            "username": username,
            "exp": Utc::now().timestamp() + expires_in_secs,
        }),
        &EncodingKey::from_secret(b"backend-signing-key"),
    )
    .expect("failed to mint token")
}

pub fn test_config(base_url: &str) -> ConfigV1 {
    let mut config = ConfigV1::default();
    config.api.base_url = base_url.to_string();
    config
}

/// A context talking to `base_url` over HTTP, with in-memory token storage.
pub fn http_context(base_url: &str, storage: Arc<dyn Storage>) -> AppContext {
    let transport = Arc::new(
        ReqwestTransport::new(base_url, Duration::from_secs(5)).expect("failed to build transport"),
    );
    build_context_with(test_config(base_url), storage, transport)
}

pub fn memory_storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

/// Persists a pair under the default keys, as a previous run would have.
pub async fn seed_tokens(ctx: &AppContext, access: &str, refresh: &str) {
    ctx.session
        .tokens()
        .save(&TokenPair::new(access, refresh))
        .await
        .expect("failed to seed tokens");
}

/// An in-process backend: rejects `stale` with 401, accepts `fresh`, and
/// answers the refresh endpoint with `fresh` after a delay so that callers
/// pile up behind it.
pub struct ScriptedBackend {
    pub stale: String,
    pub fresh: String,
    pub refresh_delay: Duration,
    pub refresh_calls: AtomicUsize,
    pub stale_calls: AtomicUsize,
    pub fresh_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(stale: &str, fresh: &str) -> Self {
        ScriptedBackend {
            stale: stale.to_string(),
            fresh: fresh.to_string(),
            refresh_delay: Duration::from_millis(50),
            refresh_calls: AtomicUsize::new(0),
            stale_calls: AtomicUsize::new(0),
            fresh_calls: AtomicUsize::new(0),
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        if request.path == TOKEN_REFRESH {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.refresh_delay).await;
            let body = json!({ "access": self.fresh }).to_string();
            return Ok(ApiResponse::new(StatusCode::OK, body));
        }

        match request.bearer_token() {
            Some(token) if token == self.fresh => {
                self.fresh_calls.fetch_add(1, Ordering::SeqCst);
                Ok(ApiResponse::new(StatusCode::OK, r#"{"total_value": 1250.5}"#))
            }
            Some(token) if token == self.stale => {
                self.stale_calls.fetch_add(1, Ordering::SeqCst);
                Ok(ApiResponse::new(
                    StatusCode::UNAUTHORIZED,
                    r#"{"detail": "Given token not valid for any token type"}"#,
                ))
            }
            _ => Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "")),
        }
    }
}
