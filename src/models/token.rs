use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The access/refresh pair issued by the login endpoint.
/// Persisted together or not at all.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        TokenPair {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Bearer strings stay out of logs and panics.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Identity and expiry read from an access token payload.
/// Always derived from a token, never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub subject_id: String,
    pub username: String,
    pub expires_at_unix_seconds: i64,
    /// Any additional claim fields we don't explicitly model.
    pub extra: HashMap<String, Value>,
}
