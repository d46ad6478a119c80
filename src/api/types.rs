use std::fmt;

use serde::{Deserialize, Serialize};

/// Body of `POST /users/register/`.
#[derive(Serialize, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Upstream brokerage API credentials, stored server-side.
#[derive(Serialize, Clone)]
pub struct BrokerCredentials {
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for BrokerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Record counts reported by a holdings sync.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: u64,
    pub updated: u64,
    pub total: u64,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Created: {}, Updated: {}, Total: {}",
            self.created, self.updated, self.total
        )
    }
}

#[derive(Deserialize)]
pub(crate) struct LoginUrlResponse {
    pub login_url: String,
}
