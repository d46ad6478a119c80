//! Error taxonomy for the session and gateway core.
//!
//! Only [`RefreshError`] is terminal for a session; everything else is
//! recovered locally or handed back to the caller untouched.

use http::StatusCode;
use thiserror::Error;

use crate::broker::BrokerLinkState;
use crate::gateway::ApiResponse;

/// A bearer token whose claims could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token payload is missing the '{0}' claim")]
    MissingClaim(&'static str),
}

/// Failure of the key-value persistence behind the token store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage contents are not a valid key-value document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Outcome of a failed refresh. Cloned to every caller that awaited the same refresh.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh token is persisted")]
    MissingRefreshToken,
    #[error("refresh token rejected by the backend ({status})")]
    Rejected { status: StatusCode },
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("refresh response was not understood: {0}")]
    InvalidResponse(String),
    #[error("could not persist refreshed tokens: {0}")]
    Storage(String),
    #[error("refresh task ended without reporting an outcome")]
    Abandoned,
    /// The pair was cleared or replaced (logout, new login) while the refresh
    /// was outstanding; its result was discarded.
    #[error("session changed while the refresh was in flight")]
    Superseded,
}

impl RefreshError {
    /// The only wording a user ever sees for a failed refresh.
    pub fn user_message(&self) -> &'static str {
        "Your session has expired. Please log in again."
    }
}

/// A request that did not produce a successful response.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Any non-success status, passed through verbatim. A 401 here means the
    /// single retry (if any) was spent or the refresh failed.
    #[error("backend responded with {}", .response.status)]
    Http { response: Box<ApiResponse> },
    #[error("request could not be dispatched: {0}")]
    Transport(String),
    #[error("response body could not be decoded: {0}")]
    Body(String),
    #[error("token cannot be sent as a header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

impl GatewayError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Http { response } => Some(response.status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Reads a string field from a JSON error body, if there is one.
    pub fn reason(&self, field: &str) -> Option<String> {
        match self {
            GatewayError::Http { response } => response.json_field(field),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure of the password sign-in: either the backend refused or the pair could not be kept.
#[derive(Debug, Error)]
pub enum SignInError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// A failed step of the brokerage linking sequence. Never fatal to the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerLinkError {
    #[error("{0}")]
    Failed(String),
    #[error("operation not valid while the link is {0:?}")]
    InvalidState(BrokerLinkState),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] Box<figment::Error>),
    #[error("invalid logging.level '{0}'. Valid values: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
    #[error("invalid api.base_url '{0}'")]
    InvalidBaseUrl(String),
    #[error("invalid broker.link_page_url: {0}")]
    InvalidLinkPage(#[from] url::ParseError),
    #[error("logging could not be initialised: {0}")]
    LoggingInit(String),
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
