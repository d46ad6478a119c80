//! Backend paths, relative to the configured API base URL.

pub const TOKEN_OBTAIN: &str = "/token/";
pub const TOKEN_REFRESH: &str = "/token/refresh/";
pub const REGISTER: &str = "/users/register/";
pub const BROKER_CREDENTIALS: &str = "/users/zerodha-credentials/";
pub const BROKER_LOGIN: &str = "/zerodha/login/";
pub const BROKER_CALLBACK: &str = "/zerodha/callback/";
pub const BROKER_SYNC_HOLDINGS: &str = "/zerodha/sync-holdings/";
pub const PORTFOLIO_SUMMARY: &str = "/portfolio/summary/";
pub const PORTFOLIO_HOLDINGS: &str = "/portfolio/holdings/";

/// Query parameter carrying the one-time brokerage callback token.
pub const REQUEST_TOKEN_PARAM: &str = "request_token";
