//! Every outbound backend call goes through the [`RequestGateway`].
//!
//! A request walks an ordered middleware chain before reaching the
//! [`Transport`]. The default chain attaches the bearer token, then recovers
//! from a single expired-token 401 through the shared refresh coordinator.

pub mod middleware;
pub mod request;
pub mod request_gateway;
pub mod transport;

pub use middleware::{BearerAuth, Middleware, Next, RefreshOnUnauthorized};
pub use request::{ApiRequest, ApiResponse};
pub use request_gateway::RequestGateway;
pub use transport::{ReqwestTransport, Transport};
