//! Transport seam shared by the API clients.
//!
//! The clients build plain [`HttpRequest`] values and hand them to a
//! [`Transport`]. Production code uses [`ReqwestTransport`]; tests use
//! [`ScriptedTransport`] to replay canned replies without a network.

mod errors;
mod reqwest_transport;
mod scripted;
pub mod telemetry;
mod types;

use async_trait::async_trait;

pub use errors::{TransportError, TransportResult};
pub use reqwest_transport::{ReqwestTransport, TransportConfig};
pub use scripted::ScriptedTransport;
pub use types::{FilePart, HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Sends one request and returns the raw reply.
///
/// Implementations must not interpret the status code: a 4xx/5xx reply is a
/// successful send.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, req: HttpRequest) -> TransportResult<HttpResponse>;
}
