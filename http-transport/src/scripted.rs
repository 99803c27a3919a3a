//! In-memory transport that replays canned responses.
//!
//! Every request is recorded so callers can assert on the exact URL, query,
//! headers and body that would have gone over the wire.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{TransportError, TransportResult};
use crate::types::{HttpRequest, HttpResponse};
use crate::Transport;

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<HttpResponse>,
    requests: Vec<HttpRequest>,
}

/// FIFO transport for tests. Clones share the same script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one response, builder style.
    pub fn respond(self, response: HttpResponse) -> Self {
        self.push(response);
        self
    }

    /// Queues a `status` response carrying `body`.
    pub fn respond_with(self, status: u16, body: impl Into<String>) -> Self {
        self.respond(HttpResponse::new(status, body))
    }

    pub fn push(&self, response: HttpResponse) {
        self.inner.lock().responses.push_back(response);
    }

    /// Snapshot of every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Number of queued responses not consumed yet.
    pub fn remaining(&self) -> usize {
        self.inner.lock().responses.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, req: HttpRequest) -> TransportResult<HttpResponse> {
        let mut script = self.inner.lock();
        let next = script.responses.pop_front();
        let method = req.method.to_string();
        let url = req.url.clone();
        script.requests.push(req);

        next.ok_or(TransportError::Exhausted { method, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;

    #[tokio::test]
    async fn replays_in_order_and_records() {
        let t = ScriptedTransport::new()
            .respond_with(200, "first")
            .respond_with(404, "second");

        let a = t
            .send(HttpRequest::new(HttpMethod::Get, "http://x/a"))
            .await
            .unwrap();
        let b = t
            .send(HttpRequest::new(HttpMethod::Post, "http://x/b"))
            .await
            .unwrap();

        assert_eq!(a.body, "first");
        assert_eq!(b.status, 404);
        assert_eq!(t.request_count(), 2);
        assert_eq!(t.requests()[1].url, "http://x/b");
        assert_eq!(t.remaining(), 0);
    }

    #[tokio::test]
    async fn exhausted_script_is_an_error() {
        let t = ScriptedTransport::new();
        let err = t
            .send(HttpRequest::new(HttpMethod::Delete, "http://x/gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Exhausted { .. }));
        assert_eq!(t.request_count(), 1);
    }
}
