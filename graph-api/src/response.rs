//! HTTP reply wrapper for Graph calls.

use http_transport::HttpMethod;
use serde_json::Value;

use crate::errors::RequestError;
use crate::params::Params;

/// Summary of the call that produced a response (kept for error reports).
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    pub method: HttpMethod,
    /// Absolute URL, or the relative URL for calls inside a batch.
    pub path: String,
    pub params: Params,
}

/// An HTTP reply from the Graph API.
#[derive(Debug, Clone)]
pub struct GraphResponse {
    body: String,
    status: u16,
    headers: Vec<(String, String)>,
    call: CallContext,
}

impl GraphResponse {
    pub fn new(
        body: impl Into<String>,
        status: u16,
        headers: Vec<(String, String)>,
        call: CallContext,
    ) -> Self {
        Self {
            body: body.into(),
            status,
            headers,
            call,
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Decoded body; a non-JSON body comes back as a JSON string.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn etag(&self) -> Option<&str> {
        self.header("ETag")
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn call(&self) -> &CallContext {
        &self.call
    }

    /// Whether the call succeeded, judged from the body first and the
    /// status code only when the body is empty.
    pub fn is_success(&self) -> bool {
        let json = self.json();

        if let Value::Object(map) = &json {
            if map.contains_key("error") {
                return false;
            }
        }

        if is_truthy(&json) {
            if let Some(success) = json.get("success") {
                return is_truthy(success);
            }
            // A 200 can still carry a "Service Unavailable" page.
            return !contains_service_unavailable(&json);
        }

        matches!(self.status, 200 | 304)
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The request error describing this response, if it failed.
    pub fn error(&self) -> Option<RequestError> {
        if self.is_failure() {
            Some(RequestError::new(
                "Call was not successful",
                self.call.clone(),
                self.status,
                self.headers.clone(),
                self.body.clone(),
            ))
        } else {
            None
        }
    }
}

/// Truthiness of a decoded body, as a loosely typed client would see it.
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn contains_service_unavailable(v: &Value) -> bool {
    const NEEDLE: &str = "Service Unavailable";
    match v {
        Value::String(s) => s.contains(NEEDLE),
        Value::Object(o) => o.contains_key(NEEDLE),
        Value::Array(a) => a.iter().any(|item| item.as_str() == Some(NEEDLE)),
        _ => false,
    }
}
