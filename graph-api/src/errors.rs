//! Crate-wide error hierarchy for graph-api.

use http_transport::TransportError;
use serde_json::Value;
use thiserror::Error;

use crate::response::CallContext;

/// Convenient alias for crate-wide results.
pub type GraphApiResult<T> = Result<T, GraphApiError>;

/// Root error type for the graph-api crate.
#[derive(Debug, Error)]
pub enum GraphApiError {
    /// The server answered, but the call was not successful.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Configuration problems (missing token, malformed version, ...).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Network/transport failure without an HTTP reply.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An object is missing something the operation needs (id, api, ...).
    #[error("bad object: {0}")]
    BadObject(String),

    /// A parameter could not be used at all (missing file, unencodable value).
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// A property (total count, summary) was not returned for this request.
    #[error("unavailable property: {0}")]
    UnavailableProperty(String),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading an attached file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and setup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse.
    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Value had the wrong format (e.g. invalid URL).
    #[error("invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },

    /// API version does not look like `v<major>.<minor>`.
    #[error("invalid api version '{0}', expected the format v21.0")]
    InvalidApiVersion(String),

    /// Default account ids must carry the `act_` prefix.
    #[error("account id '{0}' must begin with 'act_'")]
    InvalidAccountId(String),
}

/// The single failure type for unsuccessful Graph calls.
///
/// Carries the HTTP status, the call that was made and the raw body, plus
/// the fields of the decoded `error` object when the body has one.
#[derive(Debug, Clone)]
pub struct RequestError {
    pub message: String,
    pub call: CallContext,
    pub http_status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub api_error_code: Option<i64>,
    pub api_error_subcode: Option<i64>,
    pub api_error_message: Option<String>,
    pub api_error_type: Option<String>,
    pub api_transient_error: bool,
    pub api_user_title: Option<String>,
    pub api_user_message: Option<String>,
    pub api_blame_field_specs: Option<Value>,
}

impl RequestError {
    /// Builds the error and decodes the Graph `error` object from `body`.
    pub fn new(
        message: impl Into<String>,
        call: CallContext,
        http_status: u16,
        headers: Vec<(String, String)>,
        body: impl Into<String>,
    ) -> Self {
        let body = body.into();
        let mut err = Self {
            message: message.into(),
            call,
            http_status,
            headers,
            body,
            api_error_code: None,
            api_error_subcode: None,
            api_error_message: None,
            api_error_type: None,
            api_transient_error: false,
            api_user_title: None,
            api_user_message: None,
            api_blame_field_specs: None,
        };

        let parsed: Option<Value> = serde_json::from_str(&err.body).ok();
        if let Some(error) = parsed.as_ref().and_then(|v| v.get("error")) {
            err.api_error_code = error.get("code").and_then(Value::as_i64);
            err.api_error_subcode = error.get("error_subcode").and_then(Value::as_i64);
            err.api_error_message = str_field(error, "message");
            err.api_error_type = str_field(error, "type");
            err.api_transient_error = error
                .get("is_transient")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            err.api_user_title = str_field(error, "error_user_title");
            err.api_user_message = str_field(error, "error_user_msg");

            // error_data sometimes arrives as a JSON-encoded string.
            let error_data = match error.get("error_data") {
                Some(Value::String(s)) => serde_json::from_str::<Value>(s).ok(),
                Some(v @ Value::Object(_)) => Some(v.clone()),
                _ => None,
            };
            err.api_blame_field_specs = error_data
                .as_ref()
                .and_then(|d| d.get("blame_field_specs"))
                .cloned();
        }

        err
    }

    /// Decoded body, or the raw text as a JSON string when it is not JSON.
    pub fn body_json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} {} -> HTTP {}",
            self.message, self.call.method, self.call.path, self.http_status
        )?;
        match (&self.api_error_code, &self.api_error_message) {
            (Some(code), Some(msg)) => write!(f, " (code {code}): {msg}"),
            (None, Some(msg)) => write!(f, ": {msg}"),
            _ => write!(f, ": {}", snippet(&self.body)),
        }
    }
}

impl std::error::Error for RequestError {}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Short single-line body excerpt for log lines and error messages.
pub(crate) fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let flat = body.replace('\n', " ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let cut: String = flat.chars().take(MAX).collect();
        format!("{cut}…")
    }
}

/* ------------------------------------------------------------------------- */
/* Env helpers                                                               */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
pub fn must_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Optional, non-empty environment variable.
pub fn env_opt(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env_opt(name) {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            }),
        None => Ok(None),
    }
}

/// Reads a boolean flag; `1`, `true`, `yes` and `on` count as set.
pub fn env_flag(name: &'static str) -> bool {
    env_opt(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Params;
    use http_transport::HttpMethod;

    fn call() -> CallContext {
        CallContext {
            method: HttpMethod::Get,
            path: "https://graph.facebook.com/v21.0/123".into(),
            params: Params::new(),
        }
    }

    #[test]
    fn decodes_graph_error_fields() {
        let body = r#"{"error":{"message":"Invalid parameter","type":"OAuthException","code":100,
            "error_subcode":1487390,"is_transient":false,"error_user_title":"Bad",
            "error_user_msg":"Try again","error_data":"{\"blame_field_specs\":[[\"name\"]]}"}}"#;
        let err = RequestError::new("Call was not successful", call(), 400, vec![], body);

        assert_eq!(err.api_error_code, Some(100));
        assert_eq!(err.api_error_subcode, Some(1487390));
        assert_eq!(err.api_error_type.as_deref(), Some("OAuthException"));
        assert_eq!(err.api_user_title.as_deref(), Some("Bad"));
        assert_eq!(
            err.api_blame_field_specs,
            Some(serde_json::json!([["name"]]))
        );
        assert!(err.to_string().contains("(code 100): Invalid parameter"));
    }

    #[test]
    fn non_json_body_is_kept_raw() {
        let err = RequestError::new("Call was not successful", call(), 502, vec![], "Bad Gateway");
        assert_eq!(err.api_error_code, None);
        assert_eq!(err.body_json(), Value::String("Bad Gateway".into()));
        assert!(err.to_string().ends_with("Bad Gateway"));
    }
}
