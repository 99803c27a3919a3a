//! Error classification for Stripe replies.

use http_transport::TransportError;
use serde_json::Value;
use thiserror::Error;

pub type StripeResult<T> = Result<T, StripeError>;

/// What the server told us about a failed call.
#[derive(Debug, Clone, Default)]
pub struct ErrorDetails {
    pub message: String,
    pub http_status: Option<u16>,
    pub http_body: Option<String>,
    pub json_body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub code: Option<String>,
    pub param: Option<String>,
    pub request_id: Option<String>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    fn from_reply(
        message: impl Into<String>,
        status: u16,
        body: &str,
        json: Option<&Value>,
        headers: &[(String, String)],
    ) -> Self {
        let request_id = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("request-id"))
            .map(|(_, v)| v.clone());
        Self {
            message: message.into(),
            http_status: Some(status),
            http_body: Some(body.to_string()),
            json_body: json.cloned(),
            headers: headers.to_vec(),
            code: None,
            param: None,
            request_id,
        }
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = if self.message.is_empty() {
            "<empty message>"
        } else {
            self.message.as_str()
        };
        match &self.request_id {
            Some(id) => write!(f, "Request {id}: {msg}"),
            None => f.write_str(msg),
        }
    }
}

/// OAuth error codes carried as a string `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthErrorKind {
    InvalidClient,
    InvalidGrant,
    InvalidRequest,
    InvalidScope,
    UnsupportedGrantType,
    UnsupportedResponseType,
}

impl OAuthErrorKind {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "invalid_client" => Self::InvalidClient,
            "invalid_grant" => Self::InvalidGrant,
            "invalid_request" => Self::InvalidRequest,
            "invalid_scope" => Self::InvalidScope,
            "unsupported_grant_type" => Self::UnsupportedGrantType,
            "unsupported_response_type" => Self::UnsupportedResponseType,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidScope => "invalid_scope",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnsupportedResponseType => "unsupported_response_type",
        }
    }
}

impl std::fmt::Display for OAuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root error type for the stripe-api crate.
#[derive(Debug, Error)]
pub enum StripeError {
    /// Unclassified server failure or malformed reply.
    #[error("api error: {0}")]
    Api(ErrorDetails),

    #[error("rate limited: {0}")]
    RateLimit(ErrorDetails),

    #[error("invalid request: {0}")]
    InvalidRequest(ErrorDetails),

    /// Idempotency key reused with different params.
    #[error("idempotency error: {0}")]
    Idempotency(ErrorDetails),

    /// Missing or rejected api key.
    #[error("authentication error: {0}")]
    Authentication(ErrorDetails),

    /// The card was declined.
    #[error("card error: {0}")]
    Card(ErrorDetails),

    #[error("permission error: {0}")]
    Permission(ErrorDetails),

    #[error("oauth error ({kind}): {details}")]
    OAuth {
        kind: OAuthErrorKind,
        details: ErrorDetails,
    },

    /// No HTTP reply at all.
    #[error(transparent)]
    Connection(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Params that cannot be form-encoded.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StripeError {
    /// Server-side details, when the error came from a reply.
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            Self::Api(d)
            | Self::RateLimit(d)
            | Self::InvalidRequest(d)
            | Self::Idempotency(d)
            | Self::Authentication(d)
            | Self::Card(d)
            | Self::Permission(d)
            | Self::OAuth { details: d, .. } => Some(d),
            _ => None,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        self.details().and_then(|d| d.http_status)
    }
}

/// Maps a non-2xx reply to the matching [`StripeError`].
///
/// A string `error` is an OAuth error; an object `error` is classified by
/// status (and by `code`/`type` for 400s).
pub fn handle_error_response(
    body: &str,
    status: u16,
    json: Option<&Value>,
    headers: &[(String, String)],
) -> StripeError {
    let Some(error_data) = json.and_then(|j| j.get("error")) else {
        return StripeError::Api(ErrorDetails::from_reply(
            format!("Invalid response object from API: {body:?} (HTTP response code was {status})"),
            status,
            body,
            json,
            headers,
        ));
    };

    if let Value::String(code) = error_data {
        let description = json
            .and_then(|j| j.get("error_description"))
            .and_then(Value::as_str)
            .unwrap_or(code);
        let details = ErrorDetails::from_reply(description, status, body, json, headers);
        tracing::info!(error_code = %code, error_description = %description, "stripe oauth error received");
        return match OAuthErrorKind::from_code(code) {
            Some(kind) => StripeError::OAuth {
                kind,
                details: ErrorDetails {
                    code: Some(code.clone()),
                    ..details
                },
            },
            None => classify_api_error(status, None, None, details),
        };
    }

    let field = |key: &str| error_data.get(key).and_then(Value::as_str);
    tracing::info!(
        error_code = field("code"),
        error_type = field("type"),
        error_message = field("message"),
        error_param = field("param"),
        "stripe api error received"
    );
    let details = ErrorDetails {
        code: field("code").map(str::to_string),
        param: field("param").map(str::to_string),
        ..ErrorDetails::from_reply(field("message").unwrap_or_default(), status, body, json, headers)
    };
    classify_api_error(status, field("code"), field("type"), details)
}

fn classify_api_error(
    status: u16,
    code: Option<&str>,
    error_type: Option<&str>,
    details: ErrorDetails,
) -> StripeError {
    match status {
        // Rate limits used to come back as 400 with code `rate_limit`.
        429 => StripeError::RateLimit(details),
        400 if code == Some("rate_limit") => StripeError::RateLimit(details),
        400 | 404 if error_type == Some("idempotency_error") => StripeError::Idempotency(details),
        400 | 404 => StripeError::InvalidRequest(details),
        401 => StripeError::Authentication(details),
        402 => StripeError::Card(details),
        403 => StripeError::Permission(details),
        _ => StripeError::Api(details),
    }
}

/// Configuration and setup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    #[error("invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },
}

/* ------------------------------------------------------------------------- */
/* Env helpers                                                               */
/* ------------------------------------------------------------------------- */

pub fn must_env(name: &'static str) -> Result<String, ConfigError> {
    env_opt(name).ok_or(ConfigError::MissingVar(name))
}

pub fn env_opt(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    env_opt(name)
        .map(|v| {
            v.trim().parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(status: u16, body: Value) -> StripeError {
        let raw = body.to_string();
        let headers = vec![("Request-Id".to_string(), "req_123".to_string())];
        handle_error_response(&raw, status, Some(&body), &headers)
    }

    #[test]
    fn status_codes_pick_the_error_kind() {
        let err = |status, extra: Value| {
            let mut error = json!({"message": "nope"});
            if let (Value::Object(e), Value::Object(x)) = (&mut error, extra) {
                e.extend(x);
            }
            classify(status, json!({ "error": error }))
        };

        assert!(matches!(err(429, json!({})), StripeError::RateLimit(_)));
        assert!(matches!(err(400, json!({"code": "rate_limit"})), StripeError::RateLimit(_)));
        assert!(matches!(
            err(400, json!({"type": "idempotency_error"})),
            StripeError::Idempotency(_)
        ));
        assert!(matches!(err(404, json!({"param": "id"})), StripeError::InvalidRequest(_)));
        assert!(matches!(err(401, json!({})), StripeError::Authentication(_)));
        assert!(matches!(err(402, json!({"code": "card_declined"})), StripeError::Card(_)));
        assert!(matches!(err(403, json!({})), StripeError::Permission(_)));
        assert!(matches!(err(500, json!({})), StripeError::Api(_)));
    }

    #[test]
    fn details_carry_code_param_and_request_id() {
        let err = classify(
            402,
            json!({"error": {"message": "Your card was declined.", "code": "card_declined", "param": "card"}}),
        );
        let details = err.details().unwrap();
        assert_eq!(details.code.as_deref(), Some("card_declined"));
        assert_eq!(details.param.as_deref(), Some("card"));
        assert_eq!(err.http_status(), Some(402));
        assert_eq!(
            err.to_string(),
            "card error: Request req_123: Your card was declined."
        );
    }

    #[test]
    fn string_error_is_oauth() {
        let err = classify(
            400,
            json!({"error": "invalid_grant", "error_description": "code expired"}),
        );
        match err {
            StripeError::OAuth { kind, details } => {
                assert_eq!(kind, OAuthErrorKind::InvalidGrant);
                assert_eq!(details.message, "code expired");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn body_without_error_is_an_api_error() {
        let err = handle_error_response("oops", 500, None, &[]);
        assert!(matches!(err, StripeError::Api(_)));
        assert!(err.to_string().contains("Invalid response object from API"));
    }
}
