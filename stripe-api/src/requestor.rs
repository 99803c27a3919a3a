//! Builds, signs and sends Stripe calls, and turns replies into typed
//! values or classified errors.

use std::sync::Arc;
use std::time::Duration;

use http_transport::{
    HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, RequestBody, Transport,
    TransportConfig,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::{BINDINGS_VERSION, RequestOptions, StripeConfig};
use crate::encode::{encode_params, form_encode};
use crate::errors::{ErrorDetails, StripeError, StripeResult, handle_error_response};

/// Shared request machinery behind every service. Cheap to clone.
#[derive(Clone)]
pub struct ApiRequestor {
    config: StripeConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ApiRequestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequestor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiRequestor {
    /// Validates `config` and builds a reqwest transport for it.
    pub fn new(config: StripeConfig) -> StripeResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&TransportConfig {
            timeout: config.timeout_secs.map(Duration::from_secs),
            proxy: None,
            user_agent: user_agent(),
        })?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: StripeConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Headers for one call with already merged options.
    pub fn request_headers(
        &self,
        method: HttpMethod,
        options: &RequestOptions,
    ) -> StripeResult<Vec<(String, String)>> {
        let Some(api_key) = options.api_key.as_deref() else {
            return Err(StripeError::Authentication(ErrorDetails::new(
                "No API key provided. Set STRIPE_API_KEY or pass an api key in the request options.",
            )));
        };

        let client_ua = json!({
            "bindings_version": BINDINGS_VERSION,
            "lang": "rust",
            "publisher": "stripe",
            "httplib": "reqwest",
            "platform": format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        });

        let mut headers = vec![
            ("X-Stripe-Client-User-Agent".to_string(), client_ua.to_string()),
            ("User-Agent".to_string(), user_agent()),
            ("Authorization".to_string(), format!("Bearer {api_key}")),
        ];
        if let Some(account) = &options.stripe_account {
            headers.push(("Stripe-Account".into(), account.clone()));
        }
        match (&options.idempotency_key, method) {
            (Some(key), _) => headers.push(("Idempotency-Key".into(), key.clone())),
            (None, HttpMethod::Post) => {
                headers.push(("Idempotency-Key".into(), uuid::Uuid::new_v4().to_string()))
            }
            (None, _) => {}
        }
        if method == HttpMethod::Post {
            headers.push((
                "Content-Type".into(),
                "application/x-www-form-urlencoded".into(),
            ));
        }
        if let Some(version) = &options.stripe_version {
            headers.push(("Stripe-Version".into(), version.clone()));
        }
        Ok(headers)
    }

    /// Sends one call and decodes the JSON reply into `T`.
    pub async fn request<T, P>(
        &self,
        method: HttpMethod,
        path: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let value = self.request_json(method, path, params, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Like [`request`](Self::request) but returns the raw JSON reply.
    pub async fn request_json<P>(
        &self,
        method: HttpMethod,
        path: &str,
        params: &P,
        options: &RequestOptions,
    ) -> StripeResult<Value>
    where
        P: Serialize + ?Sized,
    {
        let options = options.merged_with(&self.config);
        let headers = self.request_headers(method, &options)?;
        let encoded = form_encode(&encode_params(params)?);

        let mut url = format!("{}{}", self.config.api_base.trim_end_matches('/'), path);
        let mut req = HttpRequest::new(method, String::new());
        if method.uses_query() {
            if !encoded.is_empty() {
                url.push(if url.contains('?') { '&' } else { '?' });
                url.push_str(&encoded);
            }
        } else {
            req.body = RequestBody::RawForm(encoded);
        }
        req.url = url;
        req.headers = headers;

        info!(target: "stripe_api::requestor", method = %method, path, "request to stripe api");
        let resp = self.transport.send(req).await?;
        interpret_response(&resp)
    }
}

/// Decodes the reply; non-2xx replies become classified errors.
fn interpret_response(resp: &HttpResponse) -> StripeResult<Value> {
    debug!(
        target: "stripe_api::requestor",
        status = resp.status,
        request_id = resp.header("request-id"),
        "stripe api response"
    );

    let json: Value = match serde_json::from_str(&resp.body) {
        Ok(v) => v,
        Err(_) => {
            return Err(StripeError::Api(ErrorDetails {
                http_status: Some(resp.status),
                http_body: Some(resp.body.clone()),
                headers: resp.headers.clone(),
                ..ErrorDetails::new(format!(
                    "Invalid response body from API: {:?} (HTTP response code was {})",
                    resp.body, resp.status
                ))
            }));
        }
    };

    if !resp.is_2xx() {
        return Err(handle_error_response(
            &resp.body,
            resp.status,
            Some(&json),
            &resp.headers,
        ));
    }
    Ok(json)
}

fn user_agent() -> String {
    format!("Stripe/v1 RustBindings/{BINDINGS_VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_STRIPE_VERSION;
    use http_transport::ScriptedTransport;
    use pretty_assertions::assert_eq;

    fn requestor(transport: &ScriptedTransport, cfg: StripeConfig) -> ApiRequestor {
        ApiRequestor::with_transport(
            cfg.with_api_base("https://stripe.test"),
            Arc::new(transport.clone()),
        )
    }

    #[tokio::test]
    async fn post_sends_form_body_and_fresh_idempotency_key() {
        let transport = ScriptedTransport::new()
            .respond_with(200, r#"{"id": "pi_1"}"#)
            .respond_with(200, r#"{"id": "pi_2"}"#);
        let api = requestor(&transport, StripeConfig::new("sk_test").with_version("2024-06-20"));

        let params = json!({"amount": 100, "metadata": {"k": "v"}});
        let _: Value = api
            .request(HttpMethod::Post, "/v1/payment_intents", &params, &RequestOptions::new())
            .await
            .unwrap();
        let _: Value = api
            .request(HttpMethod::Post, "/v1/payment_intents", &params, &RequestOptions::new())
            .await
            .unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].url, "https://stripe.test/v1/payment_intents");
        assert_eq!(
            sent[0].body,
            RequestBody::RawForm("amount=100&metadata[k]=v".into())
        );
        assert_eq!(sent[0].header("Authorization"), Some("Bearer sk_test"));
        assert_eq!(sent[0].header("Stripe-Version"), Some("2024-06-20"));
        assert_eq!(
            sent[0].header("content-type"),
            Some("application/x-www-form-urlencoded")
        );
        assert!(sent[0].header("User-Agent").unwrap().starts_with("Stripe/v1 RustBindings/"));

        let ua: Value =
            serde_json::from_str(sent[0].header("X-Stripe-Client-User-Agent").unwrap()).unwrap();
        assert_eq!(ua["lang"], "rust");

        let k1 = sent[0].header("Idempotency-Key").unwrap();
        let k2 = sent[1].header("Idempotency-Key").unwrap();
        assert_eq!(k1.len(), 36);
        assert_ne!(k1, k2);
    }

    #[tokio::test]
    async fn version_header_falls_back_to_the_pinned_default() {
        let transport = ScriptedTransport::new().respond_with(200, "{}");
        let api = requestor(&transport, StripeConfig::new("sk_test"));
        api.request_json(HttpMethod::Get, "/v1/terminal/readers", &(), &RequestOptions::new())
            .await
            .unwrap();
        assert_eq!(
            transport.requests()[0].header("Stripe-Version"),
            Some(DEFAULT_STRIPE_VERSION)
        );
    }

    #[tokio::test]
    async fn post_on_the_wire_has_one_content_type() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            // The form body is short; the whole request ends with it.
            while !String::from_utf8_lossy(&raw).ends_with("amount=1") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 14\r\nconnection: close\r\n\r\n{\"id\": \"pi_1\"}")
                .await
                .unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });

        let api = ApiRequestor::new(StripeConfig::new("sk_test").with_api_base(base)).unwrap();
        let reply = api
            .request_json(
                HttpMethod::Post,
                "/v1/payment_intents",
                &json!({"amount": 1}),
                &RequestOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(reply["id"], "pi_1");

        let raw = server.await.unwrap().to_ascii_lowercase();
        let count = |name: &str| raw.lines().filter(|l| l.starts_with(name)).count();
        assert_eq!(count("content-type:"), 1);
        assert_eq!(count("stripe-version:"), 1);
        assert!(raw.contains("content-type: application/x-www-form-urlencoded"));
    }

    #[tokio::test]
    async fn get_puts_params_in_the_query() {
        let transport = ScriptedTransport::new().respond_with(200, "{}");
        let api = requestor(&transport, StripeConfig::new("sk_test"));

        let opts = RequestOptions::new()
            .stripe_account("acct_9")
            .idempotency_key("fixed");
        let _: Value = api
            .request(
                HttpMethod::Get,
                "/v1/terminal/readers",
                &json!({"limit": 3, "expand": ["data.location"]}),
                &opts,
            )
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(
            sent.url,
            "https://stripe.test/v1/terminal/readers?expand[0]=data.location&limit=3"
        );
        assert_eq!(sent.body, RequestBody::Empty);
        assert_eq!(sent.header("Stripe-Account"), Some("acct_9"));
        assert_eq!(sent.header("Idempotency-Key"), Some("fixed"));
        assert_eq!(sent.header("Content-Type"), None);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_io() {
        let transport = ScriptedTransport::new();
        let api = requestor(&transport, StripeConfig::without_key());

        let err = api
            .request_json(HttpMethod::Get, "/v1/payment_intents", &(), &RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::Authentication(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn error_replies_are_classified() {
        let transport = ScriptedTransport::new()
            .respond(
                HttpResponse::new(
                    404,
                    r#"{"error": {"type": "invalid_request_error", "message": "No such reader", "param": "id"}}"#,
                )
                .with_header("Request-Id", "req_7"),
            )
            .respond_with(502, "<html>bad gateway</html>");
        let api = requestor(&transport, StripeConfig::new("sk_test"));

        let err = api
            .request_json(HttpMethod::Get, "/v1/terminal/readers/tmr_x", &(), &RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::InvalidRequest(_)));
        assert_eq!(err.details().unwrap().request_id.as_deref(), Some("req_7"));

        let err = api
            .request_json(HttpMethod::Get, "/v1/terminal/readers", &(), &RequestOptions::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid response body from API"));
    }

    #[tokio::test]
    async fn transport_failures_are_connection_errors() {
        let api = requestor(&ScriptedTransport::new(), StripeConfig::new("sk_test"));
        let err = api
            .request_json(HttpMethod::Delete, "/v1/terminal/readers/tmr_1", &(), &RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StripeError::Connection(_)));
    }
}
