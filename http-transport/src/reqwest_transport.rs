//! `reqwest`-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, multipart};
use tracing::debug;

use crate::errors::{TransportError, TransportResult};
use crate::types::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::Transport;

/// Settings for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout; `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
    /// Optional proxy URL applied to every scheme.
    pub proxy: Option<String>,
    /// Stable user agent so that providers can identify the integration.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            proxy: None,
            user_agent: concat!("api-sdk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP transport over a single pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Builds the underlying client from `cfg`.
    pub fn new(cfg: &TransportConfig) -> TransportResult<Self> {
        debug!(
            timeout_secs = cfg.timeout.map(|t| t.as_secs()),
            proxy = cfg.proxy.is_some(),
            "building reqwest transport"
        );

        let mut builder = Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            http: builder.build()?,
        })
    }

    /// Wraps an already configured client.
    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, req: HttpRequest) -> TransportResult<HttpResponse> {
        debug!(method = %req.method, url = %req.url, "sending request");

        let mut builder = match req.method {
            HttpMethod::Get => self.http.get(&req.url),
            HttpMethod::Post => self.http.post(&req.url),
            HttpMethod::Delete => self.http.delete(&req.url),
        };

        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let has_content_type = req.header("content-type").is_some();

        builder = match req.body {
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::RawForm(encoded) if has_content_type => builder.body(encoded),
            RequestBody::RawForm(encoded) => builder
                .header(
                    reqwest::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(encoded),
            RequestBody::Multipart { fields, files } => {
                let mut form = multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                for file in files {
                    let part = multipart::Part::bytes(file.bytes).file_name(file.file_name);
                    form = form.part(file.field, part);
                }
                builder.multipart(form)
            }
        };

        let resp = builder.send().await.map_err(TransportError::from)?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = resp.text().await?;

        debug!(status, bytes = body.len(), "response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection, answers `{}` and yields the raw request text.
    async fn capture_one_request() -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            while !request_complete(&raw) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
                )
                .await
                .unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });
        (format!("http://{addr}"), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let body_len = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= end + 4 + body_len
    }

    fn content_type_lines(raw: &str) -> Vec<String> {
        raw.lines()
            .map(str::to_ascii_lowercase)
            .filter(|line| line.starts_with("content-type:"))
            .collect()
    }

    #[tokio::test]
    async fn raw_form_keeps_a_caller_content_type_single() {
        let transport = ReqwestTransport::new(&TransportConfig::default()).unwrap();

        for preset in [true, false] {
            let (base, server) = capture_one_request().await;
            let mut req = HttpRequest::new(HttpMethod::Post, format!("{base}/v1/things"));
            if preset {
                req.headers.push((
                    "Content-Type".into(),
                    "application/x-www-form-urlencoded".into(),
                ));
            }
            req.body = RequestBody::RawForm("a[b]=1&c=x+y".into());

            let resp = transport.send(req).await.unwrap();
            assert_eq!(resp.status, 200);

            let raw = server.await.unwrap();
            assert_eq!(
                content_type_lines(&raw),
                vec!["content-type: application/x-www-form-urlencoded".to_string()],
                "preset content type: {preset}"
            );
            assert!(raw.ends_with("a[b]=1&c=x+y"));
        }
    }

    #[test]
    fn builds_with_default_config() {
        assert!(ReqwestTransport::new(&TransportConfig::default()).is_ok());
    }

    #[test]
    fn builds_with_timeout_and_proxy() {
        let cfg = TransportConfig {
            timeout: Some(Duration::from_secs(5)),
            proxy: Some("http://127.0.0.1:3128".into()),
            ..Default::default()
        };
        assert!(ReqwestTransport::new(&cfg).is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = ReqwestTransport::new(&TransportConfig {
            timeout: Some(Duration::from_secs(2)),
            ..Default::default()
        })
        .unwrap();

        let result = transport
            .send(HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:1/unreachable"))
            .await;
        assert!(result.is_err());
    }
}
