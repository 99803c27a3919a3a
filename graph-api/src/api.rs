//! `GraphApi`: the single place where Graph HTTP calls are made.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use http_transport::{FilePart, HttpMethod, HttpRequest, RequestBody, Transport};
use tracing::{debug, warn};

use crate::batch::Batch;
use crate::config::{DEFAULT_API_VERSION, GraphConfig, SDK_VERSION, is_valid_api_version};
use crate::errors::{GraphApiError, GraphApiResult, snippet};
use crate::params::{Params, encode_pairs, quote, top_level_json_encode};
use crate::response::{CallContext, GraphResponse};
use crate::session::Session;

/// Upload field name → local file path.
pub type Files = BTreeMap<String, PathBuf>;

/// Where a call goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiPath {
    /// Joined under `<base>/<version>/`.
    Segments(Vec<String>),
    /// Used verbatim (paging links, absolute URLs).
    Url(String),
}

impl ApiPath {
    pub fn segments<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ApiPath::Segments(parts.into_iter().map(Into::into).collect())
    }

    /// `<base>/<version>/`, used by batch and multi-id reads.
    pub fn root() -> Self {
        ApiPath::Segments(Vec::new())
    }

    /// Relative form used inside batch calls.
    pub fn relative(&self) -> String {
        match self {
            ApiPath::Segments(parts) => parts.join("/"),
            ApiPath::Url(url) => url.clone(),
        }
    }
}

/// Per-call options that rarely differ from the defaults.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub headers: Vec<(String, String)>,
    pub files: Files,
    /// In-memory uploads sent after `files` (video chunks).
    pub file_parts: Vec<FilePart>,
    /// Overrides the configured api version for this call.
    pub api_version: Option<String>,
    /// Replaces the base URL for this call.
    pub url_override: Option<String>,
}

#[derive(Debug, Default)]
struct Counters {
    attempted: AtomicU64,
    succeeded: AtomicU64,
}

/// Handle for making Graph calls. Cheap to clone; clones share counters.
#[derive(Debug, Clone)]
pub struct GraphApi {
    session: Session,
    api_version: String,
    debug: bool,
    default_account_id: Option<String>,
    counters: Arc<Counters>,
}

impl GraphApi {
    /// Validates `cfg` and opens a reqwest-backed session.
    pub fn new(cfg: &GraphConfig) -> GraphApiResult<Self> {
        cfg.validate()?;
        Ok(Self::from_session(Session::new(cfg)?, cfg))
    }

    /// Reads [`GraphConfig`] from the environment.
    pub fn from_env() -> GraphApiResult<Self> {
        Self::new(&GraphConfig::from_env()?)
    }

    /// Uses an explicit transport (tests, custom HTTP stacks).
    pub fn with_transport(cfg: &GraphConfig, transport: Arc<dyn Transport>) -> Self {
        Self::from_session(Session::with_transport(cfg, transport), cfg)
    }

    pub fn from_session(session: Session, cfg: &GraphConfig) -> Self {
        Self {
            session,
            api_version: cfg.api_version.clone(),
            debug: cfg.debug,
            default_account_id: cfg.default_account_id.clone(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn default_account_id(&self) -> Option<&str> {
        self.default_account_id.as_deref()
    }

    pub fn num_requests_attempted(&self) -> u64 {
        self.counters.attempted.load(Ordering::Relaxed)
    }

    pub fn num_requests_succeeded(&self) -> u64 {
        self.counters.succeeded.load(Ordering::Relaxed)
    }

    /// Empty batch bound to this api.
    pub fn new_batch(&self) -> Batch {
        Batch::new(self.clone())
    }

    /// Resolves `path` to an absolute URL.
    pub fn url_for(&self, path: &ApiPath, opts: &CallOptions) -> GraphApiResult<String> {
        match path {
            ApiPath::Url(url) => Ok(url.clone()),
            ApiPath::Segments(parts) => {
                let version = self.version_for(opts)?;
                let base = opts
                    .url_override
                    .as_deref()
                    .unwrap_or_else(|| self.session.base_url())
                    .trim_end_matches('/');
                Ok(format!("{base}/{version}/{}", parts.join("/")))
            }
        }
    }

    fn version_for<'a>(&'a self, opts: &'a CallOptions) -> GraphApiResult<&'a str> {
        let version = opts.api_version.as_deref().unwrap_or(&self.api_version);
        if is_valid_api_version(version) {
            Ok(version)
        } else {
            Err(GraphApiError::BadObject(format!(
                "Please provide the API version in the following format: {DEFAULT_API_VERSION}"
            )))
        }
    }

    /// Shorthand for a call without headers, files or overrides.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: ApiPath,
        params: &Params,
    ) -> GraphApiResult<GraphResponse> {
        self.call(method, path, params, CallOptions::default()).await
    }

    /// Makes one Graph call.
    ///
    /// Params are top-level JSON encoded. GET and DELETE carry them in the
    /// query; POST sends a form, or a multipart body when files are attached.
    /// An unsuccessful reply (judged by [`GraphResponse::is_success`]) comes
    /// back as [`GraphApiError::Request`].
    pub async fn call(
        &self,
        method: HttpMethod,
        path: ApiPath,
        params: &Params,
        opts: CallOptions,
    ) -> GraphApiResult<GraphResponse> {
        let url = self.url_for(&path, &opts)?;
        self.counters.attempted.fetch_add(1, Ordering::Relaxed);

        let encoded = encode_pairs(params);
        let mut req = HttpRequest::new(method, url.clone());
        req.query = self.session.auth_params();
        req.headers = opts.headers.clone();
        req.headers
            .push(("User-Agent".to_string(), format!("fbbizsdk-rust-{SDK_VERSION}")));

        let mut files = read_files(&opts.files).await?;
        files.extend(opts.file_parts);
        if method.uses_query() {
            req.query.extend(encoded);
            if !files.is_empty() {
                warn!(%method, url = %url, "files are ignored on {method} calls");
            }
        } else if files.is_empty() {
            req.body = RequestBody::Form(encoded);
        } else {
            req.body = RequestBody::Multipart {
                fields: encoded,
                files,
            };
        }

        if self.debug {
            debug!(target: "graph_api::curl", "{}", curl_line(&req));
        }

        debug!(%method, url = %url, params = params.len(), "graph call");
        let reply = self.session.transport().send(req).await?;

        let call = CallContext {
            method,
            path: url,
            params: top_level_json_encode(params).into_iter().collect(),
        };
        let response = GraphResponse::new(reply.body, reply.status, reply.headers, call);

        if let Some(err) = response.error() {
            debug!(
                status = response.status(),
                body = %snippet(response.body()),
                "graph call failed"
            );
            return Err(err.into());
        }

        self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
        Ok(response)
    }
}

async fn read_files(files: &Files) -> GraphApiResult<Vec<FilePart>> {
    let mut parts = Vec::with_capacity(files.len());
    for (field, path) in files {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.clone());
        parts.push(FilePart {
            field: field.clone(),
            file_name,
            bytes,
        });
    }
    Ok(parts)
}

/// Curl equivalent of `req`, with credentials masked.
fn curl_line(req: &HttpRequest) -> String {
    let mut line = format!("curl -X {}", req.method);
    for (k, v) in &req.headers {
        line.push_str(&format!(" -H '{k}: {v}'"));
    }
    match &req.body {
        RequestBody::Form(pairs) => {
            for (k, v) in pairs {
                line.push_str(&format!(" -d '{k}={v}'"));
            }
        }
        RequestBody::Multipart { fields, files } => {
            for (k, v) in fields {
                line.push_str(&format!(" -F '{k}={v}'"));
            }
            for f in files {
                line.push_str(&format!(" -F '{}=@{}'", f.field, f.file_name));
            }
        }
        RequestBody::RawForm(raw) => line.push_str(&format!(" -d '{raw}'")),
        RequestBody::Empty => {}
    }
    let query: Vec<String> = req
        .query
        .iter()
        .map(|(k, v)| {
            let shown = match k.as_str() {
                "access_token" | "appsecret_proof" => "***".to_string(),
                _ => quote(v),
            };
            format!("{k}={shown}")
        })
        .collect();
    if query.is_empty() {
        line.push_str(&format!(" '{}'", req.url));
    } else {
        line.push_str(&format!(" '{}?{}'", req.url, query.join("&")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::params_from;
    use http_transport::{HttpResponse, ScriptedTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn api(transport: &ScriptedTransport) -> GraphApi {
        let cfg = GraphConfig::new("tok")
            .with_base_url("https://graph.test")
            .with_api_version("v21.0");
        GraphApi::with_transport(&cfg, Arc::new(transport.clone()))
    }

    #[tokio::test]
    async fn get_sends_encoded_params_in_query() {
        let transport = ScriptedTransport::new().respond_with(200, r#"{"id":"1"}"#);
        let api = api(&transport);

        let params = params_from([("fields", json!("id,name")), ("summary", json!(true))]);
        let resp = api
            .request(HttpMethod::Get, ApiPath::segments(["123", "ads"]), &params)
            .await
            .unwrap();
        assert_eq!(resp.json(), json!({"id": "1"}));

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "https://graph.test/v21.0/123/ads");
        assert_eq!(sent.query_param("access_token"), Some("tok"));
        assert_eq!(sent.query_param("summary"), Some("true"));
        assert_eq!(sent.body, RequestBody::Empty);
        assert!(sent.header("user-agent").unwrap().starts_with("fbbizsdk-rust-"));
        assert_eq!(api.num_requests_attempted(), 1);
        assert_eq!(api.num_requests_succeeded(), 1);
    }

    #[tokio::test]
    async fn post_sends_a_form() {
        let transport = ScriptedTransport::new().respond_with(200, r#"{"success":true}"#);
        let api = api(&transport);

        let params = params_from([("status", json!("PAUSED")), ("adlabels", json!([{"id": "1"}]))]);
        api.request(HttpMethod::Post, ApiPath::segments(["9"]), &params)
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.form_field("status"), Some("PAUSED"));
        assert_eq!(sent.form_field("adlabels"), Some(r#"[{"id":"1"}]"#));
        assert_eq!(sent.query_param("status"), None);
    }

    #[tokio::test]
    async fn failure_becomes_request_error() {
        let transport = ScriptedTransport::new().respond(HttpResponse::new(
            400,
            r#"{"error":{"message":"Invalid","code":100}}"#,
        ));
        let api = api(&transport);

        let err = api
            .request(HttpMethod::Get, ApiPath::segments(["1"]), &Params::new())
            .await
            .unwrap_err();
        match err {
            GraphApiError::Request(e) => {
                assert_eq!(e.http_status, 400);
                assert_eq!(e.api_error_code, Some(100));
                assert_eq!(e.call.path, "https://graph.test/v21.0/1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.num_requests_attempted(), 1);
        assert_eq!(api.num_requests_succeeded(), 0);
    }

    #[tokio::test]
    async fn bad_version_override_is_rejected_before_io() {
        let transport = ScriptedTransport::new();
        let api = api(&transport);
        let opts = CallOptions {
            api_version: Some("21".into()),
            ..Default::default()
        };
        let err = api
            .call(HttpMethod::Get, ApiPath::segments(["1"]), &Params::new(), opts)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphApiError::BadObject(msg) if msg.contains("v21.0")));
        assert_eq!(transport.request_count(), 0);
        assert_eq!(api.num_requests_attempted(), 0);
    }

    #[tokio::test]
    async fn url_paths_are_used_verbatim() {
        let transport = ScriptedTransport::new().respond_with(200, "{}");
        let api = api(&transport);
        api.request(
            HttpMethod::Get,
            ApiPath::Url("https://other.test/next".into()),
            &Params::new(),
        )
        .await
        .unwrap();
        assert_eq!(transport.requests()[0].url, "https://other.test/next");
    }

    #[tokio::test]
    async fn post_with_files_sends_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("banner.png");
        std::fs::write(&image, b"\x89PNG-bytes").unwrap();

        let transport = ScriptedTransport::new().respond_with(200, r#"{"images":{}}"#);
        let api = api(&transport);
        let mut opts = CallOptions::default();
        opts.files.insert("source".into(), image);
        let params = params_from([("name", json!("banner")), ("adlabels", json!([{"id": "1"}]))]);
        api.call(HttpMethod::Post, ApiPath::segments(["act_1", "adimages"]), &params, opts)
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        match &sent.body {
            RequestBody::Multipart { fields, files } => {
                assert_eq!(
                    fields,
                    &vec![
                        ("adlabels".to_string(), r#"[{"id":"1"}]"#.to_string()),
                        ("name".to_string(), "banner".to_string()),
                    ]
                );
                assert_eq!(
                    files,
                    &vec![FilePart {
                        field: "source".into(),
                        file_name: "banner.png".into(),
                        bytes: b"\x89PNG-bytes".to_vec(),
                    }]
                );
            }
            other => panic!("expected a multipart body, got {other:?}"),
        }
        assert_eq!(sent.query_param("access_token"), Some("tok"));
    }

    #[tokio::test]
    async fn missing_upload_is_an_io_error() {
        let transport = ScriptedTransport::new();
        let api = api(&transport);
        let mut opts = CallOptions::default();
        opts.files
            .insert("source".into(), PathBuf::from("/definitely/missing.png"));
        let err = api
            .call(HttpMethod::Post, ApiPath::segments(["1", "adimages"]), &Params::new(), opts)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphApiError::Io(_)));
    }

    #[test]
    fn curl_line_masks_credentials() {
        let mut req = HttpRequest::new(HttpMethod::Get, "https://graph.test/v21.0/me");
        req.query = vec![
            ("access_token".into(), "secret".into()),
            ("fields".into(), "id,name".into()),
        ];
        let line = curl_line(&req);
        assert!(!line.contains("secret"));
        assert!(line.contains("fields=id%2Cname"));
    }

    #[test]
    fn root_path_keeps_trailing_slash() {
        let transport = ScriptedTransport::new();
        let api = api(&transport);
        assert_eq!(
            api.url_for(&ApiPath::root(), &CallOptions::default()).unwrap(),
            "https://graph.test/v21.0/"
        );
    }
}
