//! Batch aggregator: many calls, one HTTP request.
//!
//! Each queued call becomes a JSON entry of the `batch` param. Per-call
//! outcomes are delivered through callbacks; calls the server did not answer
//! are returned as a new batch for the caller to retry.

use http_transport::HttpMethod;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::api::{ApiPath, CallOptions, Files, GraphApi};
use crate::errors::{GraphApiError, GraphApiResult};
use crate::params::{Params, quoted_query};
use crate::request::GraphRequest;
use crate::response::{CallContext, GraphResponse};

/// Callback invoked with the per-item response of a batch call.
pub type BatchCallback = Box<dyn FnMut(&GraphResponse) + Send>;

/// Optional parts of a batch entry.
#[derive(Default)]
pub struct BatchItem {
    pub headers: Vec<(String, String)>,
    pub files: Files,
    pub success: Option<BatchCallback>,
    pub failure: Option<BatchCallback>,
}

impl BatchItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: FnMut(&GraphResponse) + Send + 'static,
    {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: FnMut(&GraphResponse) + Send + 'static,
    {
        self.failure = Some(Box::new(f));
        self
    }
}

struct Entry {
    call: Value,
    method: HttpMethod,
    files: Files,
    success: Option<BatchCallback>,
    failure: Option<BatchCallback>,
}

pub struct Batch {
    api: GraphApi,
    entries: Vec<Entry>,
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl Batch {
    pub fn new(api: GraphApi) -> Self {
        Self {
            api,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON entries in queue order.
    pub fn calls(&self) -> Vec<&Value> {
        self.entries.iter().map(|e| &e.call).collect()
    }

    /// Queues a call and returns its JSON entry.
    ///
    /// GET params are appended to `relative_url`; other methods carry them
    /// in `body`. Values must be quotable (strings, integers, or containers
    /// and booleans, which are JSON encoded first).
    pub fn add(
        &mut self,
        method: HttpMethod,
        relative_path: &str,
        params: &Params,
        item: BatchItem,
    ) -> GraphApiResult<Value> {
        let mut call = Map::new();
        call.insert("method".into(), Value::String(method.as_str().into()));

        let mut relative_url = relative_path.to_string();
        if !params.is_empty() {
            let keyvals = quoted_query(params)?;
            if method == HttpMethod::Get {
                relative_url.push('?');
                relative_url.push_str(&keyvals);
            } else {
                call.insert("body".into(), Value::String(keyvals));
            }
        }
        call.insert("relative_url".into(), Value::String(relative_url));

        if !item.files.is_empty() {
            let names: Vec<&str> = item.files.keys().map(String::as_str).collect();
            call.insert("attached_files".into(), Value::String(names.join(",")));
        }

        if !item.headers.is_empty() {
            let headers: Vec<Value> = item
                .headers
                .iter()
                .map(|(name, value)| json!({"name": name, "value": value}))
                .collect();
            call.insert("headers".into(), Value::Array(headers));
        }

        let call = Value::Object(call);
        self.entries.push(Entry {
            call: call.clone(),
            method,
            files: item.files,
            success: item.success,
            failure: item.failure,
        });
        Ok(call)
    }

    /// Queues a built request with its params, fields and files.
    pub fn add_request(
        &mut self,
        request: &GraphRequest,
        success: Option<BatchCallback>,
        failure: Option<BatchCallback>,
    ) -> GraphApiResult<Value> {
        let item = BatchItem {
            headers: Vec::new(),
            files: request.file_params().clone(),
            success,
            failure,
        };
        self.add(
            request.method(),
            &request.path().relative(),
            &request.params_with_fields(),
            item,
        )
    }

    /// Sends every queued call in one POST.
    ///
    /// Returns `Ok(None)` when every call was answered (or the batch was
    /// empty), otherwise a batch holding only the unanswered calls with
    /// their callbacks.
    pub async fn execute(self) -> GraphApiResult<Option<Batch>> {
        if self.entries.is_empty() {
            return Ok(None);
        }

        let mut files = Files::new();
        for entry in &self.entries {
            files.extend(entry.files.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let batch_json = Value::Array(self.calls().into_iter().cloned().collect());
        let mut params = Params::new();
        params.insert("batch".into(), batch_json);

        info!(calls = self.entries.len(), files = files.len(), "executing graph batch");
        let opts = CallOptions {
            files,
            ..Default::default()
        };
        let response = self
            .api
            .call(HttpMethod::Post, ApiPath::root(), &params, opts)
            .await?;

        let replies = match response.json() {
            Value::Array(items) => items,
            other => {
                return Err(GraphApiError::BadObject(format!(
                    "batch reply is not a list: {other}"
                )));
            }
        };

        let Batch { api, entries } = self;
        let mut retry = Vec::new();
        for (index, mut entry) in entries.into_iter().enumerate() {
            let reply = replies.get(index).filter(|r| is_answered(r));
            let Some(reply) = reply else {
                retry.push(entry);
                continue;
            };

            let inner = item_response(reply, &entry);
            if inner.is_success() {
                if let Some(cb) = entry.success.as_mut() {
                    cb(&inner);
                }
            } else if let Some(cb) = entry.failure.as_mut() {
                cb(&inner);
            }
        }

        if retry.is_empty() {
            Ok(None)
        } else {
            debug!(unanswered = retry.len(), "graph batch has calls to retry");
            Ok(Some(Batch {
                api,
                entries: retry,
            }))
        }
    }
}

/// Null (or otherwise empty) entries mark calls the server skipped.
fn is_answered(reply: &Value) -> bool {
    match reply {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

fn item_response(reply: &Value, entry: &Entry) -> GraphResponse {
    let body = match reply.get("body") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let status = reply
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(0);
    let headers = reply
        .get("headers")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|h| {
                    Some((
                        h.get("name")?.as_str()?.to_string(),
                        h.get("value")?.as_str()?.to_string(),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();
    let path = entry
        .call
        .get("relative_url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    GraphResponse::new(
        body,
        status,
        headers,
        CallContext {
            method: entry.method,
            path,
            params: Params::new(),
        },
    )
}
