//! Lazy, forward-only iteration over an edge.
//!
//! A [`Cursor`] holds the current page in a queue and fetches the next page
//! only when the queue runs dry. Iteration ends when the server stops sending
//! a continuation (`paging.next` plus `paging.cursors.after`).

use std::collections::VecDeque;

use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use http_transport::HttpMethod;

use crate::api::{ApiPath, CallOptions, GraphApi};
use crate::errors::{GraphApiError, GraphApiResult};
use crate::object::{GraphObject, ObjectSpec};
use crate::params::Params;
use crate::parser::ObjectParser;

pub struct Cursor {
    api: GraphApi,
    path: ApiPath,
    params: Params,
    parser: ObjectParser,
    api_version: Option<String>,
    queue: VecDeque<GraphObject>,
    headers: Vec<(String, String)>,
    finished: bool,
    total_count: Option<i64>,
    summary: Option<Value>,
    include_summary: bool,
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("path", &self.path)
            .field("queued", &self.queue.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Cursor {
    /// Cursor over `<node_id>/<endpoint>`; nothing is fetched yet.
    pub fn new(
        api: GraphApi,
        node_id: impl Into<String>,
        endpoint: impl Into<String>,
        parser: ObjectParser,
        params: Params,
        include_summary: bool,
    ) -> Self {
        let include_summary = include_summary || params.contains_key("default_summary");
        Self {
            api,
            path: ApiPath::segments([node_id.into(), endpoint.into()]),
            params,
            parser,
            api_version: None,
            queue: VecDeque::new(),
            headers: Vec::new(),
            finished: false,
            total_count: None,
            summary: None,
            include_summary,
        }
    }

    /// Cursor over the edge listing `spec` objects under `node_id`, with
    /// `fields` assigned the way [`ObjectSpec::assign_fields_to_params`] does.
    pub fn for_edge(
        api: GraphApi,
        node_id: impl Into<String>,
        spec: &'static ObjectSpec,
        fields: Option<&[String]>,
        mut params: Params,
    ) -> GraphApiResult<Self> {
        let endpoint = spec.endpoint.ok_or_else(|| {
            GraphApiError::BadObject(format!("{} has no edge endpoint", spec.type_name))
        })?;
        spec.assign_fields_to_params(fields, &mut params);
        Ok(Self::new(
            api,
            node_id,
            endpoint,
            ObjectParser::Target(spec),
            params,
            true,
        ))
    }

    pub fn with_api_version(mut self, version: Option<String>) -> Self {
        self.api_version = version;
        self
    }

    /// Fetches the next page into the queue, replacing its contents.
    ///
    /// Returns `Ok(false)` without any I/O once the last page was seen, and
    /// otherwise whether the fetched page held any objects.
    pub async fn load_next_page(&mut self) -> GraphApiResult<bool> {
        if self.finished {
            return Ok(false);
        }

        if self.include_summary
            && !self.params.contains_key("default_summary")
            && !self.params.contains_key("summary")
        {
            self.params.insert("summary".to_string(), Value::Bool(true));
        }

        let opts = CallOptions {
            api_version: self.api_version.clone(),
            ..Default::default()
        };
        let response = self
            .api
            .call(HttpMethod::Get, self.path.clone(), &self.params, opts)
            .await?;
        let body = response.json();
        self.headers = response.headers().to_vec();

        let paging = body.get("paging");
        let after = paging
            .and_then(|p| p.get("cursors"))
            .and_then(|c| c.get("after"));
        let has_next = paging.and_then(|p| p.get("next")).is_some();
        match after {
            Some(after) if has_next => {
                self.params.insert("after".to_string(), after.clone());
            }
            _ => self.finished = true,
        }

        if self.include_summary {
            if let Some(summary) = body.get("summary") {
                if let Some(total) = summary.get("total_count").and_then(Value::as_i64) {
                    self.total_count = Some(total);
                }
                self.summary = Some(summary.clone());
            }
        }

        self.queue = self.parser.parse_multiple(&body)?.into();
        debug!(
            path = %self.path.relative(),
            loaded = self.queue.len(),
            finished = self.finished,
            "cursor page loaded"
        );
        Ok(!self.queue.is_empty())
    }

    /// Next object, loading pages transparently. `Ok(None)` at the end.
    pub async fn next(&mut self) -> GraphApiResult<Option<GraphObject>> {
        if self.queue.is_empty() && !self.load_next_page().await? {
            return Ok(None);
        }
        Ok(self.queue.pop_front())
    }

    /// First remaining object, if any.
    pub async fn get_one(&mut self) -> GraphApiResult<Option<GraphObject>> {
        self.next().await
    }

    /// Drains the rest of the edge into a `Vec`.
    pub async fn collect_all(mut self) -> GraphApiResult<Vec<GraphObject>> {
        let mut out = Vec::new();
        while let Some(obj) = self.next().await? {
            out.push(obj);
        }
        Ok(out)
    }

    /// Consumes the cursor as a stream of objects.
    pub fn into_stream(self) -> impl Stream<Item = GraphApiResult<GraphObject>> {
        futures::stream::try_unfold(self, |mut cursor| async move {
            let next: GraphApiResult<Option<GraphObject>> = cursor.next().await;
            next.map(|found| found.map(|obj| (obj, cursor)))
        })
    }

    /// Objects in the current page that were not consumed yet.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Peeks into the current page.
    pub fn get(&self, index: usize) -> Option<&GraphObject> {
        self.queue.get(index)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Headers of the last page response.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// `summary.total_count` of the last page that carried one.
    pub fn total(&self) -> GraphApiResult<i64> {
        self.total_count.ok_or_else(|| {
            GraphApiError::UnavailableProperty(
                "Couldn't retrieve the object total count for that type of request.".into(),
            )
        })
    }

    /// The summary object, pretty-printed with sorted keys.
    pub fn summary(&self) -> GraphApiResult<String> {
        let summary = match &self.summary {
            Some(v @ Value::Object(_)) => v,
            _ => {
                return Err(GraphApiError::UnavailableProperty(
                    "Couldn't retrieve the object summary for that type of request.".into(),
                ));
            }
        };

        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        summary.serialize(&mut ser)?;
        Ok(format!("<Summary> {}", String::from_utf8_lossy(&buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::nodes::AD;
    use crate::params::params_from;
    use futures::TryStreamExt;
    use http_transport::{HttpResponse, ScriptedTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn api(transport: &ScriptedTransport) -> GraphApi {
        let cfg = GraphConfig::new("tok").with_base_url("https://graph.test");
        GraphApi::with_transport(&cfg, Arc::new(transport.clone()))
    }

    fn page(ids: &[&str], after: Option<&str>) -> String {
        let data: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
        let mut body = json!({"data": data, "summary": {"total_count": 3}});
        if let Some(after) = after {
            body["paging"] = json!({
                "cursors": {"before": "b", "after": after},
                "next": "https://graph.test/next"
            });
        } else {
            body["paging"] = json!({"cursors": {"before": "b", "after": "last"}});
        }
        body.to_string()
    }

    fn cursor(api: GraphApi) -> Cursor {
        Cursor::for_edge(api, "act_1", &AD, Some(&["name".to_string()]), Params::new()).unwrap()
    }

    #[tokio::test]
    async fn walks_pages_until_no_next_link() {
        let transport = ScriptedTransport::new()
            .respond(HttpResponse::new(200, page(&["1", "2"], Some("c1"))).with_header("x-page", "1"))
            .respond_with(200, page(&["3"], None));
        let mut cursor = cursor(api(&transport));

        let mut seen = Vec::new();
        while let Some(obj) = cursor.next().await.unwrap() {
            seen.push(obj.id().unwrap());
        }
        assert_eq!(seen, vec!["1", "2", "3"]);
        assert!(cursor.is_finished());
        assert_eq!(cursor.total().unwrap(), 3);

        // Finished cursors never touch the network again.
        assert!(!cursor.load_next_page().await.unwrap());
        assert_eq!(transport.request_count(), 2);

        let sent = transport.requests();
        assert_eq!(sent[0].url, "https://graph.test/v21.0/act_1/ads");
        assert_eq!(sent[0].query_param("summary"), Some("true"));
        assert_eq!(sent[0].query_param("fields"), Some("name"));
        assert_eq!(sent[0].query_param("after"), None);
        assert_eq!(sent[1].query_param("after"), Some("c1"));
    }

    #[tokio::test]
    async fn empty_first_page_ends_iteration() {
        let transport = ScriptedTransport::new().respond_with(200, r#"{"data": []}"#);
        let mut cursor = cursor(api(&transport));
        assert!(cursor.next().await.unwrap().is_none());
        assert!(cursor.is_finished());
        assert!(matches!(cursor.total(), Err(GraphApiError::UnavailableProperty(_))));
        assert!(matches!(cursor.summary(), Err(GraphApiError::UnavailableProperty(_))));
    }

    #[tokio::test]
    async fn explicit_summary_params_are_left_alone() {
        let transport = ScriptedTransport::new().respond_with(200, r#"{"data": []}"#);
        let params = params_from([("default_summary", json!(true))]);
        let mut cursor = Cursor::new(
            api(&transport),
            "act_1",
            "insights",
            ObjectParser::Target(&AD),
            params,
            false,
        );
        cursor.load_next_page().await.unwrap();
        let sent = &transport.requests()[0];
        assert_eq!(sent.query_param("summary"), None);
        assert_eq!(sent.query_param("default_summary"), Some("true"));
    }

    #[tokio::test]
    async fn summary_is_sorted_and_indented() {
        let transport = ScriptedTransport::new().respond_with(
            200,
            r#"{"data": [{"id": "1"}], "summary": {"total_count": 1, "insights": {"b": 2, "a": 1}}}"#,
        );
        let mut cursor = cursor(api(&transport));
        cursor.load_next_page().await.unwrap();
        assert_eq!(cursor.len(), 1);
        assert_eq!(
            cursor.summary().unwrap(),
            "<Summary> {\n    \"insights\": {\n        \"a\": 1,\n        \"b\": 2\n    },\n    \"total_count\": 1\n}"
        );
    }

    #[tokio::test]
    async fn stream_yields_every_object() {
        let transport = ScriptedTransport::new()
            .respond_with(200, page(&["1"], Some("c1")))
            .respond_with(200, page(&["2"], None));
        let ids: Vec<String> = cursor(api(&transport))
            .into_stream()
            .map_ok(|obj| obj.id().unwrap_or_default())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn errors_propagate_without_retry() {
        let transport = ScriptedTransport::new()
            .respond_with(200, page(&["1"], Some("c1")))
            .respond_with(500, r#"{"error": {"message": "boom", "code": 2}}"#);
        let mut cursor = cursor(api(&transport));
        assert!(cursor.next().await.unwrap().is_some());
        let err = cursor.next().await.unwrap_err();
        assert!(matches!(err, GraphApiError::Request(e) if e.api_error_code == Some(2)));
        assert_eq!(transport.request_count(), 2);
    }
}
