//! Readable/updatable Graph nodes.
//!
//! A [`CrudNode`] pairs a [`GraphObject`] with the [`GraphApi`] used to read,
//! update and delete it, and to walk or create on its edges. Every operation
//! can run now, be returned unexecuted, or be queued in a [`Batch`] (see
//! [`RequestMode`]).

use std::ops::{Deref, DerefMut};

use http_transport::HttpMethod;
use serde_json::Value;
use tracing::warn;

use crate::api::{ApiPath, GraphApi};
use crate::batch::{Batch, BatchCallback};
use crate::cursor::Cursor;
use crate::errors::{GraphApiError, GraphApiResult};
use crate::object::{GraphObject, ObjectSpec};
use crate::params::Params;
use crate::parser::ObjectParser;
use crate::request::{ApiType, GraphRequest, RequestOutcome};

/// How a node operation is carried out.
pub enum RequestMode<'a> {
    /// Run the call now.
    Execute,
    /// Build the request and hand it back unexecuted.
    Pending,
    /// Queue the call in a batch with optional per-item callbacks.
    Batch {
        batch: &'a mut Batch,
        success: Option<BatchCallback>,
        failure: Option<BatchCallback>,
    },
}

impl<'a> RequestMode<'a> {
    pub fn batch(batch: &'a mut Batch) -> Self {
        RequestMode::Batch {
            batch,
            success: None,
            failure: None,
        }
    }

    /// Batch mode when a batch is given; callbacks without one only warn
    /// and the call runs immediately.
    pub fn with_callbacks(
        batch: Option<&'a mut Batch>,
        success: Option<BatchCallback>,
        failure: Option<BatchCallback>,
    ) -> Self {
        match batch {
            Some(batch) => RequestMode::Batch {
                batch,
                success,
                failure,
            },
            None => {
                if success.is_some() || failure.is_some() {
                    warn!("`success` and `failure` callback only work for batch call.");
                }
                RequestMode::Execute
            }
        }
    }
}

/// Result of a node operation under a [`RequestMode`].
#[derive(Debug)]
pub enum CallOutcome {
    Executed(RequestOutcome),
    Pending(GraphRequest),
    /// The JSON entry that was queued.
    Batched(Value),
}

impl CallOutcome {
    pub fn into_object(self) -> GraphApiResult<GraphObject> {
        match self {
            CallOutcome::Executed(outcome) => outcome.into_object(),
            _ => Err(GraphApiError::BadObject("operation was not executed".into())),
        }
    }

    pub fn into_cursor(self) -> GraphApiResult<Cursor> {
        match self {
            CallOutcome::Executed(outcome) => outcome.into_cursor(),
            _ => Err(GraphApiError::BadObject("operation was not executed".into())),
        }
    }

    pub fn into_request(self) -> GraphApiResult<GraphRequest> {
        match self {
            CallOutcome::Pending(req) => Ok(req),
            _ => Err(GraphApiError::BadObject("operation is not pending".into())),
        }
    }
}

/// Runs `request` according to `mode`.
pub async fn dispatch(request: GraphRequest, mode: RequestMode<'_>) -> GraphApiResult<CallOutcome> {
    match mode {
        RequestMode::Execute => Ok(CallOutcome::Executed(request.execute().await?)),
        RequestMode::Pending => Ok(CallOutcome::Pending(request)),
        RequestMode::Batch {
            batch,
            success,
            failure,
        } => Ok(CallOutcome::Batched(
            request.add_to_batch(batch, success, failure)?,
        )),
    }
}

#[derive(Debug, Clone)]
pub struct CrudNode {
    object: GraphObject,
    api: GraphApi,
}

impl Deref for CrudNode {
    type Target = GraphObject;

    fn deref(&self) -> &GraphObject {
        &self.object
    }
}

impl DerefMut for CrudNode {
    fn deref_mut(&mut self) -> &mut GraphObject {
        &mut self.object
    }
}

impl CrudNode {
    /// Node with a known id.
    pub fn new(api: GraphApi, spec: &'static ObjectSpec, id: impl Into<String>) -> Self {
        Self {
            object: GraphObject::with_id(spec, id),
            api,
        }
    }

    pub fn from_object(api: GraphApi, object: GraphObject) -> Self {
        Self { object, api }
    }

    pub fn api(&self) -> &GraphApi {
        &self.api
    }

    pub fn object(&self) -> &GraphObject {
        &self.object
    }

    pub fn into_object(self) -> GraphObject {
        self.object
    }

    /// Request against the node itself; replies reload this node.
    pub fn node_request(&self, method: HttpMethod) -> GraphApiResult<GraphRequest> {
        Ok(GraphRequest::new(self.api.clone(), self.object.id_assured()?, method, "/")
            .with_api_type(ApiType::Node)
            .with_target(self.object.spec())
            .with_parser(ObjectParser::Reuse(self.object.clone())))
    }

    /// Request against one of this node's edges. `endpoint` defaults to the
    /// target type's endpoint.
    pub fn edge_request(
        &self,
        method: HttpMethod,
        target: &'static ObjectSpec,
        endpoint: Option<&str>,
    ) -> GraphApiResult<GraphRequest> {
        let endpoint = endpoint.or(target.endpoint).ok_or_else(|| {
            GraphApiError::BadObject(format!("{} has no edge endpoint", target.type_name))
        })?;
        Ok(GraphRequest::new(self.api.clone(), self.object.id_assured()?, method, endpoint)
            .with_api_type(ApiType::Edge)
            .with_target(target)
            .with_parser(ObjectParser::Target(target)))
    }

    /// Executes a node request and adopts the reloaded object.
    async fn run_on_self(
        &mut self,
        request: GraphRequest,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        let outcome = dispatch(request, mode).await?;
        if let CallOutcome::Executed(RequestOutcome::Object(obj)) = &outcome {
            self.object = obj.clone();
        }
        Ok(outcome)
    }

    /// Reads the node. `fields: None` requests the type's default fields.
    pub async fn api_get(
        &mut self,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        let spec = self.object.spec();
        let mut request = self
            .node_request(HttpMethod::Get)?
            .with_param_checker(spec.read_checker());
        request.add_params(params);
        match fields {
            Some(fields) => request.add_fields(fields.iter().cloned()),
            None => request.add_fields(spec.default_read_fields.iter().copied()),
        };
        self.run_on_self(request, mode).await
    }

    /// Sends the changed fields plus `params`; history is cleared once the
    /// update ran.
    pub async fn api_update(
        &mut self,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        let spec = self.object.spec();
        let mut request = self
            .node_request(HttpMethod::Post)?
            .with_param_checker(spec.update_checker());
        request.add_params(self.object.export_changed_params());
        request.add_params(params);

        let executes = matches!(mode, RequestMode::Execute);
        let outcome = self.run_on_self(request, mode).await?;
        if executes {
            self.object.clear_history();
        }
        Ok(outcome)
    }

    pub async fn api_delete(
        &mut self,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        let mut request = self.node_request(HttpMethod::Delete)?;
        request.add_params(params);
        self.run_on_self(request, mode).await
    }

    /// Sets the status to `ARCHIVED`, for types whose status enum has it.
    pub async fn remote_archive(&mut self, mode: RequestMode<'_>) -> GraphApiResult<CallOutcome> {
        let spec = self.object.spec();
        if !spec.enum_values("status_enum").contains(&"ARCHIVED") {
            return Err(GraphApiError::BadObject(format!(
                "Cannot archive object of type {}.",
                spec.type_name
            )));
        }
        let mut params = Params::new();
        params.insert("status".into(), Value::String("ARCHIVED".into()));
        self.api_update(params, mode).await
    }

    /// Reads an edge; executed reads return a cursor with the first page
    /// loaded.
    pub async fn edge_get(
        &self,
        target: &'static ObjectSpec,
        fields: Option<&[String]>,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        let mut request = self.edge_request(HttpMethod::Get, target, None)?;
        request.add_params(params);
        match fields {
            Some(fields) => request.add_fields(fields.iter().cloned()),
            None => request.add_fields(target.default_read_fields.iter().copied()),
        };
        dispatch(request, mode).await
    }

    /// Creates a `target` object on this node's edge.
    pub async fn edge_create(
        &self,
        target: &'static ObjectSpec,
        params: Params,
        mode: RequestMode<'_>,
    ) -> GraphApiResult<CallOutcome> {
        let mut request = self
            .edge_request(HttpMethod::Post, target, None)?
            .with_param_checker(target.update_checker());
        request.add_params(params);
        dispatch(request, mode).await
    }

    /// Cursor over an edge, optionally with its first page already loaded.
    pub async fn iterate_edge(
        &self,
        target: &'static ObjectSpec,
        fields: Option<&[String]>,
        params: Params,
        fetch_first_page: bool,
    ) -> GraphApiResult<Cursor> {
        let mut cursor = Cursor::for_edge(
            self.api.clone(),
            self.object.id_assured()?,
            target,
            fields,
            params,
        )?;
        if fetch_first_page {
            cursor.load_next_page().await?;
        }
        Ok(cursor)
    }

    /// First object of an edge (requested with `limit=1`).
    pub async fn edge_object(
        &self,
        target: &'static ObjectSpec,
        fields: Option<&[String]>,
        mut params: Params,
    ) -> GraphApiResult<Option<GraphObject>> {
        params.insert("limit".into(), Value::String("1".into()));
        let mut cursor = self.iterate_edge(target, fields, params, true).await?;
        cursor.get_one().await
    }

    /// Reads several nodes of one type in a single call.
    pub async fn get_by_ids<I, S>(
        api: &GraphApi,
        spec: &'static ObjectSpec,
        ids: I,
        fields: Option<&[String]>,
        mut params: Params,
    ) -> GraphApiResult<Vec<CrudNode>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        spec.assign_fields_to_params(fields, &mut params);
        params.insert("ids".into(), Value::String(ids.join(",")));

        let response = api.request(HttpMethod::Get, ApiPath::root(), &params).await?;
        let body = response.json();
        let Some(map) = body.as_object() else {
            return Err(GraphApiError::BadObject(format!(
                "expected an id → node map, got {}",
                response.body()
            )));
        };

        let mut nodes = Vec::with_capacity(map.len());
        for (id, data) in map {
            let mut node = CrudNode::new(api.clone(), spec, id.clone());
            if let Value::Object(data) = data {
                node.object.set_data(data);
            }
            nodes.push(node);
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::nodes::{AD, AD_SET, ADS_INSIGHTS, CAMPAIGN};
    use crate::params::params_from;
    use http_transport::ScriptedTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn api(transport: &ScriptedTransport) -> GraphApi {
        let cfg = GraphConfig::new("tok").with_base_url("https://graph.test");
        GraphApi::with_transport(&cfg, Arc::new(transport.clone()))
    }

    #[tokio::test]
    async fn api_get_reloads_the_node() {
        let transport = ScriptedTransport::new()
            .respond_with(200, r#"{"id": "5", "name": "spring", "status": "PAUSED"}"#);
        let mut ad = CrudNode::new(api(&transport), &AD, "5");

        let fields = vec!["name".to_string(), "status".to_string()];
        ad.api_get(Some(&fields), Params::new(), RequestMode::Execute)
            .await
            .unwrap();

        assert_eq!(ad.get_str("name"), Some("spring"));
        assert!(!ad.has_changes());
        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "https://graph.test/v21.0/5");
        assert_eq!(sent.query_param("fields"), Some("name,status"));
    }

    #[tokio::test]
    async fn api_update_sends_only_changes() {
        let transport = ScriptedTransport::new().respond_with(200, r#"{"success": true}"#);
        let mut ad = CrudNode::new(api(&transport), &AD, "5");
        ad.set_data(json!({"name": "old", "status": "ACTIVE"}).as_object().unwrap());
        ad.set("name", "new");

        ad.api_update(Params::new(), RequestMode::Execute).await.unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.form_field("name"), Some("new"));
        assert_eq!(sent.form_field("status"), None);
        assert!(!ad.has_changes());
    }

    #[tokio::test]
    async fn pending_mode_does_no_io() {
        let transport = ScriptedTransport::new();
        let mut ad = CrudNode::new(api(&transport), &AD, "5");
        let req = ad
            .api_delete(Params::new(), RequestMode::Pending)
            .await
            .unwrap()
            .into_request()
            .unwrap();
        assert_eq!(req.method(), HttpMethod::Delete);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn batch_mode_queues_the_call() {
        let transport = ScriptedTransport::new();
        let api = api(&transport);
        let mut batch = api.new_batch();
        let mut ad = CrudNode::new(api.clone(), &AD, "5");

        let outcome = ad
            .api_get(None, Params::new(), RequestMode::batch(&mut batch))
            .await
            .unwrap();
        assert!(matches!(outcome, CallOutcome::Batched(_)));
        assert_eq!(batch.len(), 1);
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn callbacks_without_batch_fall_back_to_execute() {
        let cb: BatchCallback = Box::new(|_| {});
        let mode = RequestMode::with_callbacks(None, Some(cb), None);
        assert!(matches!(mode, RequestMode::Execute));
    }

    #[tokio::test]
    async fn missing_id_is_a_bad_object() {
        let transport = ScriptedTransport::new();
        let mut ad = CrudNode::from_object(api(&transport), GraphObject::new(&AD));
        let err = ad
            .api_get(None, Params::new(), RequestMode::Execute)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphApiError::BadObject(_)));
    }

    #[tokio::test]
    async fn archive_requires_archived_status() {
        let transport = ScriptedTransport::new().respond_with(200, r#"{"success": true}"#);
        let api = api(&transport);

        let mut campaign = CrudNode::new(api.clone(), &CAMPAIGN, "3");
        campaign.remote_archive(RequestMode::Execute).await.unwrap();
        assert_eq!(transport.requests()[0].form_field("status"), Some("ARCHIVED"));

        let mut insights = CrudNode::new(api, &ADS_INSIGHTS, "4");
        let err = insights.remote_archive(RequestMode::Execute).await.unwrap_err();
        assert!(matches!(err, GraphApiError::BadObject(msg) if msg.contains("AdsInsights")));
    }

    #[tokio::test]
    async fn edge_object_asks_for_one() {
        let transport =
            ScriptedTransport::new().respond_with(200, r#"{"data": [{"id": "8", "name": "set"}]}"#);
        let campaign = CrudNode::new(api(&transport), &CAMPAIGN, "3");
        let adset = campaign
            .edge_object(&AD_SET, None, Params::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(adset.id().as_deref(), Some("8"));
        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "https://graph.test/v21.0/3/adsets");
        assert_eq!(sent.query_param("limit"), Some("1"));
    }

    #[tokio::test]
    async fn edge_create_posts_to_the_edge() {
        let transport = ScriptedTransport::new().respond_with(200, r#"{"id": "99"}"#);
        let campaign = CrudNode::new(api(&transport), &CAMPAIGN, "3");
        let adset = campaign
            .edge_create(
                &AD_SET,
                params_from([("name", json!("new set"))]),
                RequestMode::Execute,
            )
            .await
            .unwrap()
            .into_object()
            .unwrap();
        assert_eq!(adset.id().as_deref(), Some("99"));
        assert_eq!(transport.requests()[0].form_field("name"), Some("new set"));
    }

    #[tokio::test]
    async fn get_by_ids_builds_one_node_per_key() {
        let transport = ScriptedTransport::new().respond_with(
            200,
            r#"{"1": {"id": "1", "name": "a"}, "2": {"id": "2", "name": "b"}}"#,
        );
        let api = api(&transport);
        let fields = vec!["name".to_string()];
        let ads = CrudNode::get_by_ids(&api, &AD, ["1", "2"], Some(&fields), Params::new())
            .await
            .unwrap();
        assert_eq!(ads.len(), 2);
        assert_eq!(ads[1].get_str("name"), Some("b"));

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "https://graph.test/v21.0/");
        assert_eq!(sent.query_param("ids"), Some("1,2"));
        assert_eq!(sent.query_param("fields"), Some("name"));
    }
}
