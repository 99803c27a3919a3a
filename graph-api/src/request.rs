//! Builder for a single endpoint call.
//!
//! Node wrappers in [`crate::nodes`] create a [`GraphRequest`] per endpoint
//! with the endpoint's [`ParamChecker`], target type and parser. Callers add
//! fields, params and files, then either `execute` it or put it in a batch.

use std::path::{Path, PathBuf};

use http_transport::HttpMethod;
use serde_json::Value;
use tracing::warn;

use crate::api::{ApiPath, CallOptions, Files, GraphApi};
use crate::batch::{Batch, BatchCallback};
use crate::cursor::Cursor;
use crate::errors::{GraphApiError, GraphApiResult};
use crate::object::{GraphObject, ObjectSpec};
use crate::params::{Params, param_string};
use crate::parser::ObjectParser;
use crate::response::GraphResponse;
use crate::type_checker::ParamChecker;

/// Whether an endpoint addresses a node or lists an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiType {
    Node,
    Edge,
}

/// What [`GraphRequest::execute`] produced.
#[derive(Debug)]
pub enum RequestOutcome {
    /// Edge reads, first page already loaded.
    Cursor(Cursor),
    /// Parsed reply of a node read or a write.
    Object(GraphObject),
    /// Raw reply when the request has no parser.
    Response(GraphResponse),
}

impl RequestOutcome {
    pub fn into_cursor(self) -> GraphApiResult<Cursor> {
        match self {
            RequestOutcome::Cursor(c) => Ok(c),
            other => Err(mismatch("cursor", &other)),
        }
    }

    pub fn into_object(self) -> GraphApiResult<GraphObject> {
        match self {
            RequestOutcome::Object(o) => Ok(o),
            other => Err(mismatch("object", &other)),
        }
    }

    pub fn into_response(self) -> GraphApiResult<GraphResponse> {
        match self {
            RequestOutcome::Response(r) => Ok(r),
            other => Err(mismatch("response", &other)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RequestOutcome::Cursor(_) => "cursor",
            RequestOutcome::Object(_) => "object",
            RequestOutcome::Response(_) => "response",
        }
    }
}

fn mismatch(wanted: &str, got: &RequestOutcome) -> GraphApiError {
    GraphApiError::BadObject(format!("expected a {wanted}, request produced a {}", got.kind()))
}

#[derive(Debug, Clone)]
pub struct GraphRequest {
    api: GraphApi,
    node_id: String,
    method: HttpMethod,
    endpoint: String,
    api_type: Option<ApiType>,
    param_checker: ParamChecker,
    target: Option<&'static ObjectSpec>,
    allow_file_upload: bool,
    response_parser: Option<ObjectParser>,
    include_summary: bool,
    api_version: Option<String>,
    params: Params,
    fields: Vec<String>,
    file_params: Files,
    file_counter: usize,
}

impl GraphRequest {
    /// Request for `<node_id>/<endpoint>`; slashes in `endpoint` are dropped.
    pub fn new(
        api: GraphApi,
        node_id: impl Into<String>,
        method: HttpMethod,
        endpoint: &str,
    ) -> Self {
        Self {
            api,
            node_id: node_id.into(),
            method,
            endpoint: endpoint.replace('/', ""),
            api_type: None,
            param_checker: ParamChecker::empty(),
            target: None,
            allow_file_upload: false,
            response_parser: None,
            include_summary: true,
            api_version: None,
            params: Params::new(),
            fields: Vec::new(),
            file_params: Files::new(),
            file_counter: 0,
        }
    }

    pub fn with_api_type(mut self, api_type: ApiType) -> Self {
        self.api_type = Some(api_type);
        self
    }

    pub fn with_param_checker(mut self, checker: ParamChecker) -> Self {
        self.param_checker = checker;
        self
    }

    /// Sets the returned type; its fields drive unknown-field warnings.
    pub fn with_target(mut self, spec: &'static ObjectSpec) -> Self {
        self.target = Some(spec);
        self
    }

    pub fn with_file_upload(mut self, allowed: bool) -> Self {
        self.allow_file_upload = allowed;
        self
    }

    pub fn with_parser(mut self, parser: ObjectParser) -> Self {
        self.response_parser = Some(parser);
        self
    }

    pub fn with_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn api(&self) -> &GraphApi {
        &self.api
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_type(&self) -> Option<ApiType> {
        self.api_type
    }

    pub fn path(&self) -> ApiPath {
        if self.endpoint.is_empty() {
            ApiPath::segments([self.node_id.clone()])
        } else {
            ApiPath::segments([self.node_id.clone(), self.endpoint.clone()])
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn file_params(&self) -> &Files {
        &self.file_params
    }

    /// Attaches a local file as `source<N>`.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> GraphApiResult<&mut Self> {
        let path = path.as_ref();
        if !self.allow_file_upload {
            warn!(endpoint = %self.endpoint, "Endpoint {} cannot upload files", self.endpoint);
        }
        if !path.is_file() {
            return Err(GraphApiError::BadParameter(format!(
                "Cannot find file {}!",
                path.display()
            )));
        }
        let key = format!("source{}", self.file_counter);
        self.file_params.insert(key, path.to_path_buf());
        self.file_counter += 1;
        Ok(self)
    }

    pub fn add_files<I, P>(&mut self, paths: I) -> GraphApiResult<&mut Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.add_file(path)?;
        }
        Ok(self)
    }

    /// Requests a field once; fields unknown to the target type only warn.
    pub fn add_field(&mut self, field: impl Into<String>) -> &mut Self {
        let field = field.into();
        if let Some(target) = self.target {
            if !target.is_known_field(&field) {
                warn!(endpoint = %self.endpoint, "{} does not allow field {field}", self.endpoint);
            }
        }
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
        self
    }

    pub fn add_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            self.add_field(field);
        }
        self
    }

    /// Sets a param. Type mismatches only warn; file params are attached as
    /// uploads instead of being sent as values.
    pub fn add_param(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        let key = key.into();
        if !self.param_checker.is_valid_pair(&key, &value) {
            warn!(
                param = %key,
                expected = self.param_checker.get_type(&key).unwrap_or("?"),
                got = json_kind(&value),
                "value of {key} might not be compatible"
            );
        }
        if self.param_checker.is_file_param(&key) {
            self.file_params
                .insert(key, PathBuf::from(param_string(&value)));
        } else {
            self.params.insert(key, value);
        }
        self
    }

    /// Sets a param to the exported data of an object.
    pub fn add_object_param(&mut self, key: impl Into<String>, obj: &GraphObject) -> &mut Self {
        self.add_param(key, obj.export_all_data())
    }

    pub fn add_params<I, K>(&mut self, params: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in params {
            self.add_param(key, value);
        }
        self
    }

    /// Params as sent, `fields` joined in.
    pub fn params_with_fields(&self) -> Params {
        let mut params = self.params.clone();
        if !self.fields.is_empty() {
            params.insert("fields".to_string(), Value::String(self.fields.join(",")));
        }
        params
    }

    fn parser(&self) -> ObjectParser {
        self.response_parser
            .clone()
            .unwrap_or_else(|| ObjectParser::Target(self.target.unwrap_or(&ObjectSpec::ANY)))
    }

    /// Runs the request.
    ///
    /// Edge reads return a [`Cursor`] with its first page loaded. Anything
    /// else makes one call and returns the parsed object, or the raw reply
    /// when no parser was set.
    pub async fn execute(&self) -> GraphApiResult<RequestOutcome> {
        if self.api_type == Some(ApiType::Edge) && self.method == HttpMethod::Get {
            let mut params = self.params.clone();
            match self.target {
                Some(spec) => spec.assign_fields_to_params(Some(&self.fields), &mut params),
                None if !self.fields.is_empty() => {
                    params.insert("fields".to_string(), Value::String(self.fields.join(",")));
                }
                None => {}
            }
            let mut cursor = Cursor::new(
                self.api.clone(),
                self.node_id.clone(),
                self.endpoint.clone(),
                self.parser(),
                params,
                self.include_summary,
            )
            .with_api_version(self.api_version.clone());
            cursor.load_next_page().await?;
            return Ok(RequestOutcome::Cursor(cursor));
        }

        let opts = CallOptions {
            files: self.file_params.clone(),
            api_version: self.api_version.clone(),
            ..Default::default()
        };
        let response = self
            .api
            .call(self.method, self.path(), &self.params_with_fields(), opts)
            .await?;

        match &self.response_parser {
            Some(parser) => Ok(RequestOutcome::Object(parser.parse_single(&response.json())?)),
            None => Ok(RequestOutcome::Response(response)),
        }
    }

    /// Queues this request in `batch`.
    pub fn add_to_batch(
        &self,
        batch: &mut Batch,
        success: Option<BatchCallback>,
        failure: Option<BatchCallback>,
    ) -> GraphApiResult<Value> {
        batch.add_request(self, success, failure)
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
