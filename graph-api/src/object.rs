//! Node/edge objects: a field map with change tracking.
//!
//! A [`GraphObject`] is a mapping from field name to decoded JSON, typed by a
//! static [`ObjectSpec`]. The spec lists the known field names (used only for
//! warnings), the field types used to build nested objects, and the edge
//! endpoint the type is read from. Assignments record a change only when the
//! value differs, and updates serialize only the changed keys.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{GraphApiError, GraphApiResult};
use crate::nodes;
use crate::params::Params;
use crate::type_checker::ParamChecker;

/// Static description of one node type.
#[derive(Debug, PartialEq, Eq)]
pub struct ObjectSpec {
    pub type_name: &'static str,
    /// Edge name this type is listed under (`ads`, `campaigns`, ...).
    pub endpoint: Option<&'static str>,
    /// Known field names. Empty means "anything goes".
    pub fields: &'static [&'static str],
    /// Declared field types; named types found in the catalogue are decoded
    /// into nested objects.
    pub field_types: &'static [(&'static str, &'static str)],
    /// Fields requested when the caller asks for none.
    pub default_read_fields: &'static [&'static str],
    /// Param types accepted by a node read.
    pub read_params: &'static [(&'static str, &'static str)],
    /// Param types accepted by a node update.
    pub update_params: &'static [(&'static str, &'static str)],
    /// Enum name → allowed values, shared by read and update params.
    pub enums: &'static [(&'static str, &'static [&'static str])],
}

impl ObjectSpec {
    /// Spec for untyped objects: no known fields, no nesting.
    pub const ANY: ObjectSpec = ObjectSpec {
        type_name: "Object",
        endpoint: None,
        fields: &[],
        field_types: &[],
        default_read_fields: &[],
        read_params: &[],
        update_params: &[],
        enums: &[],
    };

    pub fn is_known_field(&self, field: &str) -> bool {
        self.fields.is_empty() || self.fields.contains(&field)
    }

    pub fn field_type(&self, field: &str) -> Option<&'static str> {
        self.field_types
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, ty)| *ty)
    }

    pub fn read_checker(&self) -> ParamChecker {
        self.checker(self.read_params)
    }

    pub fn update_checker(&self) -> ParamChecker {
        self.checker(self.update_params)
    }

    /// Checker for `params`, with this type's enums.
    pub fn checker(&self, params: &[(&'static str, &'static str)]) -> ParamChecker {
        ParamChecker::new(
            params.iter().copied(),
            self.enums.iter().map(|(name, values)| (*name, values.iter().copied())),
        )
    }

    /// Allowed values of one enum.
    pub fn enum_values(&self, name: &str) -> &'static [&'static str] {
        self.enums
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, values)| *values)
            .unwrap_or(&[])
    }

    /// Writes the `fields` param from an explicit list or the default read
    /// fields.
    ///
    /// `Some(&[])` requests nothing extra; `None` falls back to
    /// the defaults.
    pub fn assign_fields_to_params(&self, fields: Option<&[String]>, params: &mut Params) {
        let chosen: Vec<&str> = match fields {
            Some(list) => list.iter().map(String::as_str).collect(),
            None => self.default_read_fields.to_vec(),
        };
        if !chosen.is_empty() {
            params.insert("fields".to_string(), Value::String(chosen.join(",")));
        }
    }
}

/// Value stored under a field: raw JSON, a nested object, or a list of them.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Json(Value),
    Object(GraphObject),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Converts back to plain JSON, nested objects included.
    pub fn export(&self) -> Value {
        match self {
            FieldValue::Json(v) => strip_nulls(v),
            FieldValue::Object(obj) => obj.export_all_data(),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::export).collect()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            FieldValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&GraphObject> {
        match self {
            FieldValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, FieldValue::Json(Value::Null))
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Json(v)
    }
}

impl From<GraphObject> for FieldValue {
    fn from(obj: GraphObject) -> Self {
        FieldValue::Object(obj)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Json(Value::String(s.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Json(Value::String(s))
    }
}

/// A Graph node (or nested sub-object) with change tracking.
#[derive(Debug, Clone)]
pub struct GraphObject {
    spec: &'static ObjectSpec,
    data: BTreeMap<String, FieldValue>,
    changes: BTreeMap<String, FieldValue>,
}

impl GraphObject {
    pub fn new(spec: &'static ObjectSpec) -> Self {
        Self {
            spec,
            data: BTreeMap::new(),
            changes: BTreeMap::new(),
        }
    }

    /// Object addressing an existing node; the id is not a pending change.
    pub fn with_id(spec: &'static ObjectSpec, id: impl Into<String>) -> Self {
        let mut obj = Self::new(spec);
        obj.data
            .insert("id".to_string(), FieldValue::Json(Value::String(id.into())));
        obj
    }

    /// Object built from server data (no pending changes).
    pub fn from_json(spec: &'static ObjectSpec, data: &Map<String, Value>) -> Self {
        let mut obj = Self::new(spec);
        obj.set_data(data);
        obj
    }

    pub fn spec(&self) -> &'static ObjectSpec {
        self.spec
    }

    pub fn type_name(&self) -> &'static str {
        self.spec.type_name
    }

    /// The node id as a string, if set.
    pub fn id(&self) -> Option<String> {
        match self.data.get("id")? {
            FieldValue::Json(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            FieldValue::Json(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The node id, or a [`GraphApiError::BadObject`] when missing.
    pub fn id_assured(&self) -> GraphApiResult<String> {
        self.id().ok_or_else(|| {
            GraphApiError::BadObject(format!(
                "{} object needs an id for this operation.",
                self.spec.type_name
            ))
        })
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.data.get(field)
    }

    /// Exported JSON of one field.
    pub fn value(&self, field: &str) -> Option<Value> {
        self.data.get(field).map(FieldValue::export)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field)?.as_json()?.as_str()
    }

    pub fn get_object(&self, field: &str) -> Option<&GraphObject> {
        self.data.get(field)?.as_object()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Assigns a field, recording a change only when the value differs.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        let field = field.into();
        let value = value.into();

        if !self.spec.is_known_field(&field) {
            warn!(
                object = self.spec.type_name,
                field = %field,
                "field is not declared for this object type"
            );
        }

        let differs = self
            .data
            .get(&field)
            .map(|old| old.export() != value.export())
            .unwrap_or(true);
        if differs {
            self.changes.insert(field.clone(), value.clone());
        }
        self.data.insert(field, value);
        self
    }

    /// Removes a field together with its pending change.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.changes.remove(field);
        self.data.remove(field)
    }

    /// Loads fields as if read from the server; no changes are recorded.
    pub fn set_data(&mut self, data: &Map<String, Value>) -> &mut Self {
        for (key, value) in data {
            let decoded = decode_field(self.spec, key, value);
            self.data.insert(key.clone(), decoded);
            self.changes.remove(key);
        }
        self
    }

    /// Forgets pending changes (after a successful write).
    pub fn clear_history(&mut self) -> &mut Self {
        self.changes.clear();
        self.data.remove("filename");
        self
    }

    pub fn clear_id(&mut self) -> &mut Self {
        self.remove("id");
        self
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// Every field as JSON; nulls omitted, nested objects expanded.
    pub fn export_all_data(&self) -> Value {
        export_map(&self.data)
    }

    /// Only the fields modified since the last load/clear.
    pub fn export_changed_data(&self) -> Value {
        export_map(&self.changes)
    }

    /// Exported data as request params.
    pub fn export_all_params(&self) -> Params {
        into_params(self.export_all_data())
    }

    pub fn export_changed_params(&self) -> Params {
        into_params(self.export_changed_data())
    }
}

/// Two nodes are equal when they have the same type and the same id.
impl PartialEq for GraphObject {
    fn eq(&self, other: &Self) -> bool {
        self.spec.type_name == other.spec.type_name
            && matches!((self.id(), other.id()), (Some(a), Some(b)) if a == b)
    }
}

fn decode_field(spec: &ObjectSpec, key: &str, value: &Value) -> FieldValue {
    match spec.field_type(key) {
        Some(ty) => decode_typed(ty, value),
        None => FieldValue::Json(value.clone()),
    }
}

fn decode_typed(ty: &str, value: &Value) -> FieldValue {
    if let Some(inner) = ty.strip_prefix("list<").and_then(|t| t.strip_suffix('>')) {
        if let Value::Array(items) = value {
            return FieldValue::List(items.iter().map(|item| decode_typed(inner.trim(), item)).collect());
        }
    }
    match (nodes::spec_for(ty), value) {
        (Some(spec), Value::Object(map)) => FieldValue::Object(GraphObject::from_json(spec, map)),
        _ => FieldValue::Json(value.clone()),
    }
}

fn export_map(map: &BTreeMap<String, FieldValue>) -> Value {
    let out: Map<String, Value> = map
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.export()))
        .collect();
    Value::Object(out)
}

fn strip_nulls(v: &Value) -> Value {
    match v {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}

fn into_params(v: Value) -> Params {
    match v {
        Value::Object(map) => map.into_iter().collect(),
        _ => Params::new(),
    }
}
