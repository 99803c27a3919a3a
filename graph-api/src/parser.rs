//! Turns decoded response bodies into [`GraphObject`]s.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::{GraphApiError, GraphApiResult};
use crate::object::{GraphObject, ObjectSpec};

/// Custom parse function for endpoints whose reply is not a plain node.
pub type ParseFn = Arc<dyn Fn(&Value) -> GraphApiResult<GraphObject> + Send + Sync>;

/// How a response body becomes objects.
#[derive(Clone)]
pub enum ObjectParser {
    /// Build fresh objects of this type.
    Target(&'static ObjectSpec),
    /// Load the reply into a copy of an existing object (id and spec kept).
    Reuse(GraphObject),
    /// Hand the body to a custom function.
    Custom(ParseFn),
}

impl fmt::Debug for ObjectParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectParser::Target(spec) => f.debug_tuple("Target").field(&spec.type_name).finish(),
            ObjectParser::Reuse(obj) => f.debug_tuple("Reuse").field(&obj.type_name()).finish(),
            ObjectParser::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl ObjectParser {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value) -> GraphApiResult<GraphObject> + Send + Sync + 'static,
    {
        ObjectParser::Custom(Arc::new(f))
    }

    /// Parses one object, unwrapping a `data` object when present.
    pub fn parse_single(&self, response: &Value) -> GraphApiResult<GraphObject> {
        match self {
            ObjectParser::Custom(f) => f(response),
            ObjectParser::Reuse(template) => {
                let mut obj = template.clone();
                obj.set_data(object_body(response)?);
                Ok(obj)
            }
            ObjectParser::Target(spec) => Ok(GraphObject::from_json(spec, object_body(response)?)),
        }
    }

    /// Parses a page: a `data` list yields one object per item, anything
    /// else yields a single object.
    pub fn parse_multiple(&self, response: &Value) -> GraphApiResult<Vec<GraphObject>> {
        match response.get("data") {
            Some(Value::Array(items)) => items.iter().map(|item| self.parse_single(item)).collect(),
            _ => Ok(vec![self.parse_single(response)?]),
        }
    }
}

fn object_body(response: &Value) -> GraphApiResult<&Map<String, Value>> {
    unwrap_data(response)
        .ok_or_else(|| GraphApiError::BadObject(format!("expected a JSON object, got {response}")))
}

/// `data` wrapper first; an `images` map collapses to its last entry.
fn unwrap_data(response: &Value) -> Option<&Map<String, Value>> {
    if let Some(Value::Object(data)) = response.get("data") {
        return Some(data);
    }
    if let Some(Value::Object(images)) = response.get("images") {
        if let Some((_, Value::Object(image))) = images.iter().next_back() {
            return Some(image);
        }
    }
    response.as_object()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{AD_ACCOUNT, AD_SET, AD_CREATIVE};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn data_list_gives_one_object_per_item() {
        let body = json!({"data": [{"id": "1"}, {"id": "2"}], "paging": {}});
        let objs = ObjectParser::Target(&AD_SET).parse_multiple(&body).unwrap();
        assert_eq!(objs.len(), 2);
        assert_eq!(objs[1].id().as_deref(), Some("2"));
        assert_eq!(objs[0].type_name(), "AdSet");
    }

    #[test]
    fn data_object_gives_single_object() {
        let body = json!({"data": {"account_id": "act_12345", "id": "1"}});
        let objs = ObjectParser::Target(&AD_ACCOUNT).parse_multiple(&body).unwrap();
        assert_eq!(objs.len(), 1);
        assert_eq!(objs[0].get_str("account_id"), Some("act_12345"));
    }

    #[test]
    fn bare_response_gives_single_object() {
        let body = json!({"id": "1", "targetingsentencelines": [{"content": "Location"}]});
        let objs = ObjectParser::Target(&AD_SET).parse_multiple(&body).unwrap();
        assert_eq!(objs.len(), 1);
        assert_eq!(
            objs[0].value("targetingsentencelines"),
            Some(json!([{"content": "Location"}]))
        );
    }

    #[test]
    fn reuse_keeps_template_identity() {
        let template = GraphObject::with_id(&AD_ACCOUNT, "act_1");
        let parsed = ObjectParser::Reuse(template)
            .parse_single(&json!({"name": "acct"}))
            .unwrap();
        assert_eq!(parsed.id().as_deref(), Some("act_1"));
        assert_eq!(parsed.get_str("name"), Some("acct"));
        assert!(!parsed.has_changes());
    }

    #[test]
    fn custom_parser_is_delegated_to() {
        let parser = ObjectParser::custom(|v| {
            let mut obj = GraphObject::new(&ObjectSpec::ANY);
            obj.set("raw", v.clone());
            Ok(obj)
        });
        let obj = parser.parse_single(&json!([1, 2])).unwrap();
        assert_eq!(obj.value("raw"), Some(json!([1, 2])));
    }

    #[test]
    fn images_map_collapses_to_one_image() {
        let body = json!({"images": {"a.png": {"hash": "abc", "url": "u"}}});
        let obj = ObjectParser::Target(&AD_CREATIVE).parse_single(&body).unwrap();
        assert_eq!(obj.get_str("hash"), Some("abc"));
    }

    #[test]
    fn scalar_body_is_a_bad_object() {
        let err = ObjectParser::Target(&AD_SET).parse_single(&json!(true)).unwrap_err();
        assert!(matches!(err, GraphApiError::BadObject(_)));
    }
}
