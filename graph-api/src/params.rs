//! Request parameter encoding.
//!
//! Graph endpoints take flat form/query parameters. Nested values (maps,
//! lists) and booleans are sent as compact JSON strings; strings and numbers
//! go through untouched.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::errors::{GraphApiError, GraphApiResult};

/// Request parameters, name → JSON value.
pub type Params = BTreeMap<String, Value>;

/// JSON-encodes every top-level container or boolean value.
///
/// Nulls are dropped, as an unset parameter is never sent. Object keys come
/// out sorted because `serde_json::Map` is ordered.
pub fn top_level_json_encode(params: &Params) -> Vec<(String, Value)> {
    params
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let encoded = match v {
                Value::Object(_) | Value::Array(_) | Value::Bool(_) => {
                    Value::String(v.to_string())
                }
                other => other.clone(),
            };
            (k.clone(), encoded)
        })
        .collect()
}

/// Renders an encoded value as the literal string that goes on the wire.
pub fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encoded params as plain string pairs, ready for a query or a form.
pub fn encode_pairs(params: &Params) -> Vec<(String, String)> {
    top_level_json_encode(params)
        .into_iter()
        .map(|(k, v)| (k, param_string(&v)))
        .collect()
}

/// Percent-encodes a string as UTF-8, keeping `/` literal.
pub fn quote(s: &str) -> String {
    urlencoding::encode(s).replace("%2F", "/")
}

/// Percent-encodes a string or integer value.
///
/// Anything else (floats, lists, maps, booleans) cannot be quoted and is
/// rejected with [`GraphApiError::BadParameter`].
pub fn quote_with_encoding(value: &Value) -> GraphApiResult<String> {
    match value {
        Value::String(s) => Ok(quote(s)),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(quote(&n.to_string())),
        other => Err(GraphApiError::BadParameter(format!(
            "cannot quote value {other}: only strings and integers are supported"
        ))),
    }
}

/// `key=value&...` with every value quoted; used for batch calls.
pub fn quoted_query(params: &Params) -> GraphApiResult<String> {
    let mut parts = Vec::with_capacity(params.len());
    for (key, value) in top_level_json_encode(params) {
        parts.push(format!("{key}={}", quote_with_encoding(&value)?));
    }
    Ok(parts.join("&"))
}

/// Builds `Params` from `(name, value)` pairs.
pub fn params_from<I, K>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn encodes_containers_and_bools_only() {
        let params = params_from([
            ("name", json!("x")),
            ("limit", json!(25)),
            ("summary", json!(true)),
            ("filtering", json!([{"field": "a", "operator": "IN"}])),
            ("time_range", json!({"until": "2024-02-01", "since": "2024-01-01"})),
            ("skip", Value::Null),
        ]);

        let encoded = encode_pairs(&params);
        assert_eq!(
            encoded,
            vec![
                (
                    "filtering".to_string(),
                    r#"[{"field":"a","operator":"IN"}]"#.to_string()
                ),
                ("limit".to_string(), "25".to_string()),
                ("name".to_string(), "x".to_string()),
                ("summary".to_string(), "true".to_string()),
                (
                    "time_range".to_string(),
                    r#"{"since":"2024-01-01","until":"2024-02-01"}"#.to_string()
                ),
            ]
        );
    }

    #[test]
    fn quote_matches_url_quoting() {
        assert_eq!(quote("some string"), "some%20string");
        assert_eq!(quote("a/b"), "a/b");
        assert_eq!(quote("vàlué"), "v%C3%A0lu%C3%A9");
        assert_eq!(quote_with_encoding(&json!(1234)).unwrap(), "1234");
    }

    #[test]
    fn quote_rejects_other_values() {
        assert!(matches!(
            quote_with_encoding(&json!([1, 2])),
            Err(GraphApiError::BadParameter(_))
        ));
        assert!(quote_with_encoding(&json!(1.5)).is_err());
    }
}
