//! Bracket-style form encoding.
//!
//! `{"a": {"b": 1}, "c": [true, null]}` becomes `a[b]=1&c[0]=true&c[1]=`.
//! Brackets stay literal in the encoded string.

use serde::Serialize;
use serde_json::Value;

use crate::errors::{StripeError, StripeResult};

/// Flattens serialized params into ordered `(key, value)` pairs.
///
/// Params must serialize to a map (or to nothing at all).
pub fn encode_params<P: Serialize + ?Sized>(params: &P) -> StripeResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    match serde_json::to_value(params)? {
        Value::Null => {}
        Value::Object(map) => {
            for (key, value) in &map {
                flatten(key.clone(), value, &mut out);
            }
        }
        other => {
            return Err(StripeError::InvalidParams(format!(
                "request params must be a map, got {other}"
            )));
        }
    }
    Ok(out)
}

fn flatten(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => out.push((key, String::new())),
        Value::Bool(b) => out.push((key, b.to_string())),
        Value::Number(n) => out.push((key, n.to_string())),
        Value::String(s) => out.push((key, s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(format!("{key}[{i}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                flatten(format!("{key}[{sub}]"), item, out);
            }
        }
    }
}

/// `k=v&...` in `application/x-www-form-urlencoded` form (spaces as `+`),
/// brackets kept literal.
pub fn form_encode(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", quote(k), quote(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn quote(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace("%5B", "[")
        .replace("%5D", "]")
}

/// Encodes an id for use as a path segment (`/` and spaces included).
pub fn sanitize_id(id: &str) -> String {
    urlencoding::encode(id).replace("%20", "+")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_values_flatten_with_brackets() {
        let pairs = encode_params(&json!({
            "amount": 2000,
            "automatic_payment_methods": {"enabled": true},
            "expand": ["customer", "latest_charge"],
            "metadata": {"order": null},
        }))
        .unwrap();

        assert_eq!(
            form_encode(&pairs),
            "amount=2000&automatic_payment_methods[enabled]=true\
             &expand[0]=customer&expand[1]=latest_charge&metadata[order]="
        );
    }

    #[test]
    fn lists_of_maps_are_indexed() {
        let pairs = encode_params(&json!({"items": [{"price": "p_1", "quantity": 2}]})).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("items[0][price]".to_string(), "p_1".to_string()),
                ("items[0][quantity]".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn values_are_percent_encoded() {
        let pairs = encode_params(&json!({"description": "a&b c", "email": "x+y@z"})).unwrap();
        assert_eq!(form_encode(&pairs), "description=a%26b+c&email=x%2By%40z");
    }

    #[test]
    fn brackets_inside_keys_and_values_stay_literal() {
        let pairs = encode_params(&json!({"metadata": {"note": "two words [x]"}})).unwrap();
        assert_eq!(form_encode(&pairs), "metadata[note]=two+words+[x]");
    }

    #[test]
    fn typed_params_serialize_too() {
        #[derive(Serialize)]
        struct Create<'a> {
            amount: i64,
            currency: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            customer: Option<&'a str>,
        }
        let pairs = encode_params(&Create {
            amount: 5,
            currency: "usd",
            customer: None,
        })
        .unwrap();
        assert_eq!(form_encode(&pairs), "amount=5&currency=usd");
        assert!(encode_params(&()).unwrap().is_empty());
        assert!(matches!(encode_params(&json!([1])), Err(StripeError::InvalidParams(_))));
    }

    #[test]
    fn ids_are_path_safe() {
        assert_eq!(sanitize_id("tmr_123"), "tmr_123");
        assert_eq!(sanitize_id("a/b c"), "a%2Fb+c");
    }
}
