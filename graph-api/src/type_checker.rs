//! Advisory parameter type checking.
//!
//! Every generated endpoint wrapper declares the expected type of each
//! parameter. A mismatch never blocks a call; the request builder only logs
//! a warning.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

/// Parameter name → declared type, plus enum name → allowed values.
#[derive(Debug, Clone, Default)]
pub struct ParamChecker {
    type_check: HashMap<String, String>,
    enum_data: HashMap<String, Vec<String>>,
}

impl ParamChecker {
    /// Checker that accepts everything.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new<'a, T, E, V>(types: T, enums: E) -> Self
    where
        T: IntoIterator<Item = (&'a str, &'a str)>,
        E: IntoIterator<Item = (&'a str, V)>,
        V: IntoIterator<Item = &'a str>,
    {
        Self {
            type_check: types
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            enum_data: enums
                .into_iter()
                .map(|(name, values)| {
                    (
                        name.to_string(),
                        values.into_iter().map(str::to_string).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Checker for endpoints that declare no enums.
    pub fn with_types<'a, T>(types: T) -> Self
    where
        T: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::new(types, std::iter::empty::<(&str, Vec<&str>)>())
    }

    /// Declared type of `param`, if any.
    pub fn get_type(&self, param: &str) -> Option<&str> {
        self.type_check.get(param).map(String::as_str)
    }

    /// File params are routed to the multipart body instead of the form.
    pub fn is_file_param(&self, param: &str) -> bool {
        param == "filename" || self.get_type(param) == Some("file")
    }

    /// Unknown params and nulls are always valid.
    pub fn is_valid_pair(&self, param: &str, value: &Value) -> bool {
        match self.get_type(param) {
            Some(value_type) => self.is_type(value_type, value),
            None => true,
        }
    }

    /// Checks `value` against a declared type name.
    pub fn is_type(&self, value_type: &str, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }

        if let Some(allowed) = self.enum_data.get(value_type) {
            return value
                .as_str()
                .map(|s| allowed.iter().any(|a| a == s))
                .unwrap_or(false);
        }

        let value_type = value_type.trim();

        if let Some(inner) = collection_inner(value_type, "list") {
            return match value {
                Value::Array(items) => items.iter().all(|item| self.is_type(inner, item)),
                _ => false,
            };
        }

        if let Some(inner) = collection_inner(value_type, "map") {
            let value_ty = split_map_types(inner).map(|(_, v)| v);
            return match (value, value_ty) {
                (Value::Object(map), Some(v_ty)) => map.values().all(|v| self.is_type(v_ty, v)),
                (Value::Object(_), None) => true,
                _ => false,
            };
        }

        match value_type {
            "string" => value.is_string(),
            "int" => value.is_i64() || value.is_u64(),
            "unsigned int" => value.is_u64(),
            "float" => value.is_number(),
            "bool" => value.is_boolean(),
            "datetime" => value.is_string() || value.is_i64() || value.is_u64(),
            "list" => value.is_array(),
            "map" => value.is_object(),
            "file" => value.as_str().map(|p| Path::new(p).is_file()).unwrap_or(false),
            "Object" => value.is_object(),
            other if other.chars().next().is_some_and(char::is_uppercase) => {
                // Named node types accept an object spec or a bare id.
                value.is_object() || value.is_string()
            }
            // Unknown primitive names cannot be checked.
            _ => true,
        }
    }
}

/// Returns `T` for `kind<T>`.
fn collection_inner<'a>(value_type: &'a str, kind: &str) -> Option<&'a str> {
    value_type
        .strip_prefix(kind)?
        .strip_prefix('<')?
        .strip_suffix('>')
        .map(str::trim)
}

/// Splits `K, V` at the top-level comma.
fn split_map_types(inner: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Some((inner[..i].trim(), inner[i + 1..].trim())),
            _ => {}
        }
    }
    None
}
