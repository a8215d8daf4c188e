//! # Data Store
//!
//! Named values a report binds to: plain text, string maps (`labels.title`)
//! and lists of string maps (datagrid rows).
//!
//! Binding is deliberately forgiving. A path whose first segment is not in
//! the store resolves to the path text itself, so definitions can mix
//! literal text and bindings in the same property without any marker.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::ReportError;
use crate::style::loose;

/// A string-to-string map, as bound by `key.subkey` paths and used for one
/// datagrid row.
pub type Record = BTreeMap<String, String>;

/// One value in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DataValue {
    Text(String),
    Map(Record),
    List(Vec<Record>),
}

impl DataValue {
    /// Type-check and coerce a loosely typed value. Scalars become text,
    /// objects of scalars become maps, arrays of such objects become lists.
    pub fn from_json(key: &str, value: &Value) -> Result<Self, ReportError> {
        let invalid = |reason: &str| ReportError::InvalidData {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                Ok(DataValue::Text(loose::to_string(value)))
            }
            Value::Object(map) => record_from_json(map)
                .map(DataValue::Map)
                .ok_or_else(|| invalid("map values must be text, numbers or booleans")),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => record_from_json(map),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(DataValue::List)
                .ok_or_else(|| invalid("list entries must be maps of text values")),
            Value::Null => Err(invalid("null is not a bindable value")),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DataValue::Text(_) => "text",
            DataValue::Map(_) => "map",
            DataValue::List(_) => "list",
        }
    }
}

fn record_from_json(map: &serde_json::Map<String, Value>) -> Option<Record> {
    map.iter()
        .map(|(k, v)| match v {
            Value::String(_) | Value::Number(_) | Value::Bool(_) | Value::Null => {
                Some((k.clone(), loose::to_string(v)))
            }
            _ => None,
        })
        .collect()
}

/// A dotted reference such as `labels.title`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingPath {
    raw: String,
    segments: Vec<String>,
}

impl BindingPath {
    pub fn parse(path: &str) -> Self {
        let raw = path.trim().to_string();
        let segments = raw.split('.').map(|s| s.trim().to_string()).collect();
        Self { raw, segments }
    }

    pub fn key(&self) -> &str {
        &self.segments[0]
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `text` reads as a bare `key.subkey` reference: no whitespace,
    /// no placeholder braces, at least one dot, and no empty segment.
    pub fn looks_like_path(text: &str) -> bool {
        !text.is_empty()
            && text.contains('.')
            && !text.contains("{{")
            && !text.chars().any(char::is_whitespace)
            && text.split('.').all(|s| !s.is_empty())
    }
}

impl FromStr for BindingPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(BindingPath::parse(s))
    }
}

impl fmt::Display for BindingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The report's bound data. Read-only once layout starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DataStore {
    values: BTreeMap<String, DataValue>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or overwrite) `key`, type-checking the value first.
    pub fn set(&mut self, key: &str, value: &Value) -> Result<(), ReportError> {
        let value = DataValue::from_json(key, value)?;
        self.insert(key, value)
    }

    pub fn set_text(&mut self, key: &str, text: impl Into<String>) -> Result<(), ReportError> {
        self.insert(key, DataValue::Text(text.into()))
    }

    pub fn set_map(&mut self, key: &str, map: Record) -> Result<(), ReportError> {
        self.insert(key, DataValue::Map(map))
    }

    pub fn set_list(&mut self, key: &str, rows: Vec<Record>) -> Result<(), ReportError> {
        self.insert(key, DataValue::List(rows))
    }

    fn insert(&mut self, key: &str, value: DataValue) -> Result<(), ReportError> {
        let key = key.trim();
        if key.is_empty() || key.contains('.') {
            return Err(ReportError::InvalidData {
                key: key.to_string(),
                reason: "keys must be non-empty and contain no `.`".to_string(),
            });
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DataValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve a binding. Never fails: an unknown key yields the path text,
    /// a missing map entry yields `""`, text ignores further segments and a
    /// list yields `""`.
    pub fn resolve(&self, path: &BindingPath) -> String {
        match self.values.get(path.key()) {
            None => path.as_str().to_string(),
            Some(DataValue::Text(text)) => text.clone(),
            Some(DataValue::Map(map)) => path
                .segments()
                .get(1)
                .and_then(|sub| map.get(sub))
                .cloned()
                .unwrap_or_default(),
            Some(DataValue::List(_)) => String::new(),
        }
    }

    pub fn resolve_str(&self, path: &str) -> String {
        self.resolve(&BindingPath::parse(path))
    }

    /// Replace every `{{path}}` placeholder. `{{page}}` becomes `page` when
    /// given; `{{pages}}` is left for the page codec; placeholders whose key
    /// is unknown are kept as written.
    pub fn interpolate(&self, text: &str, page: Option<usize>) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            out.push_str(&rest[..start]);
            let placeholder = &rest[start..start + 2 + len + 2];
            let inner = rest[start + 2..start + 2 + len].trim();
            match inner {
                "page" => match page {
                    Some(n) => out.push_str(&n.to_string()),
                    None => out.push_str(placeholder),
                },
                "pages" => out.push_str(placeholder),
                _ => {
                    let path = BindingPath::parse(inner);
                    if self.values.contains_key(path.key()) {
                        out.push_str(&self.resolve(&path));
                    } else {
                        out.push_str(placeholder);
                    }
                }
            }
            rest = &rest[start + 2 + len + 2..];
        }
        out.push_str(rest);
        out
    }

    /// Text for a cell-like `value`: a bare dotted path is resolved, anything
    /// else has its placeholders interpolated.
    pub fn bound_text(&self, value: &str, page: Option<usize>) -> String {
        if BindingPath::looks_like_path(value) {
            self.resolve_str(value)
        } else {
            self.interpolate(value, page)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> DataStore {
        let mut store = DataStore::new();
        store
            .set("labels", &json!({"title": "REPORT", "total": "Total"}))
            .unwrap();
        store.set("logo", &json!("data:image/png;base64,AAAA")).unwrap();
        store
            .set("items", &json!([{"number": 3}, {"number": "4.5"}]))
            .unwrap();
        store
    }

    #[test]
    fn test_resolve_missing_key_is_literal() {
        assert_eq!(store().resolve_str("missing.key"), "missing.key");
    }

    #[test]
    fn test_resolve_map_entry() {
        let store = store();
        assert_eq!(store.resolve_str("labels.title"), "REPORT");
        assert_eq!(store.resolve_str("labels.nope"), "");
        assert_eq!(store.resolve_str("labels"), "");
    }

    #[test]
    fn test_resolve_text_is_terminal() {
        let store = store();
        assert_eq!(store.resolve_str("logo"), "data:image/png;base64,AAAA");
        assert_eq!(store.resolve_str("logo.anything"), "data:image/png;base64,AAAA");
        assert_eq!(store.resolve_str("items.number"), "");
    }

    #[test]
    fn test_set_coerces_scalars() {
        let store = store();
        match store.get("items") {
            Some(DataValue::List(rows)) => {
                assert_eq!(rows[0]["number"], "3");
                assert_eq!(rows[1]["number"], "4.5");
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_set_rejects_nested_values() {
        let mut store = DataStore::new();
        for bad in [
            json!({"a": {"b": "c"}}),
            json!([1, 2, 3]),
            json!(null),
            json!([{"a": [1]}]),
        ] {
            assert!(matches!(
                store.set("bad", &bad),
                Err(ReportError::InvalidData { .. })
            ));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_overwrites() {
        let mut store = store();
        store.set_text("labels", "plain").unwrap();
        assert_eq!(store.resolve_str("labels.title"), "plain");
    }

    #[test]
    fn test_interpolate_placeholders() {
        let store = store();
        assert_eq!(
            store.interpolate("{{labels.title}} p{{page}}/{{pages}}", Some(2)),
            "REPORT p2/{{pages}}"
        );
        assert_eq!(store.interpolate("{{nobody}} and {{", None), "{{nobody}} and {{");
    }

    #[test]
    fn test_bound_text_rule() {
        let store = store();
        assert_eq!(store.bound_text("labels.total", None), "Total");
        assert_eq!(store.bound_text("Go Sample", None), "Go Sample");
        assert_eq!(store.bound_text("3.14", None), "3.14");
        assert_eq!(store.bound_text("Page {{page}}", Some(7)), "Page 7");
    }

    #[test]
    fn test_bound_text_whole_placeholder() {
        let store = store();
        assert!(!BindingPath::looks_like_path("{{labels.title}}"));
        assert_eq!(store.bound_text("{{labels.title}}", None), "REPORT");
        assert_eq!(store.bound_text("{{labels.nope}}", None), "");
        assert_eq!(store.bound_text("{{missing.key}}", None), "{{missing.key}}");
    }
}
