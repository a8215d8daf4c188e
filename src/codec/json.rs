//! JSON definitions.
//!
//! ```json
//! {
//!   "report":  { "orientation": "portrait", "pageSize": "A4", ... },
//!   "header":  [ { "type": "row", "properties": {...}, "children": [...] } ],
//!   "details": [ ... ],
//!   "footer":  [ ... ],
//!   "data":    { "title": "text", "labels": {...}, "items": [{...}] }
//! }
//! ```
//!
//! `report` and `data` are optional. The three sections are required, even
//! when empty.

use serde_json::{json, Map, Value};

use super::Definition;
use crate::data::DataStore;
use crate::error::ReportError;
use crate::model::{ElementId, ElementKind, ElementTree, Parent, ReportConfig, Section};

/// Serialize a definition as pretty-printed JSON.
pub fn write(
    config: &ReportConfig,
    tree: &ElementTree,
    data: &DataStore,
) -> Result<String, ReportError> {
    let mut root = Map::new();
    root.insert("report".to_string(), serde_json::to_value(config)?);
    for section in Section::ALL {
        let elements: Vec<Value> = tree
            .section(section)
            .iter()
            .map(|&id| element_value(tree, id))
            .collect();
        root.insert(section.name().to_string(), Value::Array(elements));
    }
    root.insert("data".to_string(), serde_json::to_value(data)?);
    Ok(serde_json::to_string_pretty(&Value::Object(root))?)
}

fn element_value(tree: &ElementTree, id: ElementId) -> Value {
    let Some(element) = tree.get(id) else {
        return Value::Null;
    };
    let mut value = json!({
        "type": element.kind().name(),
        "properties": element.props.to_map(),
    });
    if !element.children.is_empty() {
        value["children"] = Value::Array(
            element
                .children
                .iter()
                .map(|&child| element_value(tree, child))
                .collect(),
        );
    }
    value
}

/// Parse a JSON definition.
pub fn read(input: &str) -> Result<Definition, ReportError> {
    let root: Value = serde_json::from_str(input)?;
    let Value::Object(root) = root else {
        return Err(ReportError::InvalidDefinition(
            "the definition must be a JSON object".to_string(),
        ));
    };

    let config = match root.get("report") {
        None | Some(Value::Null) => ReportConfig::default(),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            ReportError::InvalidDefinition(format!("`report` configuration: {e}"))
        })?,
    };

    let mut tree = ElementTree::new();
    for section in Section::ALL {
        let elements = match root.get(section.name()) {
            Some(Value::Array(elements)) => elements,
            Some(_) => {
                return Err(ReportError::InvalidDefinition(format!(
                    "section `{}` must be an array",
                    section.name()
                )))
            }
            None => {
                return Err(ReportError::InvalidDefinition(format!(
                    "missing section `{}`",
                    section.name()
                )))
            }
        };
        for element in elements {
            append_element(&mut tree, section.into(), element)?;
        }
    }

    let mut data = DataStore::new();
    match root.get("data") {
        None | Some(Value::Null) => {}
        Some(Value::Object(values)) => {
            for (key, value) in values {
                data.set(key, value)?;
            }
        }
        Some(_) => {
            return Err(ReportError::InvalidDefinition(
                "`data` must be an object".to_string(),
            ))
        }
    }

    Ok(Definition { config, tree, data })
}

fn append_element(
    tree: &mut ElementTree,
    parent: Parent,
    value: &Value,
) -> Result<(), ReportError> {
    let Value::Object(descriptor) = value else {
        return Err(ReportError::InvalidDefinition(format!(
            "expected an element object, found `{value}`"
        )));
    };
    let type_name = descriptor
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ReportError::InvalidDefinition("element without a `type`".to_string()))?;
    let kind = ElementKind::parse(type_name).ok_or_else(|| {
        ReportError::InvalidDefinition(format!("unknown element type `{type_name}`"))
    })?;

    let empty = Map::new();
    let properties = match descriptor.get("properties") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ReportError::InvalidDefinition(format!(
                "properties of `{type_name}` must be an object"
            )))
        }
    };
    let id = tree.append(parent, kind, properties)?;

    match descriptor.get("children") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(children)) => {
            for child in children {
                append_element(tree, id.into(), child)?;
            }
            Ok(())
        }
        Some(_) => Err(ReportError::InvalidDefinition(format!(
            "children of `{type_name}` must be an array"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INVOICE: &str = r#"{
        "report": { "orientation": "l", "pageSize": "A5", "fontSize": 9 },
        "header": [
            { "type": "row", "children": [
                { "type": "cell", "properties": { "value": "labels.title", "font-style": "B" } }
            ] }
        ],
        "details": [
            { "type": "datagrid", "properties": { "databind": "items" }, "children": [
                { "type": "column", "properties": { "fieldname": "sku", "width": "30%" } }
            ] }
        ],
        "footer": [],
        "data": {
            "labels": { "title": "Invoice" },
            "items": [ { "sku": "A-1" }, { "sku": "B-2" } ],
            "number": 42
        }
    }"#;

    #[test]
    fn test_read_definition() {
        let def = read(INVOICE).unwrap();
        assert_eq!(def.config.page_dimensions(), (210.0, 148.0));
        assert_eq!(def.config.font_size, 9.0);
        assert_eq!(def.tree.section(Section::Header).len(), 1);
        assert_eq!(def.tree.len(), 4);
        assert_eq!(def.data.resolve_str("labels.title"), "Invoice");
        assert_eq!(def.data.resolve_str("number"), "42");
    }

    #[test]
    fn test_write_then_read_is_equal() {
        let def = read(INVOICE).unwrap();
        let text = write(&def.config, &def.tree, &def.data).unwrap();
        let again = read(&text).unwrap();
        assert_eq!(again, def);
    }

    #[test]
    fn test_missing_section() {
        let err = read(r#"{"header": [], "details": []}"#).unwrap_err();
        assert!(matches!(err, ReportError::InvalidDefinition(msg) if msg.contains("footer")));
    }

    #[test]
    fn test_unknown_element_type() {
        let err = read(r#"{"header": [], "details": [{"type": "chart"}], "footer": []}"#)
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidDefinition(msg) if msg.contains("chart")));
    }

    #[test]
    fn test_bad_nesting_is_reported() {
        let err = read(r#"{"header": [{"type": "cell"}], "details": [], "footer": []}"#)
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidElement { .. }));
    }

    #[test]
    fn test_syntax_error_has_hint() {
        let err = read(r#"{"header": [],}"#).unwrap_err();
        assert!(matches!(err, ReportError::Parse { .. }));
    }
}
