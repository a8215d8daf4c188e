//! Structured error types for the folio report engine.
//!
//! Every public operation returns [`ReportError`]. Symbol encoding has its own
//! [`EncodeError`](crate::barcode::EncodeError), which the layout engine wraps
//! into [`ReportError::Layout`] so a report never silently drops a barcode.

use thiserror::Error;

use crate::barcode::EncodeError;

/// The unified error type returned by all public folio API functions.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The definition document is structurally wrong (missing sections,
    /// unknown element types, bad nesting while loading).
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    /// JSON input failed to parse.
    #[error("Failed to parse definition: {source}{}", hint_suffix(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// XML input failed to parse or output failed to write.
    #[error("XML error: {0}")]
    Xml(String),

    /// An element type cannot be appended to the given parent.
    #[error("Cannot append `{child}` to {parent}")]
    InvalidElement { parent: String, child: String },

    /// A value passed to `set_data` is not text, a string map, or a list of
    /// string maps.
    #[error("Invalid data for key `{key}`: {reason}")]
    InvalidData { key: String, reason: String },

    /// Layout could not be completed. No pages are produced.
    #[error("Layout error: {message}")]
    Layout {
        message: String,
        #[source]
        source: Option<EncodeError>,
    },

    /// The rendering backend failed to produce output.
    #[error("Render error: {0}")]
    Render(String),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl ReportError {
    pub(crate) fn layout(message: impl Into<String>) -> Self {
        ReportError::Layout {
            message: message.into(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the report definition schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ReportError::Parse { source: e, hint }
    }
}

impl From<quick_xml::Error> for ReportError {
    fn from(e: quick_xml::Error) -> Self {
        ReportError::Xml(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_hint() {
        let err: ReportError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let text = err.to_string();
        assert!(text.starts_with("Failed to parse definition"));
        assert!(text.contains("Hint: Check for trailing commas"));
    }

    #[test]
    fn test_layout_error_exposes_encoder_source() {
        use std::error::Error;
        let err = ReportError::Layout {
            message: "barcode `x`".to_string(),
            source: Some(EncodeError::InvalidLength {
                symbology: "ITF",
                length: 3,
                expected: "an even number of digits",
            }),
        };
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Layout error: barcode `x`");
    }
}
