//! Typed properties for each element kind.
//!
//! Definitions use kebab-case keys with loosely typed values. Every field
//! deserializes through [`loose`], so values that cannot be coerced leave the
//! field unset instead of failing. Keys a kind does not know are kept as text
//! in `extra` and written back out unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::ElementKind;
use crate::barcode::{CodeType, QrEcc};
use crate::error::ReportError;
use crate::style::loose;
use crate::style::{Align, Borders, Color, Dimension, FontStyle};

/// Unrecognised properties, kept verbatim as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Extra(pub BTreeMap<String, String>);

impl<'de> Deserialize<'de> for Extra {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        Ok(Extra(
            raw.into_iter()
                .map(|(k, v)| (k, loose::to_string(&v)))
                .collect(),
        ))
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RowProps {
    /// Minimum row height in mm.
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Horizontal gap between children in mm.
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub hgap: Option<f64>,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "is_false")]
    pub page_break: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CellProps {
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Literal text, a `key.subkey` binding, or text with `{{path}}`
    /// placeholders.
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "FontStyle::is_plain")]
    pub font_style: FontStyle,
    /// Points.
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "Borders::is_none")]
    pub border: Borders,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "is_false")]
    pub multiline: bool,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ImageProps {
    /// A data URL, raw base64, or a data key holding either.
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub src: String,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BarcodeProps {
    /// Defaults to Code 128.
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub code_type: Option<CodeType>,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "is_false")]
    pub visible_value: bool,
    /// Code 39 full-ASCII mode.
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "is_false")]
    pub extend: bool,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "is_false")]
    pub checksum: bool,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub ecc: Option<QrEcc>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl BarcodeProps {
    pub fn code_type(&self) -> CodeType {
        self.code_type.unwrap_or(CodeType::Code128)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DatagridProps {
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Data key of the list the grid iterates.
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub databind: String,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "Borders::is_none")]
    pub border: Borders,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub header_background: Option<Color>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub footer_background: Option<Color>,
    /// Show the column header row. Defaults to true.
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub header: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl DatagridProps {
    pub fn show_header(&self) -> bool {
        self.header.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ColumnProps {
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub fieldname: String,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub header_align: Option<Align>,
    /// `=sum`, `=count`, or bound text.
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub footer: String,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub footer_align: Option<Align>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HtmlProps {
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub fieldname: String,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "String::is_empty")]
    pub html: String,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VgapProps {
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(deserialize_with = "loose::value", skip_serializing_if = "is_false")]
    pub page_break: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HlineProps {
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub width: Option<Dimension>,
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,
    /// Vertical space kept below the line, in mm.
    #[serde(deserialize_with = "loose::option", skip_serializing_if = "Option::is_none")]
    pub gap: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The properties of one element, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Properties {
    Row(RowProps),
    Cell(CellProps),
    Image(ImageProps),
    Barcode(BarcodeProps),
    Datagrid(DatagridProps),
    Column(ColumnProps),
    Html(HtmlProps),
    Vgap(VgapProps),
    Hline(HlineProps),
}

impl Properties {
    /// Coerce a loose property map into the typed properties for `kind`.
    pub fn from_map(kind: ElementKind, map: &Map<String, Value>) -> Result<Self, ReportError> {
        let value = Value::Object(map.clone());
        let invalid = |e: serde_json::Error| {
            ReportError::InvalidDefinition(format!("properties of `{}`: {e}", kind.name()))
        };
        Ok(match kind {
            ElementKind::Row => Properties::Row(serde_json::from_value(value).map_err(invalid)?),
            ElementKind::Cell => Properties::Cell(serde_json::from_value(value).map_err(invalid)?),
            ElementKind::Image => {
                Properties::Image(serde_json::from_value(value).map_err(invalid)?)
            }
            ElementKind::Barcode => {
                Properties::Barcode(serde_json::from_value(value).map_err(invalid)?)
            }
            ElementKind::Datagrid => {
                Properties::Datagrid(serde_json::from_value(value).map_err(invalid)?)
            }
            ElementKind::Column => {
                Properties::Column(serde_json::from_value(value).map_err(invalid)?)
            }
            ElementKind::Html => Properties::Html(serde_json::from_value(value).map_err(invalid)?),
            ElementKind::Vgap => Properties::Vgap(serde_json::from_value(value).map_err(invalid)?),
            ElementKind::Hline => {
                Properties::Hline(serde_json::from_value(value).map_err(invalid)?)
            }
        })
    }

    /// Default properties for `kind`.
    pub fn empty(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Row => Properties::Row(RowProps::default()),
            ElementKind::Cell => Properties::Cell(CellProps::default()),
            ElementKind::Image => Properties::Image(ImageProps::default()),
            ElementKind::Barcode => Properties::Barcode(BarcodeProps::default()),
            ElementKind::Datagrid => Properties::Datagrid(DatagridProps::default()),
            ElementKind::Column => Properties::Column(ColumnProps::default()),
            ElementKind::Html => Properties::Html(HtmlProps::default()),
            ElementKind::Vgap => Properties::Vgap(VgapProps::default()),
            ElementKind::Hline => Properties::Hline(HlineProps::default()),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Properties::Row(_) => ElementKind::Row,
            Properties::Cell(_) => ElementKind::Cell,
            Properties::Image(_) => ElementKind::Image,
            Properties::Barcode(_) => ElementKind::Barcode,
            Properties::Datagrid(_) => ElementKind::Datagrid,
            Properties::Column(_) => ElementKind::Column,
            Properties::Html(_) => ElementKind::Html,
            Properties::Vgap(_) => ElementKind::Vgap,
            Properties::Hline(_) => ElementKind::Hline,
        }
    }

    /// The properties as a kebab-case JSON map, as written by the codecs.
    pub fn to_map(&self) -> Map<String, Value> {
        let value = match self {
            Properties::Row(p) => serde_json::to_value(p),
            Properties::Cell(p) => serde_json::to_value(p),
            Properties::Image(p) => serde_json::to_value(p),
            Properties::Barcode(p) => serde_json::to_value(p),
            Properties::Datagrid(p) => serde_json::to_value(p),
            Properties::Column(p) => serde_json::to_value(p),
            Properties::Html(p) => serde_json::to_value(p),
            Properties::Vgap(p) => serde_json::to_value(p),
            Properties::Hline(p) => serde_json::to_value(p),
        };
        match value {
            Ok(Value::Object(map)) => map,
            // Property structs only hold strings, numbers and booleans.
            _ => Map::new(),
        }
    }

    pub fn extra(&self) -> &Extra {
        match self {
            Properties::Row(p) => &p.extra,
            Properties::Cell(p) => &p.extra,
            Properties::Image(p) => &p.extra,
            Properties::Barcode(p) => &p.extra,
            Properties::Datagrid(p) => &p.extra,
            Properties::Column(p) => &p.extra,
            Properties::Html(p) => &p.extra,
            Properties::Vgap(p) => &p.extra,
            Properties::Hline(p) => &p.extra,
        }
    }
}
