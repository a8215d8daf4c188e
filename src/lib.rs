//! # Folio
//!
//! A banded report engine.
//!
//! A report is three sections: a header and a footer that repeat on every
//! page, and a details body that flows from page to page. Sections hold rows
//! of cells, images and barcodes, data grids, HTML fragments, gaps and
//! rules. Text is bound to a data store by dotted paths (`labels.title`) or
//! `{{path}}` placeholders.
//!
//! ## Architecture
//!
//! ```text
//! Definition (JSON / XML / API)
//!       ↓
//!   [model]  element tree, typed properties, report config
//!   [data]   data store, binding resolution
//!       ↓
//!   [layout] pagination: blocks are never split across pages
//!       ↓      [barcode] encoders run here
//!   [pdf]    page codec driving a RenderBackend (PdfWriter)
//!       ↓
//!   PDF bytes, or [codec]: JSON, XML, data URL
//! ```
//!
//! ```
//! use folio::model::{ReportConfig, Section};
//! use folio::Report;
//! use serde_json::json;
//!
//! let mut report = Report::new(ReportConfig::default());
//! let row = report.append(Section::Header, "row", &json!({})).unwrap();
//! report.append(row, "cell", &json!({"value": "labels.title"})).unwrap();
//! report.set_data("labels", &json!({"title": "Quarterly sales"})).unwrap();
//!
//! let pdf = report.to_pdf().unwrap();
//! assert!(pdf.starts_with(b"%PDF-1.7"));
//! ```

pub mod barcode;
pub mod codec;
pub mod data;
pub mod error;
pub mod font;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod text;

use serde_json::{Map, Value};

use codec::Definition;
use data::DataStore;
use error::ReportError;
use layout::{LayoutEngine, LayoutPage};
use model::{ElementId, ElementKind, ElementTree, Parent, ReportConfig};
use pdf::PdfWriter;

/// A report definition together with its data.
///
/// Build one with [`Report::new`] and [`Report::append`], or load one with
/// [`Report::from_json`] / [`Report::from_xml`]. Layout borrows the report
/// immutably, so the tree cannot change while pages are being computed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    config: ReportConfig,
    tree: ElementTree,
    data: DataStore,
}

impl Report {
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            tree: ElementTree::new(),
            data: DataStore::new(),
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub fn data(&self) -> &DataStore {
        &self.data
    }

    /// Append an element of type `kind` (`row`, `cell`, `datagrid`, ...)
    /// under a section or a previously appended element. `properties` is an
    /// object of loosely typed values, or null. An unknown type or a nesting
    /// the parent does not accept fails with `InvalidElement` and leaves the
    /// tree unchanged.
    pub fn append(
        &mut self,
        parent: impl Into<Parent>,
        kind: &str,
        properties: &Value,
    ) -> Result<ElementId, ReportError> {
        let parent = parent.into();
        let kind = ElementKind::parse(kind).ok_or_else(|| ReportError::InvalidElement {
            parent: self.tree.describe(parent),
            child: kind.to_string(),
        })?;
        let empty = Map::new();
        let properties = match properties {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ReportError::InvalidDefinition(format!(
                    "properties of `{kind}` must be an object, found `{other}`"
                )))
            }
        };
        self.tree.append(parent, kind, properties)
    }

    /// Bind `value` to `key`, replacing any earlier value.
    pub fn set_data(&mut self, key: &str, value: &Value) -> Result<(), ReportError> {
        self.data.set(key, value)
    }

    /// Mutable access for the typed setters (`set_text`, `set_map`,
    /// `set_list`).
    pub fn data_mut(&mut self) -> &mut DataStore {
        &mut self.data
    }

    /// Lay the report out into pages.
    pub fn layout(&self) -> Result<Vec<LayoutPage>, ReportError> {
        LayoutEngine::new(&self.tree, &self.data, &self.config).layout()
    }

    pub fn to_pdf(&self) -> Result<Vec<u8>, ReportError> {
        let pages = self.layout()?;
        pdf::render_pages(&pages, PdfWriter::new(&self.config.metadata))
    }

    /// The PDF as `data:application/pdf;filename=...;base64,...`.
    pub fn to_data_url(&self, filename: &str) -> Result<String, ReportError> {
        Ok(codec::data_url::encode(&self.to_pdf()?, filename))
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        codec::json::write(&self.config, &self.tree, &self.data)
    }

    pub fn from_json(input: &str) -> Result<Self, ReportError> {
        codec::json::read(input).map(Self::from)
    }

    pub fn to_xml(&self) -> Result<String, ReportError> {
        codec::xml::write(&self.config, &self.tree, &self.data)
    }

    pub fn from_xml(input: &str) -> Result<Self, ReportError> {
        codec::xml::read(input).map(Self::from)
    }
}

impl From<Definition> for Report {
    fn from(def: Definition) -> Self {
        Self {
            config: def.config,
            tree: def.tree,
            data: def.data,
        }
    }
}

/// Render a JSON definition straight to PDF bytes.
pub fn render_json(json: &str) -> Result<Vec<u8>, ReportError> {
    Report::from_json(json)?.to_pdf()
}
