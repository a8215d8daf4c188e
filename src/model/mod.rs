//! # Report Model
//!
//! A report is three fixed sections (header, details, footer), each an
//! ordered list of elements. Rows hold cells, images and barcodes; datagrids
//! hold columns. Everything else is a leaf.
//!
//! Elements live in an arena owned by [`ElementTree`]. [`ElementTree::append`]
//! returns an [`ElementId`] that stays valid for the life of the tree and can
//! be used as the parent of later appends. There are no back-pointers: the
//! parent relation is recorded as an index.
//!
//! Properties are validated and typed when an element is appended (see
//! [`props`]), so the layout engine never has to re-check them.

pub mod config;
pub mod props;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReportError;
pub use config::{Margins, Metadata, Orientation, PageSize, ReportConfig};
pub use props::Properties;

/// The three fixed roots of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Header,
    Details,
    Footer,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Header, Section::Details, Section::Footer];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "header" => Some(Section::Header),
            "details" => Some(Section::Details),
            "footer" => Some(Section::Footer),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Section::Header => "header",
            Section::Details => "details",
            Section::Footer => "footer",
        }
    }
}

/// Element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Row,
    Cell,
    Image,
    Barcode,
    Datagrid,
    Column,
    Html,
    Vgap,
    Hline,
}

impl ElementKind {
    pub const ALL: [ElementKind; 9] = [
        ElementKind::Row,
        ElementKind::Cell,
        ElementKind::Image,
        ElementKind::Barcode,
        ElementKind::Datagrid,
        ElementKind::Column,
        ElementKind::Html,
        ElementKind::Vgap,
        ElementKind::Hline,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.name() == lower)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Row => "row",
            ElementKind::Cell => "cell",
            ElementKind::Image => "image",
            ElementKind::Barcode => "barcode",
            ElementKind::Datagrid => "datagrid",
            ElementKind::Column => "column",
            ElementKind::Html => "html",
            ElementKind::Vgap => "vgap",
            ElementKind::Hline => "hline",
        }
    }

    /// Kinds allowed directly inside a section.
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            ElementKind::Row
                | ElementKind::Datagrid
                | ElementKind::Vgap
                | ElementKind::Hline
                | ElementKind::Html
        )
    }

    /// Whether `child` may be appended to an element of this kind.
    pub fn accepts(&self, child: ElementKind) -> bool {
        match self {
            ElementKind::Row => matches!(
                child,
                ElementKind::Cell | ElementKind::Image | ElementKind::Barcode
            ),
            ElementKind::Datagrid => child == ElementKind::Column,
            _ => false,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, ElementKind::Row | ElementKind::Datagrid)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stable handle to an element in an [`ElementTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Where to append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Section(Section),
    Element(ElementId),
}

impl From<Section> for Parent {
    fn from(section: Section) -> Self {
        Parent::Section(section)
    }
}

impl From<ElementId> for Parent {
    fn from(id: ElementId) -> Self {
        Parent::Element(id)
    }
}

/// One node of the tree.
#[derive(Debug, Clone)]
pub struct Element {
    pub props: Properties,
    pub children: Vec<ElementId>,
    pub section: Section,
    pub parent: Option<ElementId>,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        self.props.kind()
    }
}

/// Arena of elements plus the three section roots.
#[derive(Debug, Clone, Default)]
pub struct ElementTree {
    nodes: Vec<Element>,
    header: Vec<ElementId>,
    details: Vec<ElementId>,
    footer: Vec<ElementId>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element built from a loose property map.
    pub fn append(
        &mut self,
        parent: impl Into<Parent>,
        kind: ElementKind,
        properties: &Map<String, Value>,
    ) -> Result<ElementId, ReportError> {
        let parent = parent.into();
        self.check_nesting(parent, kind)?;
        let props = Properties::from_map(kind, properties)?;
        self.push(parent, props)
    }

    /// Append an element with already typed properties.
    pub fn append_props(
        &mut self,
        parent: impl Into<Parent>,
        props: Properties,
    ) -> Result<ElementId, ReportError> {
        let parent = parent.into();
        self.check_nesting(parent, props.kind())?;
        self.push(parent, props)
    }

    fn check_nesting(&self, parent: Parent, kind: ElementKind) -> Result<(), ReportError> {
        let allowed = match parent {
            Parent::Section(_) => kind.is_block(),
            Parent::Element(id) => match self.nodes.get(id.0) {
                Some(node) => node.kind().accepts(kind),
                None => {
                    return Err(ReportError::InvalidElement {
                        parent: format!("unknown element #{}", id.0),
                        child: kind.name().to_string(),
                    })
                }
            },
        };
        if allowed {
            Ok(())
        } else {
            Err(ReportError::InvalidElement {
                parent: self.describe(parent),
                child: kind.name().to_string(),
            })
        }
    }

    fn push(&mut self, parent: Parent, props: Properties) -> Result<ElementId, ReportError> {
        let id = ElementId(self.nodes.len());
        let (section, parent_id) = match parent {
            Parent::Section(section) => (section, None),
            Parent::Element(pid) => (self.nodes[pid.0].section, Some(pid)),
        };
        log::debug!(
            "append {} #{} to {}",
            props.kind(),
            id.0,
            self.describe(parent)
        );
        self.nodes.push(Element {
            props,
            children: Vec::new(),
            section,
            parent: parent_id,
        });
        match parent {
            Parent::Section(section) => self.section_mut(section).push(id),
            Parent::Element(pid) => self.nodes[pid.0].children.push(id),
        }
        Ok(id)
    }

    /// Human-readable name of `parent`, for error messages.
    pub fn describe(&self, parent: Parent) -> String {
        match parent {
            Parent::Section(section) => format!("section `{}`", section.name()),
            Parent::Element(id) => match self.nodes.get(id.0) {
                Some(node) => format!("`{}` #{}", node.kind(), id.0),
                None => format!("unknown element #{}", id.0),
            },
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut Vec<ElementId> {
        match section {
            Section::Header => &mut self.header,
            Section::Details => &mut self.details,
            Section::Footer => &mut self.footer,
        }
    }

    /// Top-level elements of a section, in order.
    pub fn section(&self, section: Section) -> &[ElementId] {
        match section {
            Section::Header => &self.header,
            Section::Details => &self.details,
            Section::Footer => &self.footer,
        }
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    /// Children of `id`, in order. Empty for leaves and unknown ids.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn subtree_eq(&self, a: ElementId, other: &ElementTree, b: ElementId) -> bool {
        match (self.get(a), other.get(b)) {
            (Some(x), Some(y)) => {
                x.props == y.props
                    && x.children.len() == y.children.len()
                    && x.children
                        .iter()
                        .zip(&y.children)
                        .all(|(&ca, &cb)| self.subtree_eq(ca, other, cb))
            }
            _ => false,
        }
    }
}

/// Structural equality: same sections, same element kinds and properties in
/// the same order. Arena indices do not matter.
impl PartialEq for ElementTree {
    fn eq(&self, other: &Self) -> bool {
        Section::ALL.into_iter().all(|section| {
            let a = self.section(section);
            let b = other.section(section);
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(&x, &y)| self.subtree_eq(x, other, y))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_append_builds_ordered_children() {
        let mut tree = ElementTree::new();
        let row = tree
            .append(Section::Details, ElementKind::Row, &props(json!({"height": 10})))
            .unwrap();
        let a = tree
            .append(row, ElementKind::Cell, &props(json!({"value": "a"})))
            .unwrap();
        let b = tree
            .append(row, ElementKind::Cell, &props(json!({"value": "b"})))
            .unwrap();
        assert_eq!(tree.children(row), &[a, b]);
        assert_eq!(tree.section(Section::Details), &[row]);
        assert_eq!(tree.get(a).map(|e| e.parent), Some(Some(row)));
        assert_eq!(tree.get(b).map(|e| e.section), Some(Section::Details));
    }

    #[test]
    fn test_invalid_nesting_is_rejected() {
        let mut tree = ElementTree::new();
        let row = tree
            .append(Section::Header, ElementKind::Row, &Map::new())
            .unwrap();
        let cell = tree.append(row, ElementKind::Cell, &Map::new()).unwrap();

        for (parent, kind) in [
            (Parent::Element(row), ElementKind::Column),
            (Parent::Element(cell), ElementKind::Cell),
            (Parent::Section(Section::Footer), ElementKind::Cell),
            (Parent::Section(Section::Details), ElementKind::Column),
            (Parent::Element(ElementId(99)), ElementKind::Cell),
        ] {
            let err = tree.append(parent, kind, &Map::new()).unwrap_err();
            assert!(
                matches!(err, ReportError::InvalidElement { .. }),
                "{parent:?} <- {kind}"
            );
        }
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_datagrid_takes_columns_only() {
        let mut tree = ElementTree::new();
        let grid = tree
            .append(Section::Details, ElementKind::Datagrid, &Map::new())
            .unwrap();
        assert!(tree.append(grid, ElementKind::Column, &Map::new()).is_ok());
        assert!(tree.append(grid, ElementKind::Row, &Map::new()).is_err());
    }

    #[test]
    fn test_structural_equality_ignores_arena_order() {
        let mut first = ElementTree::new();
        let r1 = first
            .append(Section::Details, ElementKind::Row, &Map::new())
            .unwrap();
        first
            .append(Section::Footer, ElementKind::Vgap, &props(json!({"height": 2})))
            .unwrap();
        first
            .append(r1, ElementKind::Cell, &props(json!({"value": "x"})))
            .unwrap();

        let mut second = ElementTree::new();
        second
            .append(Section::Footer, ElementKind::Vgap, &props(json!({"height": "2"})))
            .unwrap();
        let r2 = second
            .append(Section::Details, ElementKind::Row, &Map::new())
            .unwrap();
        second
            .append(r2, ElementKind::Cell, &props(json!({"value": "x"})))
            .unwrap();

        assert_eq!(first, second);

        second
            .append(r2, ElementKind::Cell, &props(json!({"value": "y"})))
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(ElementKind::parse("DataGrid"), Some(ElementKind::Datagrid));
        assert_eq!(ElementKind::parse("table"), None);
    }
}
