//! Report-wide settings: page size and orientation, margins, base font and
//! document metadata. Fixed when the report is created.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Page orientation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    #[serde(alias = "p", alias = "P")]
    Portrait,
    #[serde(alias = "l", alias = "L")]
    Landscape,
}

impl Orientation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "p" | "portrait" => Some(Orientation::Portrait),
            "l" | "landscape" => Some(Orientation::Landscape),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

/// Standard page sizes, portrait dimensions in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum PageSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in millimetres.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A3 => (297.0, 420.0),
            PageSize::A4 => (210.0, 297.0),
            PageSize::A5 => (148.0, 210.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Legal => (215.9, 355.6),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }

    /// Accepts the names above (any case) or `WIDTHxHEIGHT` in millimetres.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.to_ascii_uppercase().as_str() {
            "A3" => return Some(PageSize::A3),
            "A4" => return Some(PageSize::A4),
            "A5" => return Some(PageSize::A5),
            "LETTER" => return Some(PageSize::Letter),
            "LEGAL" => return Some(PageSize::Legal),
            _ => {}
        }
        let (w, h) = value.split_once(['x', 'X'])?;
        let width: f64 = w.trim().parse().ok()?;
        let height: f64 = h.trim().parse().ok()?;
        (width > 0.0 && height > 0.0).then_some(PageSize::Custom { width, height })
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::A3 => f.write_str("A3"),
            PageSize::A4 => f.write_str("A4"),
            PageSize::A5 => f.write_str("A5"),
            PageSize::Letter => f.write_str("Letter"),
            PageSize::Legal => f.write_str("Legal"),
            PageSize::Custom { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

impl Serialize for PageSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PageSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        PageSize::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown page size `{text}`")))
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

impl Default for Margins {
    fn default() -> Self {
        Margins::symmetric(12.0, 10.0)
    }
}

/// Document metadata written to the PDF Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
}

/// Report configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfig {
    pub orientation: Orientation,
    pub page_size: PageSize,
    /// `Helvetica` or `Courier`; anything else is set in Helvetica.
    pub font_family: String,
    /// Default font size in points.
    pub font_size: f64,
    pub margins: Margins,
    pub metadata: Metadata,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            page_size: PageSize::A4,
            font_family: "Helvetica".to_string(),
            font_size: 10.0,
            margins: Margins::default(),
            metadata: Metadata::default(),
        }
    }
}

impl ReportConfig {
    /// A config for the given orientation and page size, otherwise default.
    pub fn new(orientation: Orientation, page_size: PageSize) -> Self {
        Self {
            orientation,
            page_size,
            ..Default::default()
        }
    }

    /// Page (width, height) in millimetres after orientation.
    pub fn page_dimensions(&self) -> (f64, f64) {
        let (w, h) = self.page_size.dimensions();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landscape_swaps_dimensions() {
        let config = ReportConfig::new(Orientation::Landscape, PageSize::A4);
        assert_eq!(config.page_dimensions(), (297.0, 210.0));
        assert_eq!(ReportConfig::default().page_dimensions(), (210.0, 297.0));
    }

    #[test]
    fn test_page_size_parse() {
        assert_eq!(PageSize::parse("a5"), Some(PageSize::A5));
        assert_eq!(
            PageSize::parse("100x50"),
            Some(PageSize::Custom {
                width: 100.0,
                height: 50.0
            })
        );
        assert_eq!(PageSize::parse("B7"), None);
    }

    #[test]
    fn test_config_from_json() {
        let config: ReportConfig = serde_json::from_str(
            r#"{"orientation": "l", "pageSize": "Letter", "fontSize": 9,
                "metadata": {"title": "Go Report"}}"#,
        )
        .unwrap();
        assert_eq!(config.orientation, Orientation::Landscape);
        assert_eq!(config.page_size, PageSize::Letter);
        assert_eq!(config.font_size, 9.0);
        assert_eq!(config.font_family, "Helvetica");
        assert_eq!(config.metadata.title.as_deref(), Some("Go Report"));
    }
}
