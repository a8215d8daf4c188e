//! # Font Management
//!
//! Reports are set in the standard PDF fonts, which need no embedding.
//! Helvetica and Courier are available in all four style variants; any other
//! family name falls back to Helvetica so that measured and drawn text agree.

pub mod metrics;

pub use metrics::StandardFontMetrics;
use std::collections::HashMap;

use crate::style::FontStyle;
use crate::text::TextLayout;

/// Millimetres per typographic point.
pub const MM_PER_PT: f64 = 25.4 / 72.0;

/// Line height as a multiple of the font size.
pub const LINE_SPACING: f64 = 1.4;

/// The standard faces the engine draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            Self::Helvetica | Self::HelveticaOblique => metrics::HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => metrics::HELVETICA_BOLD,
            _ => metrics::COURIER,
        }
    }
}

/// A face at a size (points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub face: StandardFont,
    pub size: f64,
}

impl Font {
    /// Width of `text` in millimetres.
    pub fn measure(&self, text: &str) -> f64 {
        self.face.metrics().measure_string(text, self.size) * MM_PER_PT
    }

    pub fn char_width(&self, ch: char) -> f64 {
        self.face.metrics().char_width(ch, self.size) * MM_PER_PT
    }

    /// Height of one line of text in millimetres.
    pub fn line_height(&self) -> f64 {
        line_height(self.size)
    }
}

pub fn line_height(font_size: f64) -> f64 {
    font_size * MM_PER_PT * LINE_SPACING
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

/// Maps family + style to a standard face.
pub struct FontRegistry {
    fonts: HashMap<FontKey, StandardFont>,
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FontRegistry {
    pub fn new() -> Self {
        let standard_mappings = [
            (("helvetica", false, false), StandardFont::Helvetica),
            (("helvetica", true, false), StandardFont::HelveticaBold),
            (("helvetica", false, true), StandardFont::HelveticaOblique),
            (("helvetica", true, true), StandardFont::HelveticaBoldOblique),
            (("courier", false, false), StandardFont::Courier),
            (("courier", true, false), StandardFont::CourierBold),
            (("courier", false, true), StandardFont::CourierOblique),
            (("courier", true, true), StandardFont::CourierBoldOblique),
        ];

        let fonts = standard_mappings
            .into_iter()
            .map(|((family, bold, italic), font)| {
                (
                    FontKey {
                        family: family.to_string(),
                        bold,
                        italic,
                    },
                    font,
                )
            })
            .collect();

        Self { fonts }
    }

    /// Look up a face, falling back to Helvetica if the family is unknown.
    pub fn resolve(&self, family: &str, bold: bool, italic: bool) -> StandardFont {
        let key = FontKey {
            family: family.trim().to_ascii_lowercase(),
            bold,
            italic,
        };
        if let Some(font) = self.fonts.get(&key) {
            return *font;
        }
        log::debug!("font family `{family}` is not available, using Helvetica");
        match (bold, italic) {
            (false, false) => StandardFont::Helvetica,
            (true, false) => StandardFont::HelveticaBold,
            (false, true) => StandardFont::HelveticaOblique,
            (true, true) => StandardFont::HelveticaBoldOblique,
        }
    }
}

/// Shared font context used by layout. Provides the text measurement
/// capability the layout engine relies on.
pub struct FontContext {
    registry: FontRegistry,
    text_layout: TextLayout,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::new(),
            text_layout: TextLayout::new(),
        }
    }

    /// Resolve a family and style into a concrete font.
    pub fn font(&self, family: &str, style: FontStyle, size: f64) -> Font {
        Font {
            face: self.registry.resolve(family, style.bold, style.italic),
            size,
        }
    }

    /// Number of lines `text` wraps to inside `width` millimetres.
    pub fn line_count(&self, text: &str, font: Font, width: f64) -> usize {
        self.text_layout.break_into_lines(text, font, width).len()
    }

    /// The line breaker shared by every measurement in a layout run.
    pub fn text_layout(&self) -> &TextLayout {
        &self.text_layout
    }

    pub fn registry(&self) -> &FontRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let font = ctx.font("Helvetica", FontStyle::default(), 12.0);
        let w = font.face.metrics().char_width(' ', 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.font("Helvetica", FontStyle::default(), 12.0);
        let bold = ctx.font("Helvetica", FontStyle::BOLD, 12.0);
        assert!(bold.char_width('A') > regular.char_width('A'));
        assert_eq!(bold.face.pdf_name(), "Helvetica-Bold");
    }

    #[test]
    fn test_font_context_fallback() {
        let ctx = FontContext::new();
        let arial = ctx.font("Arial", FontStyle::default(), 12.0);
        assert_eq!(arial.face, StandardFont::Helvetica);
        let courier = ctx.font("COURIER", FontStyle::default(), 12.0);
        assert_eq!(courier.face, StandardFont::Courier);
    }

    #[test]
    fn test_line_height_in_mm() {
        // 10pt at 1.4 spacing
        assert!((line_height(10.0) - 4.938_888).abs() < 1e-5);
    }

    #[test]
    fn test_line_count() {
        let ctx = FontContext::new();
        let font = ctx.font("Helvetica", FontStyle::default(), 10.0);
        assert_eq!(ctx.line_count("short", font, 100.0), 1);
        assert!(ctx.line_count("several words that cannot fit", font, 15.0) > 1);
    }

    #[test]
    fn test_line_count_matches_shared_layout() {
        let ctx = FontContext::new();
        let font = ctx.font("Courier", FontStyle::default(), 10.0);
        let text = "one two three four five six seven";
        for width in [10.0, 25.0, 60.0] {
            let lines = ctx.text_layout().break_into_lines(text, font, width);
            assert_eq!(ctx.line_count(text, font, width), lines.len());
        }
    }
}
