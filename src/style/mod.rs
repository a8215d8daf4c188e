//! # Style Values
//!
//! The small set of visual property types a report element can carry:
//! colors, alignment, font style flags, border sides and widths.
//!
//! Definitions are loosely typed (a width may be `40`, `"40"` or `"50%"`, a
//! color may be `"#D8DBDA"` or the grey level `218`), so every type here has a
//! lenient parser, and [`loose`] provides the serde glue that applies those
//! parsers while deserializing element properties.

use serde::{Deserialize, Serialize, Serializer};

pub mod loose;

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn grey(level: u8) -> Self {
        Self::rgb(level, level, level)
    }

    /// Parse `#RRGGBB`, `#RGB`, or a grey level below 255.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return Self::from_hex(hex);
        }
        let level: f64 = value.parse().ok()?;
        Self::from_level(level)
    }

    /// Grey level from a number. 255 and above are rejected, as is anything
    /// negative or non-finite.
    pub fn from_level(level: f64) -> Option<Self> {
        if level.is_finite() && (0.0..255.0).contains(&level) {
            Some(Self::grey(level as u8))
        } else {
            None
        }
    }

    fn from_hex(hex: &str) -> Option<Self> {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Components in the 0.0–1.0 range used by PDF color operators.
    pub fn components(&self) -> (f64, f64, f64) {
        (
            self.r as f64 / 255.0,
            self.g as f64 / 255.0,
            self.b as f64 / 255.0,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Horizontal alignment of text or a symbol inside its box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "l" | "justify" | "j" => Some(Align::Left),
            "center" | "centre" | "c" | "middle" => Some(Align::Center),
            "right" | "r" => Some(Align::Right),
            _ => None,
        }
    }

    /// X offset of content `content_width` wide inside a box `box_width` wide.
    pub fn offset(&self, box_width: f64, content_width: f64) -> f64 {
        match self {
            Align::Left => 0.0,
            Align::Center => ((box_width - content_width) / 2.0).max(0.0),
            Align::Right => (box_width - content_width).max(0.0),
        }
    }
}

/// Font style flags. Definitions write these as words (`"bolditalic"`,
/// `"bold underline"`) or letters (`"BI"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl FontStyle {
    pub const BOLD: FontStyle = FontStyle {
        bold: true,
        italic: false,
        underline: false,
    };

    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.trim().to_ascii_lowercase();
        if lower.is_empty() || lower == "normal" || lower == "regular" {
            return Some(FontStyle::default());
        }
        let words = FontStyle {
            bold: lower.contains("bold"),
            italic: lower.contains("italic") || lower.contains("oblique"),
            underline: lower.contains("underline"),
        };
        if words != FontStyle::default() {
            return Some(words);
        }
        let mut letters = FontStyle::default();
        for c in lower.chars() {
            match c {
                'b' => letters.bold = true,
                'i' => letters.italic = true,
                'u' => letters.underline = true,
                ' ' | ',' | '-' => {}
                _ => return None,
            }
        }
        Some(letters)
    }

    pub fn is_plain(&self) -> bool {
        *self == FontStyle::default()
    }

    pub fn merge(self, other: FontStyle) -> FontStyle {
        FontStyle {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
        }
    }
}

impl std::fmt::Display for FontStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.bold {
            f.write_str("bold")?;
        }
        if self.italic {
            f.write_str("italic")?;
        }
        if self.underline {
            f.write_str("underline")?;
        }
        Ok(())
    }
}

impl Serialize for FontStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which sides of a box get a border line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Borders {
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl Borders {
    pub const ALL: Borders = Borders {
        left: true,
        top: true,
        right: true,
        bottom: true,
    };

    /// `"1"` draws every side, `"0"` none, otherwise any of the letters
    /// `L`, `T`, `R`, `B`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value {
            "" | "0" => return Some(Borders::default()),
            "1" => return Some(Borders::ALL),
            _ => {}
        }
        let mut sides = Borders::default();
        for c in value.chars() {
            match c.to_ascii_uppercase() {
                'L' => sides.left = true,
                'T' => sides.top = true,
                'R' => sides.right = true,
                'B' => sides.bottom = true,
                _ => return None,
            }
        }
        Some(sides)
    }

    pub fn is_none(&self) -> bool {
        *self == Borders::default()
    }
}

impl std::fmt::Display for Borders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Borders::ALL {
            return f.write_str("1");
        }
        if self.is_none() {
            return f.write_str("0");
        }
        for (on, letter) in [
            (self.left, "L"),
            (self.top, "T"),
            (self.right, "R"),
            (self.bottom, "B"),
        ] {
            if on {
                f.write_str(letter)?;
            }
        }
        Ok(())
    }
}

impl Serialize for Borders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An explicit width (or height) for an element. Absent means auto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    /// Millimetres.
    Absolute(f64),
    /// Percentage of the available space.
    Percent(f64),
}

impl Dimension {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(pct) = value.strip_suffix('%') {
            let pct: f64 = pct.trim().parse().ok()?;
            return (pct.is_finite() && pct >= 0.0).then_some(Dimension::Percent(pct));
        }
        let mm = value.strip_suffix("mm").unwrap_or(value).trim();
        let mm: f64 = mm.parse().ok()?;
        (mm.is_finite() && mm >= 0.0).then_some(Dimension::Absolute(mm))
    }

    /// Resolve against the available space.
    pub fn resolve(&self, available: f64) -> f64 {
        match self {
            Dimension::Absolute(mm) => *mm,
            Dimension::Percent(p) => available * p / 100.0,
        }
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Dimension::Absolute(mm) => serializer.serialize_f64(*mm),
            Dimension::Percent(p) => serializer.collect_str(&format_args!("{}%", loose::format_number(*p))),
        }
    }
}
