//! Lenient value coercion.
//!
//! Element properties arrive as loosely typed JSON (or as XML attribute
//! text). These helpers turn any scalar into the wanted type and fall back to
//! "unset" instead of failing, so a bad value never rejects a definition.
//! Use them through serde:
//!
//! ```ignore
//! #[serde(default, deserialize_with = "loose::option")]
//! pub font_size: Option<f64>,
//! ```

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{Align, Borders, Color, Dimension, FontStyle};
use crate::barcode::{CodeType, QrEcc};

/// Types that can be read from a loosely typed value.
pub trait Loose: Sized {
    fn from_loose(value: &Value) -> Option<Self>;
}

/// Render any value as text. Numbers drop a trailing `.0`; null is empty.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Shortest text form of a number: `40.0` becomes `"40"`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Booleans, `1`/`0`, and the usual spellings of true and false.
pub fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f == 1.0),
        Value::String(s) => match s.trim() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" | "yes" => Some(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn to_color(value: &Value) -> Option<Color> {
    match value {
        Value::String(s) => Color::parse(s),
        Value::Number(n) => n.as_f64().and_then(Color::from_level),
        _ => None,
    }
}

impl Loose for String {
    fn from_loose(value: &Value) -> Option<Self> {
        Some(to_string(value))
    }
}

impl Loose for f64 {
    fn from_loose(value: &Value) -> Option<Self> {
        to_float(value)
    }
}

impl Loose for u32 {
    fn from_loose(value: &Value) -> Option<Self> {
        to_int(value).and_then(|i| u32::try_from(i).ok())
    }
}

impl Loose for bool {
    fn from_loose(value: &Value) -> Option<Self> {
        to_bool(value)
    }
}

impl Loose for Color {
    fn from_loose(value: &Value) -> Option<Self> {
        to_color(value)
    }
}

impl Loose for Dimension {
    fn from_loose(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(Dimension::Absolute),
            Value::String(s) => Dimension::parse(s),
            _ => None,
        }
    }
}

macro_rules! loose_from_str {
    ($($ty:ty),*) => {
        $(
            impl Loose for $ty {
                fn from_loose(value: &Value) -> Option<Self> {
                    <$ty>::parse(&to_string(value))
                }
            }
        )*
    };
}

loose_from_str!(Align, FontStyle, Borders, CodeType, QrEcc);

/// Deserialize an optional property. Values that cannot be coerced are
/// dropped (and logged) rather than rejected.
pub fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Loose,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    let parsed = T::from_loose(&value);
    if parsed.is_none() {
        log::debug!("ignoring property value {value} that cannot be coerced");
    }
    Ok(parsed)
}

/// Deserialize a property with a default.
pub fn value<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Loose + Default,
{
    option(deserializer).map(Option::unwrap_or_default)
}
