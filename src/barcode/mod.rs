//! # Symbol Encoders
//!
//! Pure functions that turn a string into a renderable barcode symbol.
//!
//! Linear symbologies produce a run-length pattern of bar and space widths
//! (in modules, first run is always a bar). QR produces a square module
//! matrix. Both share [`encode`] as the entry point so the layout engine can
//! treat every `barcode` element the same way:
//!
//! ```
//! use folio::barcode::{encode, CodeType, EncodeOptions, Symbol};
//!
//! let symbol = encode(CodeType::Ean, "9638507", &EncodeOptions::default()).unwrap();
//! match symbol {
//!     Symbol::Linear(linear) => assert_eq!(linear.text, "96385074"),
//!     Symbol::Matrix(_) => unreachable!(),
//! }
//! ```
//!
//! Encoders never consult the data store. Callers resolve bindings first.

pub mod code128;
pub mod code39;
pub mod ean;
pub mod itf;
pub mod qr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the symbol encoders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{symbology} cannot encode {ch:?} at position {position}")]
    UnsupportedCharacter {
        symbology: &'static str,
        ch: char,
        position: usize,
    },
    #[error("{symbology} input has length {length}, expected {expected}")]
    InvalidLength {
        symbology: &'static str,
        length: usize,
        expected: &'static str,
    },
    #[error("{symbology} check digit mismatch: found {found}, computed {computed}")]
    InvalidChecksum {
        symbology: &'static str,
        found: char,
        computed: char,
    },
}

/// Supported symbologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    #[serde(rename = "CODE_128")]
    Code128,
    #[serde(rename = "CODE_39")]
    Code39,
    #[serde(rename = "ITF")]
    Interleaved2of5,
    #[serde(rename = "EAN")]
    Ean,
    #[serde(rename = "QR")]
    Qr,
}

impl CodeType {
    /// Parse the `code-type` property. Accepts the canonical names plus the
    /// common aliases seen in report definitions.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "CODE128" | "C128" => Some(CodeType::Code128),
            "CODE39" | "C39" => Some(CodeType::Code39),
            "ITF" | "I2OF5" | "I25" | "INTERLEAVED2OF5" => Some(CodeType::Interleaved2of5),
            "EAN" | "EAN8" | "EAN13" => Some(CodeType::Ean),
            "QR" | "QRCODE" => Some(CodeType::Qr),
            _ => None,
        }
    }

    /// Canonical property value, as written back by the definition codecs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Code128 => "CODE_128",
            CodeType::Code39 => "CODE_39",
            CodeType::Interleaved2of5 => "ITF",
            CodeType::Ean => "EAN",
            CodeType::Qr => "QR",
        }
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, CodeType::Qr)
    }
}

/// QR error correction level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QrEcc {
    L,
    #[default]
    M,
    Q,
    H,
}

impl QrEcc {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "L" => Some(QrEcc::L),
            "M" => Some(QrEcc::M),
            "Q" => Some(QrEcc::Q),
            "H" => Some(QrEcc::H),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QrEcc::L => "L",
            QrEcc::M => "M",
            QrEcc::Q => "Q",
            QrEcc::H => "H",
        }
    }
}

/// Per-call encoder options. Fields a symbology does not use are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Append the optional check character (Code39 mod 43, ITF mod 10).
    /// Code128 and EAN always carry their check digit.
    pub checksum: bool,
    /// Code39 full-ASCII mode.
    pub extended: bool,
    pub ecc: QrEcc,
}

/// A linear barcode as alternating bar/space run widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearSymbol {
    /// Run widths in modules. Even indices are bars, odd indices are spaces.
    pub runs: Vec<u8>,
    /// Human-readable interpretation (data plus visible check digit).
    pub text: String,
}

impl LinearSymbol {
    /// Total width in modules.
    pub fn module_count(&self) -> usize {
        self.runs.iter().map(|&r| r as usize).sum()
    }

    /// Expand the runs into one bool per module (`true` = bar).
    pub fn modules(&self) -> Vec<bool> {
        let mut out = Vec::with_capacity(self.module_count());
        for (i, &run) in self.runs.iter().enumerate() {
            let is_bar = i % 2 == 0;
            out.extend(std::iter::repeat(is_bar).take(run as usize));
        }
        out
    }

    /// Bars as `(start_module, width_modules)` pairs.
    pub fn bars(&self) -> Vec<(usize, usize)> {
        let mut bars = Vec::new();
        let mut pos = 0usize;
        for (i, &run) in self.runs.iter().enumerate() {
            if i % 2 == 0 {
                bars.push((pos, run as usize));
            }
            pos += run as usize;
        }
        bars
    }
}

/// A 2-D symbol: `size × size` modules, row-major, `true` = dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixSymbol {
    pub size: usize,
    pub modules: Vec<bool>,
}

impl MatrixSymbol {
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.size + x]
    }
}

/// The output of an encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Linear(LinearSymbol),
    Matrix(MatrixSymbol),
}

/// Encode `value` with the given symbology.
pub fn encode(
    code_type: CodeType,
    value: &str,
    options: &EncodeOptions,
) -> Result<Symbol, EncodeError> {
    match code_type {
        CodeType::Code128 => code128::encode(value).map(Symbol::Linear),
        CodeType::Code39 => code39::encode(value, options).map(Symbol::Linear),
        CodeType::Interleaved2of5 => itf::encode(value, options).map(Symbol::Linear),
        CodeType::Ean => ean::encode(value).map(Symbol::Linear),
        CodeType::Qr => qr::encode(value, options.ecc).map(Symbol::Matrix),
    }
}

/// Convert a narrow/wide pattern string (`n`/`w`) into run widths.
pub(crate) fn push_nw(runs: &mut Vec<u8>, pattern: &str, wide: u8) {
    for c in pattern.bytes() {
        runs.push(if c == b'w' { wide } else { 1 });
    }
}

/// Weighted mod-10 check digit used by EAN and ITF: weights 3,1,3,... from
/// the rightmost data digit.
pub(crate) fn mod10_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| d as u32 * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Parse an all-digit string, reporting the first offending character.
pub(crate) fn parse_digits(symbology: &'static str, value: &str) -> Result<Vec<u8>, EncodeError> {
    value
        .chars()
        .enumerate()
        .map(|(position, ch)| {
            ch.to_digit(10)
                .map(|d| d as u8)
                .ok_or(EncodeError::UnsupportedCharacter {
                    symbology,
                    ch,
                    position,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_type_aliases() {
        assert_eq!(CodeType::parse("CODE_128"), Some(CodeType::Code128));
        assert_eq!(CodeType::parse("code39"), Some(CodeType::Code39));
        assert_eq!(CodeType::parse("I2of5"), Some(CodeType::Interleaved2of5));
        assert_eq!(CodeType::parse("EAN-13"), Some(CodeType::Ean));
        assert_eq!(CodeType::parse("qrcode"), Some(CodeType::Qr));
        assert_eq!(CodeType::parse("PDF417"), None);
    }

    #[test]
    fn mod10_matches_ean_fixture() {
        assert_eq!(mod10_check_digit(&[9, 6, 3, 8, 5, 0, 7]), 4);
    }

    #[test]
    fn modules_expand_runs() {
        let symbol = LinearSymbol {
            runs: vec![2, 1, 1, 3],
            text: String::new(),
        };
        assert_eq!(
            symbol.modules(),
            vec![true, true, false, true, false, false, false]
        );
        assert_eq!(symbol.bars(), vec![(0, 2), (3, 1)]);
    }

    #[test]
    fn dispatch_routes_by_type() {
        let opts = EncodeOptions::default();
        assert!(matches!(
            encode(CodeType::Qr, "Hello", &opts),
            Ok(Symbol::Matrix(_))
        ));
        assert!(matches!(
            encode(CodeType::Code128, "Hello", &opts),
            Ok(Symbol::Linear(_))
        ));
    }
}
