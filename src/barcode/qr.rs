//! QR code, backed by the `qrcode` crate.

use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};

use super::{EncodeError, MatrixSymbol, QrEcc};

const SYMBOLOGY: &str = "QR";

/// Encode `value` (as UTF-8 bytes) at the given error correction level.
pub fn encode(value: &str, ecc: QrEcc) -> Result<MatrixSymbol, EncodeError> {
    let level = match ecc {
        QrEcc::L => EcLevel::L,
        QrEcc::M => EcLevel::M,
        QrEcc::Q => EcLevel::Q,
        QrEcc::H => EcLevel::H,
    };

    let code = QrCode::with_error_correction_level(value.as_bytes(), level).map_err(|e| {
        log::debug!("QR encoding failed: {e}");
        match e {
            QrError::DataTooLong => EncodeError::InvalidLength {
                symbology: SYMBOLOGY,
                length: value.len(),
                expected: "data that fits a version 40 symbol at this correction level",
            },
            _ => EncodeError::InvalidLength {
                symbology: SYMBOLOGY,
                length: value.len(),
                expected: "data the QR encoder accepts",
            },
        }
    })?;

    let size = code.width();
    let modules = code
        .to_colors()
        .into_iter()
        .map(|c| c == Color::Dark)
        .collect();
    Ok(MatrixSymbol { size, modules })
}
