//! PDF bytes as a `data:` URL, for embedding in web pages or JSON payloads.

use base64::Engine;

use crate::error::ReportError;

const PREFIX: &str = "data:application/pdf;";

/// `data:application/pdf;filename=<name>;base64,<bytes>`. Characters that
/// would end the parameter (`;`, `,`) are dropped from the file name.
pub fn encode(pdf: &[u8], filename: &str) -> String {
    let name: String = filename
        .chars()
        .filter(|c| !matches!(c, ';' | ',') && !c.is_control())
        .collect();
    format!(
        "{PREFIX}filename={name};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(pdf)
    )
}

/// The file name and bytes of a PDF data URL.
pub fn decode(url: &str) -> Result<(Option<String>, Vec<u8>), ReportError> {
    let invalid = |reason: &str| ReportError::Render(format!("invalid PDF data URL: {reason}"));
    let rest = url
        .trim()
        .strip_prefix(PREFIX)
        .ok_or_else(|| invalid("expected `data:application/pdf;`"))?;
    let (params, payload) = rest.split_once(',').ok_or_else(|| invalid("missing `,`"))?;

    let mut filename = None;
    let mut base64 = false;
    for param in params.split(';') {
        match param.split_once('=') {
            Some(("filename", name)) => filename = Some(name.to_string()),
            None if param == "base64" => base64 = true,
            _ => {}
        }
    }
    if !base64 {
        return Err(invalid("only base64 payloads are supported"));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| invalid(&e.to_string()))?;
    Ok((filename, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_format() {
        assert_eq!(
            encode(b"%PDF", "report.pdf"),
            "data:application/pdf;filename=report.pdf;base64,JVBERg=="
        );
    }

    #[test]
    fn test_filename_is_sanitized() {
        let url = encode(b"x", "a;b,c.pdf");
        assert!(url.starts_with("data:application/pdf;filename=abc.pdf;base64,"));
    }

    #[test]
    fn test_decode() {
        let url = encode(b"%PDF-1.7", "q1.pdf");
        let (name, bytes) = decode(&url).unwrap();
        assert_eq!(name.as_deref(), Some("q1.pdf"));
        assert_eq!(bytes, b"%PDF-1.7");
        assert!(decode("data:text/plain;base64,AA==").is_err());
    }
}
