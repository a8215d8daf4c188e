//! Interleaved 2 of 5.
//!
//! Digits are encoded in pairs: the first digit of a pair drives the bars,
//! the second the spaces. An odd number of digits (after the optional check
//! digit) is rejected with [`EncodeError::InvalidLength`]; the encoder never
//! pads with a leading zero.

use super::{mod10_check_digit, parse_digits, push_nw, EncodeError, EncodeOptions, LinearSymbol};

const SYMBOLOGY: &str = "ITF";
const WIDE: u8 = 3;

const DIGITS: [&str; 10] = [
    "nnwwn", "wnnnw", "nwnnw", "wwnnn", "nnwnw", "wnwnn", "nwwnn", "nnnww", "wnnwn", "nwnwn",
];

/// Encode a digit string as Interleaved 2 of 5.
pub fn encode(value: &str, options: &EncodeOptions) -> Result<LinearSymbol, EncodeError> {
    let mut digits = parse_digits(SYMBOLOGY, value)?;
    if options.checksum {
        digits.push(mod10_check_digit(&digits));
    }
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(EncodeError::InvalidLength {
            symbology: SYMBOLOGY,
            length: digits.len(),
            expected: if options.checksum {
                "an odd number of digits (the check digit makes it even)"
            } else {
                "an even, non-zero number of digits"
            },
        });
    }

    let mut runs = vec![1, 1, 1, 1];
    for pair in digits.chunks(2) {
        let bars = DIGITS[pair[0] as usize].as_bytes();
        let spaces = DIGITS[pair[1] as usize].as_bytes();
        for k in 0..5 {
            runs.push(if bars[k] == b'w' { WIDE } else { 1 });
            runs.push(if spaces[k] == b'w' { WIDE } else { 1 });
        }
    }
    push_nw(&mut runs, "wnn", WIDE);

    let text = digits.iter().map(|d| (b'0' + d) as char).collect();
    Ok(LinearSymbol { runs, text })
}
