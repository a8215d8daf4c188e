//! EAN-8 and EAN-13.
//!
//! Seven or twelve digits get their check digit appended; eight or thirteen
//! digits must already carry a correct one.

use super::{mod10_check_digit, parse_digits, EncodeError, LinearSymbol};

const SYMBOLOGY: &str = "EAN";

/// Left-hand odd parity (set A) patterns, 7 modules each.
const L_CODES: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
    "0110111", "0001011",
];

/// Left-hand even parity (set B) patterns.
const G_CODES: [&str; 10] = [
    "0100111", "0110011", "0011011", "0100001", "0011101", "0111001", "0000101", "0010001",
    "0001001", "0010111",
];

/// Right-hand patterns (set C).
const R_CODES: [&str; 10] = [
    "1110010", "1100110", "1101100", "1000010", "1011100", "1001110", "1010000", "1000100",
    "1001000", "1110100",
];

/// EAN-13 parity of the six left digits, selected by the leading digit.
const PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

const GUARD: &str = "101";
const CENTER: &str = "01010";

/// Encode an EAN-8 or EAN-13 symbol.
pub fn encode(value: &str) -> Result<LinearSymbol, EncodeError> {
    let digits = complete_digits(value)?;

    let mut bits = String::with_capacity(95);
    bits.push_str(GUARD);
    if digits.len() == 8 {
        for &d in &digits[..4] {
            bits.push_str(L_CODES[d as usize]);
        }
        bits.push_str(CENTER);
        for &d in &digits[4..] {
            bits.push_str(R_CODES[d as usize]);
        }
    } else {
        let parity = PARITY[digits[0] as usize].as_bytes();
        for (k, &d) in digits[1..7].iter().enumerate() {
            let table = if parity[k] == b'L' { &L_CODES } else { &G_CODES };
            bits.push_str(table[d as usize]);
        }
        bits.push_str(CENTER);
        for &d in &digits[7..] {
            bits.push_str(R_CODES[d as usize]);
        }
    }
    bits.push_str(GUARD);

    Ok(LinearSymbol {
        runs: runs_from_bits(&bits),
        text: digits.iter().map(|d| (b'0' + d) as char).collect(),
    })
}

/// Validate the input and return the full digit sequence including the
/// check digit.
pub fn complete_digits(value: &str) -> Result<Vec<u8>, EncodeError> {
    let mut digits = parse_digits(SYMBOLOGY, value)?;
    match digits.len() {
        7 | 12 => {
            digits.push(mod10_check_digit(&digits));
            Ok(digits)
        }
        8 | 13 => {
            let (data, check) = digits.split_at(digits.len() - 1);
            let computed = mod10_check_digit(data);
            if computed != check[0] {
                return Err(EncodeError::InvalidChecksum {
                    symbology: SYMBOLOGY,
                    found: (b'0' + check[0]) as char,
                    computed: (b'0' + computed) as char,
                });
            }
            Ok(digits)
        }
        length => Err(EncodeError::InvalidLength {
            symbology: SYMBOLOGY,
            length,
            expected: "7, 8, 12 or 13 digits",
        }),
    }
}

/// Collapse a module bit string (leading bar) into run widths.
fn runs_from_bits(bits: &str) -> Vec<u8> {
    let mut runs = Vec::new();
    let mut current = b'1';
    let mut width = 0u8;
    for b in bits.bytes() {
        if b == current {
            width += 1;
        } else {
            runs.push(width);
            current = b;
            width = 1;
        }
    }
    runs.push(width);
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ean8_appends_check_digit() {
        let symbol = encode("9638507").unwrap();
        assert_eq!(symbol.text, "96385074");
        // 3 + 4*7 + 5 + 4*7 + 3
        assert_eq!(symbol.module_count(), 67);
    }

    #[test]
    fn ean8_accepts_valid_full_code() {
        assert_eq!(encode("96385074").unwrap().text, "96385074");
    }

    #[test]
    fn ean13_fixture() {
        // 400638133393 -> check digit 1
        let symbol = encode("400638133393").unwrap();
        assert_eq!(symbol.text, "4006381333931");
        assert_eq!(symbol.module_count(), 95);
    }

    #[test]
    fn wrong_check_digit_is_rejected() {
        assert_eq!(
            encode("96385075").unwrap_err(),
            EncodeError::InvalidChecksum {
                symbology: "EAN",
                found: '5',
                computed: '4',
            }
        );
    }

    #[test]
    fn bad_lengths_are_rejected() {
        for value in ["", "123456", "1234567890", "12345678901234"] {
            assert!(
                matches!(encode(value), Err(EncodeError::InvalidLength { .. })),
                "{value}"
            );
        }
    }

    #[test]
    fn g_codes_mirror_r_codes() {
        for d in 0..10 {
            let reversed: String = R_CODES[d].chars().rev().collect();
            assert_eq!(G_CODES[d], reversed);
            let inverted: String = L_CODES[d]
                .chars()
                .map(|c| if c == '0' { '1' } else { '0' })
                .collect();
            assert_eq!(R_CODES[d], inverted);
        }
    }

    #[test]
    fn runs_start_with_guard_bar() {
        let symbol = encode("9638507").unwrap();
        assert_eq!(&symbol.runs[..3], &[1, 1, 1]);
    }
}
