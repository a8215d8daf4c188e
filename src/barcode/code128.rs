//! Code 128 encoder.
//!
//! Picks code sets automatically: set C for runs of digits, set A when control
//! characters show up before any lowercase letter, set B otherwise. Every
//! symbol carries the mandatory mod-103 check value.

use super::{EncodeError, LinearSymbol};

const SYMBOLOGY: &str = "Code128";

/// Bar/space widths for symbol values 0..=105. Each pattern is 11 modules.
const PATTERNS: [&str; 106] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232",
];

const STOP: &str = "2331112";

const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;
const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

/// Encode ASCII text as Code 128.
pub fn encode(value: &str) -> Result<LinearSymbol, EncodeError> {
    let values = symbol_values(value)?;

    let mut runs = Vec::with_capacity(values.len() * 6 + 7);
    for &v in &values {
        runs.extend(PATTERNS[v as usize].bytes().map(|b| b - b'0'));
    }
    runs.extend(STOP.bytes().map(|b| b - b'0'));

    Ok(LinearSymbol {
        runs,
        text: value.to_string(),
    })
}

/// Symbol values from start code through check value (stop excluded).
pub fn symbol_values(value: &str) -> Result<Vec<u8>, EncodeError> {
    let chars: Vec<char> = value.chars().collect();
    if chars.is_empty() {
        return Err(EncodeError::InvalidLength {
            symbology: SYMBOLOGY,
            length: 0,
            expected: "at least one character",
        });
    }
    let bytes: Vec<u8> = chars
        .iter()
        .enumerate()
        .map(|(position, &ch)| {
            if ch.is_ascii() {
                Ok(ch as u8)
            } else {
                Err(EncodeError::UnsupportedCharacter {
                    symbology: SYMBOLOGY,
                    ch,
                    position,
                })
            }
        })
        .collect::<Result<_, _>>()?;

    let len = bytes.len();
    let mut values = Vec::with_capacity(len + 3);

    let first_run = digit_run(&bytes, 0);
    let mut set = if first_run >= 4 || (first_run == len && first_run % 2 == 0) {
        CodeSet::C
    } else {
        text_set_for(&bytes[0..])
    };
    values.push(match set {
        CodeSet::A => START_A,
        CodeSet::B => START_B,
        CodeSet::C => START_C,
    });

    let mut i = 0;
    while i < len {
        if set == CodeSet::C {
            if digit_run(&bytes, i) >= 2 {
                values.push((bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0'));
                i += 2;
                continue;
            }
            set = text_set_for(&bytes[i..]);
            values.push(if set == CodeSet::A { CODE_A } else { CODE_B });
            continue;
        }

        let run = digit_run(&bytes, i);
        if run >= 6 || (run >= 4 && i + run == len) {
            // Odd runs keep their first digit in the current set.
            if run % 2 == 1 {
                values.push(text_value(set, bytes[i]));
                i += 1;
            }
            set = CodeSet::C;
            values.push(CODE_C);
            continue;
        }

        let b = bytes[i];
        if !encodable(set, b) {
            set = if set == CodeSet::A { CodeSet::B } else { CodeSet::A };
            values.push(if set == CodeSet::A { CODE_A } else { CODE_B });
        }
        values.push(text_value(set, b));
        i += 1;
    }

    let checksum = values
        .iter()
        .enumerate()
        .map(|(pos, &v)| v as u32 * (pos.max(1)) as u32)
        .sum::<u32>()
        % 103;
    values.push(checksum as u8);

    Ok(values)
}

fn digit_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Set A if a control character appears before any lowercase letter.
fn text_set_for(rest: &[u8]) -> CodeSet {
    for &b in rest {
        if b < 32 {
            return CodeSet::A;
        }
        if b >= 96 {
            return CodeSet::B;
        }
    }
    CodeSet::B
}

fn encodable(set: CodeSet, b: u8) -> bool {
    match set {
        CodeSet::A => b < 96,
        CodeSet::B => b >= 32,
        CodeSet::C => b.is_ascii_digit(),
    }
}

fn text_value(set: CodeSet, b: u8) -> u8 {
    match set {
        CodeSet::A if b < 32 => b + 64,
        _ => b - 32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_is_eleven_modules() {
        for (value, pattern) in PATTERNS.iter().enumerate() {
            let sum: u32 = pattern.bytes().map(|b| (b - b'0') as u32).sum();
            assert_eq!(sum, 11, "value {value}");
        }
        let stop: u32 = STOP.bytes().map(|b| (b - b'0') as u32).sum();
        assert_eq!(stop, 13);
    }

    #[test]
    fn hello_uses_set_b_with_known_checksum() {
        let values = symbol_values("Hello").unwrap();
        assert_eq!(values, vec![START_B, 40, 69, 76, 76, 79, 76]);
    }

    #[test]
    fn leading_digits_start_in_set_c() {
        let values = symbol_values("1234567890ABCDEF").unwrap();
        assert_eq!(values[0], START_C);
        assert_eq!(&values[1..6], &[12, 34, 56, 78, 90]);
        assert_eq!(values[6], CODE_B);
        assert_eq!(values[7], b'A' - 32);
    }

    #[test]
    fn odd_digit_run_keeps_first_digit_in_text_set() {
        let values = symbol_values("X1234567").unwrap();
        // X, 1 in set B, then CODE C and three pairs
        assert_eq!(&values[..4], &[START_B, b'X' - 32, b'1' - 32, CODE_C]);
        assert_eq!(&values[4..7], &[23, 45, 67]);
    }

    #[test]
    fn control_characters_select_set_a() {
        let values = symbol_values("A\tB").unwrap();
        assert_eq!(values[0], START_A);
        assert_eq!(values[2], b'\t' + 64);
    }

    #[test]
    fn symbol_width_is_consistent() {
        let symbol = encode("Hello").unwrap();
        // start + 5 chars + check = 7 symbols of 11 modules, stop is 13
        assert_eq!(symbol.module_count(), 7 * 11 + 13);
        assert_eq!(symbol.text, "Hello");
    }

    #[test]
    fn rejects_non_ascii() {
        let err = encode("Grüße").unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnsupportedCharacter {
                symbology: "Code128",
                ch: 'ü',
                position: 2,
            }
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            encode(""),
            Err(EncodeError::InvalidLength { .. })
        ));
    }
}
