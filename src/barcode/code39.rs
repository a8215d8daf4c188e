//! Code 39 encoder, with optional full-ASCII (extended) mode and mod-43
//! check character.

use super::{push_nw, EncodeError, EncodeOptions, LinearSymbol};

const SYMBOLOGY: &str = "Code39";
const WIDE: u8 = 3;

/// Character set in check-value order.
const ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Bar/space patterns (bar first), indexed like `ALPHABET`.
const PATTERNS: [&str; 43] = [
    "nnnwwnwnn", "wnnwnnnnw", "nnwwnnnnw", "wnwwnnnnn", "nnnwwnnnw", "wnnwwnnnn", "nnwwwnnnn",
    "nnnwnnwnw", "wnnwnnwnn", "nnwwnnwnn", "wnnnnwnnw", "nnwnnwnnw", "wnwnnwnnn", "nnnnwwnnw",
    "wnnnwwnnn", "nnwnwwnnn", "nnnnnwwnw", "wnnnnwwnn", "nnwnnwwnn", "nnnnwwwnn", "wnnnnnnww",
    "nnwnnnnww", "wnwnnnnwn", "nnnnwnnww", "wnnnwnnwn", "nnwnwnnwn", "nnnnnnwww", "wnnnnnwwn",
    "nnwnnnwwn", "nnnnwnwwn", "wwnnnnnnw", "nwwnnnnnw", "wwwnnnnnn", "nwnnwnnnw", "wwnnwnnnn",
    "nwwnwnnnn", "nwnnnnwnw", "wwnnnnwnn", "nwwnnnwnn", "nwnwnwnnn", "nwnwnnnwn", "nwnnnwnwn",
    "nnnwnwnwn",
];

const START_STOP: &str = "nwnnwnwnn";

/// Encode `value` as Code 39.
pub fn encode(value: &str, options: &EncodeOptions) -> Result<LinearSymbol, EncodeError> {
    let payload = if options.extended {
        expand_full_ascii(value)?
    } else {
        value.to_string()
    };

    let mut indices = Vec::with_capacity(payload.len() + 1);
    for (position, ch) in payload.chars().enumerate() {
        let idx = ALPHABET
            .find(ch)
            .ok_or(EncodeError::UnsupportedCharacter {
                symbology: SYMBOLOGY,
                ch,
                position,
            })?;
        indices.push(idx);
    }

    let mut text = value.to_string();
    if options.checksum {
        let check = indices.iter().sum::<usize>() % 43;
        indices.push(check);
        if let Some(ch) = ALPHABET.chars().nth(check) {
            text.push(ch);
        }
    }

    let mut runs = Vec::with_capacity((indices.len() + 2) * 10);
    push_nw(&mut runs, START_STOP, WIDE);
    for idx in indices {
        runs.push(1); // inter-character gap
        push_nw(&mut runs, PATTERNS[idx], WIDE);
    }
    runs.push(1);
    push_nw(&mut runs, START_STOP, WIDE);

    Ok(LinearSymbol { runs, text })
}

/// Map full ASCII onto pairs of basic Code 39 characters.
fn expand_full_ascii(value: &str) -> Result<String, EncodeError> {
    let mut out = String::with_capacity(value.len() * 2);
    for (position, ch) in value.chars().enumerate() {
        if !ch.is_ascii() {
            return Err(EncodeError::UnsupportedCharacter {
                symbology: SYMBOLOGY,
                ch,
                position,
            });
        }
        let b = ch as u8;
        match b {
            0 => out.push_str("%U"),
            1..=26 => {
                out.push('$');
                out.push((b'A' + b - 1) as char);
            }
            27..=31 => {
                out.push('%');
                out.push((b'A' + b - 27) as char);
            }
            b' ' | b'-' | b'.' | b'0'..=b'9' | b'A'..=b'Z' => out.push(ch),
            b'!'..=b',' => {
                out.push('/');
                out.push((b'A' + b - b'!') as char);
            }
            b'/' => out.push_str("/O"),
            b':' => out.push_str("/Z"),
            b';'..=b'?' => {
                out.push('%');
                out.push((b'F' + b - b';') as char);
            }
            b'@' => out.push_str("%V"),
            b'['..=b'_' => {
                out.push('%');
                out.push((b'K' + b - b'[') as char);
            }
            b'`' => out.push_str("%W"),
            b'a'..=b'z' => {
                out.push('+');
                out.push((b'A' + b - b'a') as char);
            }
            _ => {
                // '{' .. DEL
                out.push('%');
                out.push((b'P' + b - b'{') as char);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(checksum: bool, extended: bool) -> EncodeOptions {
        EncodeOptions {
            checksum,
            extended,
            ..Default::default()
        }
    }

    #[test]
    fn every_pattern_has_three_wide_elements() {
        for (i, p) in PATTERNS.iter().enumerate() {
            assert_eq!(p.len(), 9);
            assert_eq!(p.matches('w').count(), 3, "pattern {i}");
        }
        assert_eq!(START_STOP.matches('w').count(), 3);
    }

    #[test]
    fn known_module_strings() {
        let bits = |idx: usize| {
            let mut runs = Vec::new();
            push_nw(&mut runs, PATTERNS[idx], 2);
            LinearSymbol {
                runs,
                text: String::new(),
            }
            .modules()
            .iter()
            .map(|&b| if b { '1' } else { '0' })
            .collect::<String>()
        };
        // With a 2:1 ratio the classic published bit strings appear.
        assert_eq!(bits(0), "101001101101");
        assert_eq!(bits(10), "110101001011");
        assert_eq!(bits(39), "100100100101");
    }

    #[test]
    fn symbol_length_without_checksum() {
        let symbol = encode("AB", &opts(false, false)).unwrap();
        // start + 2 chars + stop, each 9 elements, plus 3 gaps
        assert_eq!(symbol.runs.len(), 4 * 9 + 3);
        assert_eq!(symbol.text, "AB");
        // each char is 6 narrow + 3 wide = 15 modules, gaps 1
        assert_eq!(symbol.module_count(), 4 * 15 + 3);
    }

    #[test]
    fn mod43_check_character() {
        // 1+2+3 = 6 -> '6'
        let symbol = encode("123", &opts(true, false)).unwrap();
        assert_eq!(symbol.text, "1236");
        // "CODE39": 12+24+13+14+3+9 = 75 -> 75 % 43 = 32 -> 'W'
        let symbol = encode("CODE39", &opts(true, false)).unwrap();
        assert_eq!(symbol.text, "CODE39W");
    }

    #[test]
    fn lowercase_rejected_in_basic_mode() {
        assert_eq!(
            encode("Ab", &opts(false, false)).unwrap_err(),
            EncodeError::UnsupportedCharacter {
                symbology: "Code39",
                ch: 'b',
                position: 1,
            }
        );
    }

    #[test]
    fn extended_mode_maps_full_ascii() {
        assert_eq!(expand_full_ascii("a").unwrap(), "+A");
        assert_eq!(expand_full_ascii("!").unwrap(), "/A");
        assert_eq!(expand_full_ascii("/").unwrap(), "/O");
        assert_eq!(expand_full_ascii("?").unwrap(), "%J");
        assert_eq!(expand_full_ascii("~").unwrap(), "%S");
        assert_eq!(expand_full_ascii("\0").unwrap(), "%U");
        assert_eq!(expand_full_ascii("A-1").unwrap(), "A-1");
        let symbol = encode("1234567890abcdef", &opts(false, true)).unwrap();
        assert_eq!(symbol.text, "1234567890abcdef");
    }
}
