//! A small inline-markup reader for `html` report elements.
//!
//! Understands `b`/`strong`, `i`/`em`, `u`, `p`, `div`, `br` and the common
//! character entities. Other tags are dropped and their text kept. Source
//! whitespace collapses to single spaces; paragraphs become line breaks.

use crate::style::FontStyle;

/// A stretch of text with one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlRun {
    pub text: String,
    pub style: FontStyle,
}

#[derive(Default)]
struct Builder {
    runs: Vec<HtmlRun>,
    bold: u32,
    italic: u32,
    underline: u32,
}

impl Builder {
    fn style(&self) -> FontStyle {
        FontStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            underline: self.underline > 0,
        }
    }

    fn at_line_start(&self) -> bool {
        self.runs
            .last()
            .map(|r| r.text.ends_with('\n'))
            .unwrap_or(true)
    }

    fn push_str(&mut self, text: &str) {
        let style = self.style();
        match self.runs.last_mut() {
            Some(run) if run.style == style => run.text.push_str(text),
            _ => self.runs.push(HtmlRun {
                text: text.to_string(),
                style,
            }),
        }
    }

    fn ends_with_space(&self) -> bool {
        self.runs
            .last()
            .map(|r| r.text.ends_with(' '))
            .unwrap_or(false)
    }

    fn text(&mut self, raw: &str) {
        for ch in raw.chars() {
            if ch.is_whitespace() && ch != '\u{a0}' {
                if !self.at_line_start() && !self.ends_with_space() {
                    self.push_str(" ");
                }
                continue;
            }
            let mut buf = [0u8; 4];
            self.push_str(ch.encode_utf8(&mut buf));
        }
    }

    fn trim_trailing_space(&mut self) {
        while let Some(last) = self.runs.last_mut() {
            while last.text.ends_with(' ') {
                last.text.pop();
            }
            if !last.text.is_empty() {
                break;
            }
            self.runs.pop();
        }
    }

    fn line_break(&mut self, paragraph: bool) {
        self.trim_trailing_space();
        if paragraph && self.at_line_start() {
            return;
        }
        self.push_str("\n");
    }

    fn finish(mut self) -> Vec<HtmlRun> {
        loop {
            self.trim_trailing_space();
            match self.runs.last_mut() {
                Some(last) if last.text.ends_with('\n') => {
                    last.text.pop();
                }
                _ => break,
            }
        }
        self.runs.retain(|r| !r.text.is_empty());
        self.runs
    }
}

/// Parse inline markup into styled runs. Line breaks are `'\n'` characters
/// inside the run text.
pub fn parse(markup: &str) -> Vec<HtmlRun> {
    let mut builder = Builder::default();
    let mut rest = markup;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            builder.text(&decode_entities(rest));
            break;
        };
        if lt > 0 {
            builder.text(&decode_entities(&rest[..lt]));
        }
        let Some(gt) = rest[lt..].find('>') else {
            builder.text(&decode_entities(&rest[lt..]));
            break;
        };
        let tag = &rest[lt + 1..lt + gt];
        rest = &rest[lt + gt + 1..];

        let closing = tag.starts_with('/');
        let name: String = tag
            .trim_start_matches('/')
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();

        let counter = match name.as_str() {
            "b" | "strong" => Some(&mut builder.bold),
            "i" | "em" => Some(&mut builder.italic),
            "u" | "ins" => Some(&mut builder.underline),
            _ => None,
        };
        if let Some(counter) = counter {
            if closing {
                *counter = counter.saturating_sub(1);
            } else if !tag.ends_with('/') {
                *counter += 1;
            }
            continue;
        }

        match name.as_str() {
            "br" => builder.line_break(false),
            "p" | "div" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                builder.line_break(true)
            }
            _ => log::debug!("ignoring html tag <{tag}>"),
        }
    }

    builder.finish()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp..];
        let decoded = after.find(';').and_then(|semi| {
            let entity = &after[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &after[consumed..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, bold: bool, italic: bool, underline: bool) -> HtmlRun {
        HtmlRun {
            text: text.to_string(),
            style: FontStyle {
                bold,
                italic,
                underline,
            },
        }
    }

    #[test]
    fn test_nested_styles() {
        let runs = parse("Nulla a <b><i>pretium</i></b> nunc, in <u>cursus</u> quam.");
        assert_eq!(
            runs,
            vec![
                run("Nulla a ", false, false, false),
                run("pretium", true, true, false),
                run(" nunc, in ", false, false, false),
                run("cursus", false, false, true),
                run(" quam.", false, false, false),
            ]
        );
    }

    #[test]
    fn test_paragraphs_become_line_breaks() {
        let runs = parse("<p>one</p><p>two</p>three<br>four");
        let text: String = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(text, "one\ntwo\nthree\nfour");
    }

    #[test]
    fn test_whitespace_collapses() {
        let runs = parse("  a \n\t b  ");
        assert_eq!(runs, vec![run("a b", false, false, false)]);
    }

    #[test]
    fn test_entities() {
        let runs = parse("Fish &amp; chips &lt;3 &#65;&#x42; &bogus;");
        assert_eq!(runs[0].text, "Fish & chips <3 AB &bogus;");
    }

    #[test]
    fn test_unclosed_tag_is_text() {
        let runs = parse("a < b");
        assert_eq!(runs[0].text, "a < b");
    }
}
