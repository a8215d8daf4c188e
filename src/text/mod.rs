//! # Text Layout
//!
//! Greedy line breaking against standard-font metrics. Break opportunities
//! come from UAX#14 (`unicode-linebreak`); a word wider than the line is
//! split at the character that overflows. All widths are millimetres.

pub mod html;

use crate::font::Font;
use unicode_linebreak::{linebreaks, BreakOpportunity};

/// A line of single-style text after line breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    pub text: String,
    /// Width without trailing spaces.
    pub width: f64,
}

/// A character with its own font, for multi-style breaking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyledChar {
    pub ch: char,
    pub font: Font,
    pub underline: bool,
}

/// A same-style stretch of a run line, positioned from the line start.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub font: Font,
    pub underline: bool,
    pub x: f64,
    pub width: f64,
}

/// A line of multi-style text.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLine {
    pub spans: Vec<Span>,
    pub width: f64,
    /// Tallest line height of any character on the line.
    pub height: f64,
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// UAX#14 break opportunities indexed by char position: entry `i` is the
/// opportunity to break *before* char `i`. Index 0 is always `None`.
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    let mut byte_to_char = vec![0usize; text.len() + 1];
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        byte_to_char[byte_idx] = char_idx;
    }
    byte_to_char[text.len()] = char_count;

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx > 0 && char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }
    result
}

/// Split `chars` into line ranges that fit `max_width`.
fn break_ranges(chars: &[char], widths: &[f64], max_width: f64) -> Vec<(usize, usize)> {
    let text: String = chars.iter().collect();
    let break_opps = compute_break_opportunities(&text);

    let mut ranges = Vec::new();
    let mut line_start = 0;
    let mut line_width = 0.0;
    let mut last_break: Option<usize> = None;

    for (i, &ch) in chars.iter().enumerate() {
        match break_opps[i] {
            Some(BreakOpportunity::Mandatory) => {
                ranges.push((line_start, i));
                line_start = i;
                line_width = 0.0;
                last_break = None;
            }
            Some(BreakOpportunity::Allowed) => last_break = Some(i),
            None => {}
        }

        if is_newline(ch) {
            continue;
        }

        if line_width + widths[i] > max_width && line_start < i {
            match last_break.filter(|&bp| bp > line_start) {
                Some(bp) => {
                    ranges.push((line_start, bp));
                    line_start = bp;
                    line_width = (bp..=i)
                        .filter(|&k| !is_newline(chars[k]))
                        .map(|k| widths[k])
                        .sum();
                }
                None => {
                    ranges.push((line_start, i));
                    line_start = i;
                    line_width = widths[i];
                }
            }
            last_break = None;
            continue;
        }

        line_width += widths[i];
    }

    if line_start < chars.len() || ranges.is_empty() {
        ranges.push((line_start, chars.len()));
    }
    ranges
}

/// Sum of widths in `start..end`, skipping newlines and trailing spaces.
fn visible_width(chars: &[char], widths: &[f64], start: usize, end: usize) -> f64 {
    let mut end = end;
    while end > start && (chars[end - 1] == ' ' || is_newline(chars[end - 1])) {
        end -= 1;
    }
    (start..end)
        .filter(|&k| !is_newline(chars[k]))
        .map(|k| widths[k])
        .sum()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TextLayout;

impl TextLayout {
    pub fn new() -> Self {
        Self
    }

    /// Break single-style text into lines no wider than `max_width`.
    /// Always returns at least one line.
    pub fn break_into_lines(&self, text: &str, font: Font, max_width: f64) -> Vec<BrokenLine> {
        let chars: Vec<char> = text.chars().collect();
        let widths: Vec<f64> = chars.iter().map(|&ch| font.char_width(ch)).collect();

        break_ranges(&chars, &widths, max_width)
            .into_iter()
            .map(|(start, end)| {
                let text: String = chars[start..end]
                    .iter()
                    .filter(|c| !is_newline(**c))
                    .collect();
                BrokenLine {
                    text: text.trim_end_matches(' ').to_string(),
                    width: visible_width(&chars, &widths, start, end),
                }
            })
            .collect()
    }

    /// Break multi-style text into lines, grouping each line into spans of
    /// identical style.
    pub fn break_runs_into_lines(&self, chars: &[StyledChar], max_width: f64) -> Vec<RunLine> {
        let plain: Vec<char> = chars.iter().map(|sc| sc.ch).collect();
        let widths: Vec<f64> = chars.iter().map(|sc| sc.font.char_width(sc.ch)).collect();
        let fallback_height = chars.first().map(|sc| sc.font.line_height()).unwrap_or(0.0);

        break_ranges(&plain, &widths, max_width)
            .into_iter()
            .map(|(start, end)| {
                let mut spans: Vec<Span> = Vec::new();
                let mut x = 0.0;
                let mut height: f64 = 0.0;
                let mut visible_end = end;
                while visible_end > start
                    && (plain[visible_end - 1] == ' ' || is_newline(plain[visible_end - 1]))
                {
                    visible_end -= 1;
                }
                for k in start..visible_end {
                    let sc = &chars[k];
                    if is_newline(sc.ch) {
                        continue;
                    }
                    height = height.max(sc.font.line_height());
                    match spans.last_mut() {
                        Some(span) if span.font == sc.font && span.underline == sc.underline => {
                            span.text.push(sc.ch);
                            span.width += widths[k];
                        }
                        _ => spans.push(Span {
                            text: sc.ch.to_string(),
                            font: sc.font,
                            underline: sc.underline,
                            x,
                            width: widths[k],
                        }),
                    }
                    x += widths[k];
                }
                RunLine {
                    spans,
                    width: x,
                    height: if height > 0.0 { height } else { fallback_height },
                }
            })
            .collect()
    }
}
