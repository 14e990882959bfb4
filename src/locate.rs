//! Best-effort positions inside JSON text
//!
//! Diagnostics point the user near a problem, not at an exact token span.
//! These helpers scan text line by line and never fail: callers fall back to
//! [`Span::default`] (line 0, column 0) when nothing matches.

use regex::Regex;

/// A 0-based line with a column range on that line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub end_column: usize,
}

/// Find the first line holding `"field":` as an object key.
pub fn find_field(text: &str, field: &str) -> Option<Span> {
    let pattern = Regex::new(&format!(r#"^\s*"{}"\s*:"#, regex::escape(field))).ok()?;
    let quoted = format!("\"{}\"", field);

    text.lines().enumerate().find_map(|(line_no, line)| {
        if !pattern.is_match(line) {
            return None;
        }
        let column = line.find(&quoted)?;
        Some(Span {
            line: line_no,
            column,
            end_column: column + quoted.len(),
        })
    })
}

/// Find the first occurrence of `value` as a quoted string value (not a key).
pub fn find_value(text: &str, value: &str) -> Option<Span> {
    let quoted = format!("\"{}\"", value);

    for (line_no, line) in text.lines().enumerate() {
        let mut search_from = 0;
        while let Some(found) = line[search_from..].find(&quoted) {
            let column = search_from + found;
            let end_column = column + quoted.len();
            let is_key = line[end_column..].trim_start().starts_with(':');
            if !is_key {
                return Some(Span {
                    line: line_no,
                    column,
                    end_column,
                });
            }
            search_from = end_column;
        }
    }
    None
}

/// Convert a byte offset into a 0-based line and column.
pub fn offset_to_line_col(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = &text.as_bytes()[..offset];
    let line = before.iter().filter(|b| **b == b'\n').count();
    let line_start = before
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    (line, offset - line_start)
}

/// Position of a JSON parse failure. The line is 1-based.
///
/// serde_json reports line and column directly. Messages that only carry a
/// `position N` offset are converted through [`offset_to_line_col`]; without
/// either, the error lands on line 1.
pub fn parse_error_span(text: &str, error: &serde_json::Error) -> Span {
    if error.line() > 0 {
        let column = error.column().saturating_sub(1);
        return Span {
            line: error.line(),
            column,
            end_column: column + 1,
        };
    }

    let message = error.to_string();
    let offset = Regex::new(r"position (\d+)")
        .ok()
        .and_then(|re| re.captures(&message)?.get(1)?.as_str().parse::<usize>().ok());
    if let Some(offset) = offset {
        let (line, column) = offset_to_line_col(text, offset);
        return Span {
            line: line + 1,
            column,
            end_column: column + 1,
        };
    }

    Span {
        line: 1,
        column: 0,
        end_column: 1,
    }
}
