//! Cell quoting for delimiter-separated output
//!
//! Quoting follows RFC 4180: a quoted cell is wrapped in double quotes and
//! embedded quotes are doubled. Smart quoting only quotes cells that would
//! otherwise be ambiguous.

use std::borrow::Cow;

use crate::conversion::config::{DelimiterType, QuoteStrategy};

/// Separator between items of a list cell
pub const LIST_SEPARATOR: char = ',';

/// Quoting engine for one delimiter and strategy
#[derive(Debug, Clone, Copy)]
pub struct QuoteEngine {
    delimiter: char,
    strategy: QuoteStrategy,
}

impl QuoteEngine {
    pub fn new(delimiter: DelimiterType, strategy: QuoteStrategy) -> Self {
        Self {
            delimiter: delimiter.as_char(),
            strategy,
        }
    }

    /// Determine if a cell needs quoting
    ///
    /// Quoting Rules:
    /// 1. Quote if it contains the delimiter, a double quote, CR or LF
    /// 2. Quote if it begins or ends with whitespace
    /// 3. Otherwise, no quotes needed
    pub fn needs_quoting(&self, value: &str) -> bool {
        if value
            .chars()
            .any(|c| c == self.delimiter || c == '"' || c == '\r' || c == '\n')
        {
            return true;
        }

        value.chars().next().map_or(false, char::is_whitespace)
            || value.chars().last().map_or(false, char::is_whitespace)
    }

    /// Wrap in double quotes, doubling embedded quotes
    pub fn quote(&self, value: &str) -> String {
        quote_with_doubling(value)
    }

    /// Format a cell according to the strategy
    pub fn format<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self.strategy {
            QuoteStrategy::Always => Cow::Owned(self.quote(value)),
            QuoteStrategy::Smart if self.needs_quoting(value) => Cow::Owned(self.quote(value)),
            QuoteStrategy::Smart => Cow::Borrowed(value),
        }
    }

    /// Join a row of cells with the delimiter
    pub fn join_row<S: AsRef<str>>(&self, cells: &[S]) -> String {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                line.push(self.delimiter);
            }
            line.push_str(&self.format(cell.as_ref()));
        }
        line
    }
}

fn quote_with_doubling(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 2);
    result.push('"');
    for ch in value.chars() {
        if ch == '"' {
            result.push('"');
        }
        result.push(ch);
    }
    result.push('"');
    result
}

/// Join list items into one cell value. Items that contain the separator or
/// a quote are quoted themselves so the list splits back unchanged.
pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| {
            let item = item.as_ref();
            if item.contains(LIST_SEPARATOR) || item.contains('"') {
                quote_with_doubling(item)
            } else {
                item.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}
