//! Schema formatting: normalized records to delimiter-separated rows

pub mod quotes;
pub mod schema;

pub use quotes::{join_list, QuoteEngine};
pub use schema::Column;

use std::io::{self, BufWriter, Write};

use crate::content::{NormalizedRecord, OutputEncoding};
use crate::conversion::ConversionConfig;
use crate::error::{EncodingWarning, RecordIncompleteError};

/// Row terminator
pub const LINE_ENDING: &str = "\r\n";

/// A formatted row (without terminator) and its encoding substitutions
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedRow {
    pub line: String,
    /// Cell values before quoting, after substitution
    pub cells: Vec<String>,
    pub encoding_warnings: Vec<EncodingWarning>,
}

/// Maps normalized records onto the fixed column schema
#[derive(Debug, Clone)]
pub struct SchemaFormatter {
    quotes: QuoteEngine,
    encoding: OutputEncoding,
}

impl SchemaFormatter {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            quotes: QuoteEngine::new(config.delimiter, config.quote_strings),
            encoding: config.output_encoding,
        }
    }

    pub fn encoding(&self) -> OutputEncoding {
        self.encoding
    }

    /// Header line (without terminator)
    pub fn header(&self) -> String {
        let headers: Vec<&str> = Column::ALL.iter().map(Column::header).collect();
        self.quotes.join_row(&headers)
    }

    /// Fail on the first required column without a value
    pub fn check_required(&self, record: &NormalizedRecord) -> Result<(), RecordIncompleteError> {
        let missing = |column: Column, reason: &str| RecordIncompleteError {
            index: record.index,
            field: column,
            reason: reason.to_string(),
        };

        if is_blank(&record.title) {
            return Err(missing(Column::Title, "title is missing or empty"));
        }
        if is_blank(&record.slug) {
            return Err(missing(Column::Slug, "no slug in the source and slug generation is off"));
        }
        if is_blank(&record.content) {
            return Err(missing(Column::Content, "content is missing or empty"));
        }
        if is_blank(&record.excerpt) {
            return Err(missing(Column::Excerpt, "excerpt is missing and could not be derived"));
        }
        if is_blank(&record.author) {
            return Err(missing(Column::Author, "author is missing or empty"));
        }
        if record.published.is_none() {
            return Err(missing(Column::PublishedDate, "date is missing or unparsable"));
        }
        Ok(())
    }

    /// Cell values in column order, before substitution and quoting
    pub fn cells(&self, record: &NormalizedRecord) -> Vec<String> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        Column::ALL
            .iter()
            .map(|column| match column {
                Column::Title => text(&record.title),
                Column::Slug => text(&record.slug),
                Column::Content => text(&record.content),
                Column::Excerpt => text(&record.excerpt),
                Column::Author => text(&record.author),
                Column::PublishedDate => record
                    .published
                    .map(|date| date.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                Column::FeaturedImage => text(&record.featured_image),
                Column::Categories => join_list(&record.categories),
                Column::Tags => join_list(&record.tags),
                Column::Status => record.status.as_str().to_string(),
                Column::SeoTitle => text(&record.seo_title),
                Column::SeoDescription => text(&record.seo_description),
            })
            .collect()
    }

    /// Check, substitute and quote one record
    pub fn format_row(&self, record: &NormalizedRecord) -> Result<FormattedRow, RecordIncompleteError> {
        self.check_required(record)?;

        let mut encoding_warnings = Vec::new();
        let cells: Vec<String> = self
            .cells(record)
            .into_iter()
            .zip(Column::ALL)
            .map(|(cell, column)| {
                let (substituted, replaced) = self.encoding.substitute(&cell);
                for character in replaced {
                    encoding_warnings.push(EncodingWarning {
                        index: record.index,
                        field: column,
                        character,
                        encoding: self.encoding.name(),
                    });
                }
                substituted.into_owned()
            })
            .collect();

        Ok(FormattedRow {
            line: self.quotes.join_row(&cells),
            cells,
            encoding_warnings,
        })
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Buffered row output in the configured byte encoding
pub struct RowWriter<W: Write> {
    inner: BufWriter<W>,
    encoding: OutputEncoding,
    rows: usize,
}

impl<W: Write> RowWriter<W> {
    pub fn new(writer: W, encoding: OutputEncoding) -> Self {
        Self {
            inner: BufWriter::new(writer),
            encoding,
            rows: 0,
        }
    }

    pub fn write_header(&mut self, header: &str) -> io::Result<()> {
        self.write_line(header)
    }

    pub fn write_row(&mut self, row: &FormattedRow) -> io::Result<()> {
        self.write_line(&row.line)?;
        self.rows += 1;
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.inner.write_all(&self.encoding.encode(line))?;
        self.inner.write_all(LINE_ENDING.as_bytes())
    }

    /// Data rows written so far
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
