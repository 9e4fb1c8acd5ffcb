//! Output validation
//!
//! Every emitted row is read back and checked against the schema before
//! the run reports success.

pub mod csv;

pub use csv::{parse_record, split_list};

use crate::content::NormalizedRecord;
use crate::formatter::{Column, FormattedRow};

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

/// Findings for one row
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error to the report
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            message: message.into(),
        });
    }

    /// Add a warning to the report
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|i| i.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Re-parses formatted rows and checks them against the record they came from
#[derive(Debug, Clone, Copy)]
pub struct RowValidator {
    delimiter: char,
}

impl RowValidator {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn validate(&self, row: &FormattedRow, record: &NormalizedRecord) -> ValidationReport {
        let mut report = ValidationReport::new();

        let cells = match parse_record(&row.line, self.delimiter) {
            Ok(cells) => cells,
            Err(e) => {
                report.add_error(format!("item {}: row does not parse: {}", record.index, e));
                return report;
            }
        };

        if cells.len() != Column::ALL.len() {
            report.add_error(format!(
                "item {}: expected {} columns, found {}",
                record.index,
                Column::ALL.len(),
                cells.len()
            ));
            return report;
        }

        if cells != row.cells {
            report.add_error(format!("item {}: cells changed by quoting", record.index));
        }

        for column in Column::REQUIRED {
            if cells[column.position()].trim().is_empty() {
                report.add_error(format!("item {}: required column '{}' is empty", record.index, column));
            }
        }

        let lists = [
            (Column::Categories, &record.categories),
            (Column::Tags, &record.tags),
        ];
        for (column, expected) in lists {
            match split_list(&cells[column.position()]) {
                Ok(items) if &items == expected => {}
                // Substitution may legitimately change list items
                Ok(_) if !row.encoding_warnings.is_empty() => {
                    report.add_warning(format!("item {}: '{}' altered by encoding", record.index, column));
                }
                Ok(items) => report.add_error(format!(
                    "item {}: '{}' splits into {} items, expected {}",
                    record.index,
                    column,
                    items.len(),
                    expected.len()
                )),
                Err(e) => report.add_error(format!("item {}: '{}' does not split: {}", record.index, column, e)),
            }
        }

        report
    }
}
