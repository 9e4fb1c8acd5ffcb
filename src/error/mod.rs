//! Error types and handling infrastructure for blog export conversion

use std::path::PathBuf;

use crate::conversion::stats::ConversionReport;
use crate::formatter::Column;

/// Errors raised while resolving a platform template
#[derive(Debug, Clone, thiserror::Error)]
pub enum TemplateError {
    #[error("Unknown platform '{name}' (available: {available})")]
    UnknownPlatform { name: String, available: String },

    #[error("Invalid template '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("Cannot read template {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Malformed template document {path}: {message}")]
    Syntax { path: PathBuf, message: String },
}

impl TemplateError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Auto-detection could not pick a platform with enough confidence
#[derive(Debug, Clone, thiserror::Error)]
#[error("Could not detect platform: {}", describe_candidate(.best_candidate, .threshold))]
pub struct DetectionError {
    /// Best scoring built-in and its confidence, if anything scored at all
    pub best_candidate: Option<(String, f32)>,
    pub threshold: f32,
}

fn describe_candidate(best: &Option<(String, f32)>, threshold: &f32) -> String {
    match best {
        Some((name, confidence)) => format!(
            "best match '{}' at {:.2} confidence (need {:.2})",
            name, confidence, threshold
        ),
        None => "no built-in template matched".to_string(),
    }
}

/// Structural XML failure while streaming
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}{} ({items_extracted} items extracted)", at_byte(.position))]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the source where the failure was noticed
    pub position: Option<u64>,
    /// Items fully extracted before the failure
    pub items_extracted: usize,
}

fn at_byte(position: &Option<u64>) -> String {
    position
        .map(|position| format!(" at byte {}", position))
        .unwrap_or_default()
}

impl ParseError {
    pub fn new(message: String, position: Option<u64>, items_extracted: usize) -> Self {
        Self {
            message,
            position,
            items_extracted,
        }
    }
}

/// A record lacks a required output column; the record is skipped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Record {index} is missing required field '{field}': {reason}")]
pub struct RecordIncompleteError {
    pub index: usize,
    pub field: Column,
    pub reason: String,
}

/// A character could not be represented in the output encoding
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("U+{:04X} '{character}' is not representable in {encoding}, replaced", code_point(.character))]
pub struct EncodingWarning {
    pub index: usize,
    pub field: Column,
    pub character: char,
    pub encoding: &'static str,
}

fn code_point(character: &char) -> u32 {
    *character as u32
}

/// Non-template failure kinds
#[derive(Debug, thiserror::Error)]
pub enum ConversionErrorKind {
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Conversion cancelled after {records} records")]
    Cancelled { records: usize },

    #[error("Output validation failed: {message}")]
    OutputValidation { message: String },
}

impl ConversionErrorKind {
    pub fn io(message: String, path: Option<PathBuf>) -> Self {
        Self::Io { message, path }
    }

    pub fn configuration(message: String) -> Self {
        Self::Configuration { message }
    }
}

/// A failed run with whatever it produced before failing
#[derive(Debug)]
pub struct FailedRun {
    pub cause: ConversionError,
    pub rows_written: usize,
    pub report: ConversionReport,
}

/// Main error type for conversion operations
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error("XML parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{kind}")]
    Conversion {
        kind: ConversionErrorKind,
        source: Option<anyhow::Error>,
    },

    #[error("Conversion failed: {}", .0.cause)]
    RunFailed(Box<FailedRun>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConversionError {
    pub fn conversion(kind: ConversionErrorKind) -> Self {
        Self::Conversion { kind, source: None }
    }

    pub fn conversion_with_source(kind: ConversionErrorKind, source: anyhow::Error) -> Self {
        Self::Conversion {
            kind,
            source: Some(source),
        }
    }

    pub fn io(error: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::conversion(ConversionErrorKind::io(error.to_string(), path))
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::conversion(ConversionErrorKind::configuration(message.into()))
    }

    pub fn failed_run(cause: ConversionError, rows_written: usize, report: ConversionReport) -> Self {
        Self::RunFailed(Box::new(FailedRun {
            cause,
            rows_written,
            report,
        }))
    }

    /// The partial report of a failed run
    pub fn report(&self) -> Option<&ConversionReport> {
        match self {
            Self::RunFailed(run) => Some(&run.report),
            _ => None,
        }
    }

    /// Rows already written when a run failed
    pub fn rows_written(&self) -> Option<usize> {
        match self {
            Self::RunFailed(run) => Some(run.rows_written),
            _ => None,
        }
    }

    /// The error that ended the run, unwrapping a failed-run envelope
    pub fn root_cause(&self) -> &ConversionError {
        match self {
            Self::RunFailed(run) => run.cause.root_cause(),
            other => other,
        }
    }

    /// Create a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Template(err) => format!("Template error: {}", err),
            Self::Detection(err) => {
                format!("{}. Pass --platform or --template explicitly", err)
            }
            Self::Parse(err) => format!("XML parse error: {}", err),
            Self::Conversion { kind, .. } => match kind {
                ConversionErrorKind::Io { message, path: Some(path) } => {
                    format!("IO error on {}: {}", path.display(), message)
                }
                ConversionErrorKind::Cancelled { records } => {
                    format!("Conversion cancelled after {} records", records)
                }
                _ => self.to_string(),
            },
            Self::RunFailed(run) if run.rows_written == 0 => run.cause.user_message(),
            Self::RunFailed(run) => format!(
                "{} ({} rows written before the failure)",
                run.cause.user_message(),
                run.rows_written
            ),
            Self::Other(err) => format!("Unexpected error: {}", err),
        }
    }
}

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Convenience result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Convenience result type for streaming extraction
pub type ParseResult<T> = Result<T, ParseError>;
