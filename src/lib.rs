//! Blog export converter
//!
//! Streams WordPress, Ghost and Jekyll XML exports (or any source described
//! by a custom template) into a fixed-schema CSV for CMS import, with a
//! report of what was converted, skipped and substituted.

pub mod cli;
pub mod content;
pub mod conversion;
pub mod error;
pub mod formatter;
pub mod parser;
pub mod template;
pub mod validation;

use std::io::Write;

// Re-export commonly used types
pub use content::{NormalizedRecord, OutputEncoding};
pub use conversion::{
    CancelToken, ConversionConfig, ConversionOrchestrator, ConversionReport, ConversionSummary,
    Preview, Progress, RunOutcome, RunState,
};
pub use error::{ConversionError, ConversionErrorKind, ConversionResult, ParseError};
pub use parser::XmlSource;
pub use template::{PlatformSelector, PlatformTemplate};

/// Convert a blog export, writing rows to `writer`
pub fn convert<W: Write>(
    source: impl Into<XmlSource>,
    platform: PlatformSelector,
    config: &ConversionConfig,
    writer: W,
) -> ConversionResult<ConversionSummary> {
    ConversionOrchestrator::new(platform, config.clone()).convert(source.into(), writer)
}

/// Preview the first `limit` records with default processing settings
pub fn preview(
    source: impl Into<XmlSource>,
    platform: PlatformSelector,
    limit: usize,
) -> ConversionResult<Preview> {
    ConversionOrchestrator::new(platform, ConversionConfig::default()).preview(source.into(), limit)
}

/// Read the whole export and report counts without producing rows
pub fn stats(source: impl Into<XmlSource>, platform: PlatformSelector) -> ConversionResult<ConversionReport> {
    ConversionOrchestrator::new(platform, ConversionConfig::default()).stats(source.into())
}

/// Built-in platform templates
pub fn list_platforms() -> Vec<PlatformTemplate> {
    template::builtin::all()
}
