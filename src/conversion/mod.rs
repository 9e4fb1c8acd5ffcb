//! Blog export to CMS rows
//!
//! This module contains the run orchestration, configuration, and the
//! report every run produces.

pub mod config;
pub mod engine;
pub mod stats;

pub use config::{ConversionConfig, DelimiterType, QuoteStrategy};
pub use engine::{
    CancelToken, ConversionOrchestrator, ConversionSummary, Preview, Progress, RunMode, RunState,
    SlugRegistry,
};
pub use stats::{ConversionReport, ConversionWarning, RunOutcome, SkippedRecord, WarningKind};
