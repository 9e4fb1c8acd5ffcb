//! Run reports: counts, skips, warnings and timing for one conversion

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::engine::{RunMode, RunState};
use crate::template::{CanonicalField, PostStatus};

/// Kinds of non-fatal events recorded against a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A date value matched none of the template's formats
    DateUnparsed,
    /// A status value had no entry in the template's status mapping
    StatusUnmapped,
    /// Content exceeded the configured maximum length
    ContentTruncated,
    /// A character was replaced for the output encoding
    Encoding,
    /// A slug collided with an earlier record and was suffixed
    DuplicateSlug,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WarningKind::DateUnparsed => "date unparsed",
            WarningKind::StatusUnmapped => "status unmapped",
            WarningKind::ContentTruncated => "content truncated",
            WarningKind::Encoding => "encoding",
            WarningKind::DuplicateSlug => "duplicate slug",
        };
        f.write_str(label)
    }
}

/// One warning, tied to the item it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionWarning {
    pub kind: WarningKind,
    pub field: String,
    /// 1-based item index in document order
    pub index: usize,
    pub message: String,
}

impl ConversionWarning {
    pub fn new(
        kind: WarningKind,
        field: impl Into<String>,
        index: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            index,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item {} [{}] {}: {}", self.index, self.field, self.kind, self.message)
    }
}

/// A record that was not written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub field: String,
    pub reason: String,
}

/// How a run ended, as the caller should present it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    FullyConverted,
    CompletedWithSkips,
    Failed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunOutcome::FullyConverted => "fully converted",
            RunOutcome::CompletedWithSkips => "completed with skips",
            RunOutcome::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Structured result of a run, returned alongside the output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    /// Template name used for the run
    pub platform: String,
    pub mode: RunMode,
    pub state: RunState,
    /// Items seen in the source, converted or not
    pub total_items: usize,
    pub converted: usize,
    pub skipped: Vec<SkippedRecord>,
    pub warnings: Vec<ConversionWarning>,
    /// How many items carried a value for each mapped field
    pub field_presence: BTreeMap<CanonicalField, usize>,
    pub published: usize,
    pub drafts: usize,
    pub elapsed_ms: u64,
    /// Source bytes consumed by the parser
    #[serde(default)]
    pub bytes_read: u64,
    /// Description of the fatal error, for failed runs
    pub failure: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl ConversionReport {
    pub fn new(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            mode: RunMode::Convert,
            state: RunState::Idle,
            total_items: 0,
            converted: 0,
            skipped: Vec::new(),
            warnings: Vec::new(),
            field_presence: BTreeMap::new(),
            published: 0,
            drafts: 0,
            elapsed_ms: 0,
            bytes_read: 0,
            failure: None,
            started_at: chrono::Utc::now(),
        }
    }

    pub fn record_skip(&mut self, index: usize, field: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedRecord {
            index,
            field: field.into(),
            reason: reason.into(),
        });
    }

    pub fn record_warning(&mut self, warning: ConversionWarning) {
        self.warnings.push(warning);
    }

    /// Count the fields an item carried
    pub fn record_presence<'a>(&mut self, fields: impl IntoIterator<Item = &'a CanonicalField>) {
        for field in fields {
            *self.field_presence.entry(*field).or_insert(0) += 1;
        }
    }

    pub fn record_status(&mut self, status: PostStatus) {
        match status {
            PostStatus::Published => self.published += 1,
            PostStatus::Draft => self.drafts += 1,
        }
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.state == RunState::Failed {
            RunOutcome::Failed
        } else if self.skipped.is_empty() {
            RunOutcome::FullyConverted
        } else {
            RunOutcome::CompletedWithSkips
        }
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &ConversionWarning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    /// Get a formatted summary
    pub fn summary(&self) -> String {
        format!(
            "{}: {} of {} items converted, {} skipped, {} warnings ({})",
            self.platform,
            self.converted,
            self.total_items,
            self.skipped.len(),
            self.warnings.len(),
            self.outcome()
        )
    }

    /// Export to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Import from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
