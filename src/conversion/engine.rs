//! Conversion orchestration: one streaming pass from source document to rows
//!
//! A run moves through `Idle → TemplateLoaded → Streaming → Completed | Failed`.
//! Records are pulled one at a time; per-record problems become skips or
//! warnings in the report, while structural failures and cancellation end
//! the run with the partial report attached to the error.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::content::{slug, ContentProcessor, NormalizedRecord, Processed};
use crate::conversion::config::ConversionConfig;
use crate::conversion::stats::{ConversionReport, ConversionWarning, WarningKind};
use crate::error::{ConversionError, ConversionErrorKind, ConversionResult};
use crate::formatter::{FormattedRow, RowWriter, SchemaFormatter};
use crate::parser::{OpenedSource, RawValue, SourceReader, StreamingExtractor, XmlSource};
use crate::template::detect::PEEK_BYTES;
use crate::template::{CanonicalField, PlatformSelector, PlatformTemplate};
use crate::validation::RowValidator;

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    TemplateLoaded,
    Streaming,
    Completed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunState::Idle => "idle",
            RunState::TemplateLoaded => "template loaded",
            RunState::Streaming => "streaming",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// What a run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Rows to a writer
    Convert,
    /// At most N normalized records, no output
    Preview,
    /// Counts and field presence only
    Stats,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunMode::Convert => "convert",
            RunMode::Preview => "preview",
            RunMode::Stats => "stats",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Default)]
struct Counters {
    records: AtomicUsize,
    bytes: AtomicU64,
    /// Zero when the source length is unknown
    total_bytes: AtomicU64,
    finished: AtomicBool,
}

/// Progress of a run, shared with whoever wants to poll it
#[derive(Debug, Clone, Default)]
pub struct Progress {
    counters: Arc<Counters>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items pulled from the source so far
    pub fn records_processed(&self) -> usize {
        self.counters.records.load(Ordering::Relaxed)
    }

    /// Source bytes consumed by the parser so far
    pub fn bytes_consumed(&self) -> u64 {
        self.counters.bytes.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> Option<u64> {
        match self.counters.total_bytes.load(Ordering::Relaxed) {
            0 => None,
            total => Some(total),
        }
    }

    /// Fraction of the source consumed, when its length is known
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total_bytes()?;
        Some((self.bytes_consumed() as f64 / total as f64).min(1.0))
    }

    /// Expected item count, extrapolated from the bytes consumed per item
    pub fn estimated_total(&self) -> Option<usize> {
        let total = self.total_bytes()?;
        let bytes = self.bytes_consumed();
        let records = self.records_processed();
        if bytes == 0 || records == 0 {
            return None;
        }
        let estimate = (records as f64 * total as f64 / bytes as f64).round() as usize;
        Some(estimate.max(records))
    }

    pub fn is_finished(&self) -> bool {
        self.counters.finished.load(Ordering::Relaxed)
    }

    fn reset(&self, total_bytes: Option<u64>) {
        self.counters.records.store(0, Ordering::Relaxed);
        self.counters.bytes.store(0, Ordering::Relaxed);
        self.counters
            .total_bytes
            .store(total_bytes.unwrap_or(0), Ordering::Relaxed);
        self.counters.finished.store(false, Ordering::Relaxed);
    }

    fn update(&self, records: usize, bytes: u64) {
        self.counters.records.store(records, Ordering::Relaxed);
        self.counters.bytes.store(bytes, Ordering::Relaxed);
    }

    fn finish(&self) {
        self.counters.finished.store(true, Ordering::Relaxed);
    }
}

/// Cooperative cancellation, checked before every record is pulled
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Hands out unique slugs in claim order
///
/// The first claim of a slug keeps it; later claims get the smallest free
/// numeric suffix starting at `-2`. The base is clipped so the suffixed slug
/// still fits the length limit.
#[derive(Debug)]
pub struct SlugRegistry {
    max_len: usize,
    taken: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl Default for SlugRegistry {
    fn default() -> Self {
        Self::with_max_length(usize::MAX)
    }
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_length(max_len: usize) -> Self {
        Self {
            max_len,
            taken: HashSet::new(),
            next_suffix: HashMap::new(),
        }
    }

    pub fn claim(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }

        let mut suffix = self.next_suffix.get(base).copied().unwrap_or(2);
        loop {
            let tail = format!("-{}", suffix);
            let stem = slug::clip(base, self.max_len.saturating_sub(tail.len()));
            // A limit shorter than the suffix itself cannot be honoured
            let stem = if stem.is_empty() { base } else { stem.as_str() };
            let candidate = format!("{}{}", stem, tail);
            suffix += 1;
            if self.taken.insert(candidate.clone()) {
                self.next_suffix.insert(base.to_string(), suffix);
                return candidate;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

/// Result of a completed convert run
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub rows_written: usize,
    pub report: ConversionReport,
}

/// Drives template selection, extraction, processing and formatting
///
/// Each call to [`convert`](Self::convert), [`preview`](Self::preview) or
/// [`stats`](Self::stats) is an independent run over a fresh source.
#[derive(Debug)]
pub struct ConversionOrchestrator {
    selector: PlatformSelector,
    config: ConversionConfig,
    progress: Progress,
    cancel: CancelToken,
}

impl ConversionOrchestrator {
    pub fn new(selector: PlatformSelector, config: ConversionConfig) -> Self {
        Self {
            selector,
            config,
            progress: Progress::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Handle for polling progress from another thread
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Write the header and one row per convertible item
    pub fn convert<W: Write>(&self, source: XmlSource, writer: W) -> ConversionResult<ConversionSummary> {
        let mut run = self.start(source, RunMode::Convert)?;
        let mut out = RowWriter::new(writer, run.formatter.encoding());
        out.write_header(&run.formatter.header())
            .map_err(|e| ConversionError::io(e, None))?;

        run.advance(RunState::Streaming);
        let streamed = run.write_rows(&mut out);
        let flushed = out.flush().map_err(|e| ConversionError::io(e, None));
        let rows_written = out.rows_written();

        match streamed.and(flushed) {
            Ok(()) => Ok(ConversionSummary {
                rows_written,
                report: run.complete(),
            }),
            Err(cause) => Err(run.fail(cause, rows_written)),
        }
    }

    /// Lazily yield up to `limit` records that would be converted
    pub fn preview(&self, source: XmlSource, limit: usize) -> ConversionResult<Preview> {
        let mut run = self.start(source, RunMode::Preview)?;
        run.advance(RunState::Streaming);
        Ok(Preview {
            run,
            remaining: limit,
        })
    }

    /// Consume the whole source and report counts without producing rows
    pub fn stats(&self, source: XmlSource) -> ConversionResult<ConversionReport> {
        let mut run = self.start(source, RunMode::Stats)?;
        run.advance(RunState::Streaming);
        match run.count_rows() {
            Ok(()) => Ok(run.complete()),
            Err(cause) => Err(run.fail(cause, 0)),
        }
    }

    fn start(&self, source: XmlSource, mode: RunMode) -> ConversionResult<Pipeline> {
        let started = Instant::now();
        tracing::debug!(
            source = %source.description(),
            platform = %self.selector.description(),
            %mode,
            "Starting run"
        );

        let (opened, template) = match self.prepare(source) {
            Ok(prepared) => prepared,
            Err(cause) => return Err(self.reject(cause, mode, started)),
        };
        self.progress.reset(opened.total_bytes);

        let mut report = ConversionReport::new(template.name());
        report.mode = mode;

        let mut run = Pipeline {
            state: RunState::Idle,
            extractor: StreamingExtractor::new(opened.reader, template),
            processor: ContentProcessor::new(&self.config),
            formatter: SchemaFormatter::new(&self.config),
            validator: self
                .config
                .validate_output
                .then(|| RowValidator::new(self.config.delimiter.as_char())),
            slugs: SlugRegistry::with_max_length(self.config.slug_max_length),
            report,
            progress: self.progress.clone(),
            cancel: self.cancel.clone(),
            started,
        };
        run.advance(RunState::TemplateLoaded);
        Ok(run)
    }

    /// Validate the configuration, open the source and resolve its template
    fn prepare(&self, source: XmlSource) -> ConversionResult<(OpenedSource, PlatformTemplate)> {
        self.config.validate().map_err(ConversionError::configuration)?;

        let path = match &source {
            XmlSource::File(path) => Some(path.clone()),
            _ => None,
        };
        let peek_len = if self.selector.needs_peek() { PEEK_BYTES } else { 0 };
        let opened = source.open(peek_len).map_err(|e| ConversionError::io(e, path))?;
        let template = self.selector.resolve(&opened.peek)?;
        Ok((opened, template))
    }

    /// End a run that never loaded a template. The caller still gets an
    /// empty report in the failed state.
    fn reject(&self, cause: ConversionError, mode: RunMode, started: Instant) -> ConversionError {
        let mut report = ConversionReport::new(&self.selector.description());
        report.mode = mode;
        report.state = RunState::Failed;
        report.failure = Some(cause.to_string());
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        self.progress.reset(None);
        self.progress.finish();
        tracing::warn!(error = %cause, %mode, "Run failed before streaming");
        ConversionError::failed_run(cause, 0, report)
    }
}

/// State of one run
struct Pipeline {
    state: RunState,
    extractor: StreamingExtractor<SourceReader>,
    processor: ContentProcessor,
    formatter: SchemaFormatter,
    validator: Option<RowValidator>,
    slugs: SlugRegistry,
    report: ConversionReport,
    progress: Progress,
    cancel: CancelToken,
    started: Instant,
}

impl Pipeline {
    fn advance(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, mode = %self.report.mode, "State transition");
        self.state = next;
        self.report.state = next;
    }

    /// Pull and normalize the next item; `None` at the end of the document
    fn pull(&mut self) -> ConversionResult<Option<Processed>> {
        if self.cancel.is_cancelled() {
            return Err(ConversionError::conversion(ConversionErrorKind::Cancelled {
                records: self.report.total_items,
            }));
        }

        let raw = match self.extractor.next() {
            Some(raw) => raw?,
            None => return Ok(None),
        };

        self.report.total_items += 1;
        self.report.record_presence(raw.values.iter().filter_map(|(field, value)| {
            let present = match value {
                RawValue::Text(text) => !text.is_empty(),
                RawValue::List(items) => !items.is_empty(),
            };
            present.then_some(field)
        }));
        self.progress
            .update(self.report.total_items, self.extractor.byte_position());

        Ok(Some(self.processor.process(&raw, self.extractor.template())))
    }

    /// Record the item's warnings, then either skip it or claim its slug.
    /// Returns the record when it will be emitted.
    fn admit(&mut self, processed: Processed) -> Option<NormalizedRecord> {
        let Processed { mut record, warnings } = processed;
        for warning in warnings {
            self.report.record_warning(warning);
        }

        if let Err(incomplete) = self.formatter.check_required(&record) {
            tracing::warn!(
                item = incomplete.index,
                field = %incomplete.field,
                reason = %incomplete.reason,
                "Skipping record"
            );
            self.report
                .record_skip(incomplete.index, incomplete.field.header(), incomplete.reason);
            return None;
        }

        if let Some(base) = record.slug.take() {
            let unique = self.slugs.claim(&base);
            if unique != base {
                tracing::warn!(item = record.index, slug = %base, renamed = %unique, "Duplicate slug");
                self.report.record_warning(ConversionWarning::new(
                    WarningKind::DuplicateSlug,
                    CanonicalField::Slug.as_str(),
                    record.index,
                    format!("slug '{}' already used, renamed to '{}'", base, unique),
                ));
            }
            record.slug = Some(unique);
        }

        self.report.record_status(record.status);
        Some(record)
    }

    /// Format an admitted record, checking the row when validation is on
    fn format(&mut self, record: &NormalizedRecord) -> ConversionResult<Option<FormattedRow>> {
        let row = match self.formatter.format_row(record) {
            Ok(row) => row,
            Err(incomplete) => {
                tracing::warn!(item = incomplete.index, field = %incomplete.field, "Skipping record");
                self.report
                    .record_skip(incomplete.index, incomplete.field.header(), incomplete.reason);
                return Ok(None);
            }
        };

        for substitution in &row.encoding_warnings {
            tracing::warn!(item = substitution.index, field = %substitution.field, "{}", substitution);
            self.report.record_warning(ConversionWarning::new(
                WarningKind::Encoding,
                substitution.field.header(),
                substitution.index,
                substitution.to_string(),
            ));
        }

        if let Some(validator) = &self.validator {
            let check = validator.validate(&row, record);
            if !check.is_valid() {
                return Err(ConversionError::conversion(ConversionErrorKind::OutputValidation {
                    message: check.summary(),
                }));
            }
        }

        Ok(Some(row))
    }

    fn write_rows<W: Write>(&mut self, out: &mut RowWriter<W>) -> ConversionResult<()> {
        while let Some(processed) = self.pull()? {
            let Some(record) = self.admit(processed) else {
                continue;
            };
            if let Some(row) = self.format(&record)? {
                out.write_row(&row).map_err(|e| ConversionError::io(e, None))?;
                self.report.converted += 1;
            }
        }
        Ok(())
    }

    fn count_rows(&mut self) -> ConversionResult<()> {
        while let Some(processed) = self.pull()? {
            if self.admit(processed).is_some() {
                self.report.converted += 1;
            }
        }
        Ok(())
    }

    fn mark_completed(&mut self) {
        self.advance(RunState::Completed);
        self.report.elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.report.bytes_read = self.extractor.byte_position();
        self.progress.finish();
        tracing::info!(
            platform = %self.report.platform,
            converted = self.report.converted,
            skipped = self.report.skipped.len(),
            warnings = self.report.warnings.len(),
            elapsed_ms = self.report.elapsed_ms,
            "Run completed"
        );
    }

    fn mark_failed(&mut self, cause: &ConversionError) {
        self.advance(RunState::Failed);
        self.report.failure = Some(cause.to_string());
        self.report.elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.report.bytes_read = self.extractor.byte_position();
        self.progress.finish();
        tracing::warn!(
            error = %cause,
            converted = self.report.converted,
            "Run failed"
        );
    }

    fn complete(mut self) -> ConversionReport {
        self.mark_completed();
        self.report
    }

    fn fail(mut self, cause: ConversionError, rows_written: usize) -> ConversionError {
        self.mark_failed(&cause);
        ConversionError::failed_run(cause, rows_written, self.report)
    }
}

/// Lazy preview of normalized records
///
/// Yields at most the requested number of records that would be written,
/// with unique slugs. Not restartable. Skips, warnings and a structural
/// failure are recorded in [`report`](Self::report) rather than yielded;
/// check it once the iterator is exhausted.
pub struct Preview {
    run: Pipeline,
    remaining: usize,
}

impl Preview {
    pub fn report(&self) -> &ConversionReport {
        &self.run.report
    }

    /// Finish the preview and take its report
    pub fn into_report(mut self) -> ConversionReport {
        self.settle();
        self.run.report
    }

    fn settle(&mut self) {
        if self.run.state == RunState::Streaming {
            self.run.mark_completed();
        }
    }
}

impl Iterator for Preview {
    type Item = NormalizedRecord;

    fn next(&mut self) -> Option<NormalizedRecord> {
        if self.run.state != RunState::Streaming {
            return None;
        }
        if self.remaining == 0 {
            self.settle();
            return None;
        }

        loop {
            match self.run.pull() {
                Ok(Some(processed)) => {
                    if let Some(record) = self.run.admit(processed) {
                        self.remaining -= 1;
                        self.run.report.converted += 1;
                        return Some(record);
                    }
                }
                Ok(None) => {
                    self.settle();
                    return None;
                }
                Err(cause) => {
                    self.run.mark_failed(&cause);
                    return None;
                }
            }
        }
    }
}

impl std::iter::FusedIterator for Preview {}
