//! Streaming behaviour on large synthetic exports

use std::io::{self, BufReader, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use assert_matches::assert_matches;

use blogconv::conversion::{CancelToken, ConversionOrchestrator, RunState};
use blogconv::error::{ConversionError, ConversionErrorKind};
use blogconv::parser::StreamingExtractor;
use blogconv::template::builtin;
use blogconv::{ConversionConfig, PlatformSelector, XmlSource};

const POSTS: usize = 10_000;

/// Renders a WordPress export one post at a time, never holding the whole
/// document
struct SyntheticExport {
    posts: usize,
    next: usize,
    pending: Vec<u8>,
    offset: usize,
    produced: Arc<AtomicU64>,
    cancel_at: Option<(usize, CancelToken)>,
}

impl SyntheticExport {
    fn new(posts: usize) -> Self {
        Self {
            posts,
            next: 0,
            pending: Vec::new(),
            offset: 0,
            produced: Arc::new(AtomicU64::new(0)),
            cancel_at: None,
        }
    }

    fn cancel_at(mut self, post: usize, token: CancelToken) -> Self {
        self.cancel_at = Some((post, token));
        self
    }

    fn refill(&mut self) -> bool {
        let chunk = if self.next == 0 {
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                "\n",
                r#"<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:wp="http://wordpress.org/export/1.2/">"#,
                "\n<channel><title>Synthetic</title>\n"
            )
            .to_string()
        } else if self.next <= self.posts {
            if let Some((post, token)) = &self.cancel_at {
                if self.next == *post {
                    token.cancel();
                }
            }
            format!(
                "<item><title>Synthetic post {n}</title><dc:creator>bot</dc:creator><pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate><content:encoded><![CDATA[<p>Body of post {n} with a little text.</p>]]></content:encoded><wp:status>publish</wp:status><category domain=\"category\">Bulk</category></item>\n",
                n = self.next
            )
        } else if self.next == self.posts + 1 {
            "</channel>\n</rss>\n".to_string()
        } else {
            return false;
        };

        self.next += 1;
        self.pending = chunk.into_bytes();
        self.offset = 0;
        true
    }
}

impl Read for SyntheticExport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.offset == self.pending.len() {
            if !self.refill() {
                return Ok(0);
            }
        }
        let n = buf.len().min(self.pending.len() - self.offset);
        buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
        self.offset += n;
        self.produced.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Counts rows without keeping them
#[derive(Default)]
struct LineCounter {
    lines: usize,
}

impl Write for LineCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lines += buf.iter().filter(|&&b| b == b'\n').count();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_extractor_reads_no_further_than_its_buffer() {
    let export = SyntheticExport::new(POSTS);
    let produced = Arc::clone(&export.produced);
    let mut extractor = StreamingExtractor::new(BufReader::new(export), builtin::wordpress());

    let mut count = 0;
    let mut last_position = 0;
    while let Some(record) = extractor.next() {
        let record = record.unwrap();
        count += 1;
        assert_eq!(record.index, count);

        let position = extractor.byte_position();
        assert!(position > last_position);
        last_position = position;

        // Only the reader's buffer may run ahead of the parser
        let ahead = produced.load(Ordering::Relaxed).saturating_sub(position);
        assert!(ahead <= 64 * 1024, "source read {} bytes ahead at post {}", ahead, count);
    }

    assert_eq!(count, POSTS);
    assert_eq!(extractor.items_extracted(), POSTS);
}

#[test]
fn test_large_export_converts_every_post() {
    let orchestrator = ConversionOrchestrator::new(
        PlatformSelector::Named("wordpress".to_string()),
        ConversionConfig::default(),
    );
    let progress = orchestrator.progress();

    let mut counter = LineCounter::default();
    let summary = orchestrator
        .convert(XmlSource::from_reader(SyntheticExport::new(POSTS)), &mut counter)
        .unwrap();

    assert_eq!(summary.rows_written, POSTS);
    assert_eq!(summary.report.converted, POSTS);
    assert_eq!(counter.lines, POSTS + 1);
    assert_eq!(summary.report.warnings.len(), 0);

    assert_eq!(progress.records_processed(), POSTS);
    assert!(progress.is_finished());
    assert_eq!(progress.total_bytes(), None);
}

#[test]
fn test_auto_detection_on_unsized_reader() {
    let report = blogconv::stats(
        XmlSource::from_reader(SyntheticExport::new(500)),
        PlatformSelector::Auto,
    )
    .unwrap();
    assert_eq!(report.platform, "WordPress");
    assert_eq!(report.total_items, 500);
}

#[test]
fn test_cancellation_stops_between_records() {
    let token = CancelToken::new();
    let orchestrator = ConversionOrchestrator::new(
        PlatformSelector::Named("wordpress".to_string()),
        ConversionConfig::default(),
    )
    .with_cancel_token(token.clone());

    let export = SyntheticExport::new(POSTS).cancel_at(100, token);
    let mut counter = LineCounter::default();
    let error = orchestrator
        .convert(XmlSource::from_reader(export), &mut counter)
        .unwrap_err();

    assert_matches!(
        error.root_cause(),
        ConversionError::Conversion {
            kind: ConversionErrorKind::Cancelled { .. },
            ..
        }
    );
    let written = error.rows_written().unwrap();
    assert!(written > 0 && written < POSTS);
    assert_eq!(counter.lines, written + 1);

    let report = error.report().unwrap();
    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.converted, written);
}
