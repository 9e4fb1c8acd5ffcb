//! Platform auto-detection from a document's structural signature
//!
//! Only the head of the document is scanned. Each built-in template carries
//! a [`Signature`]; the confidence for a template is the weighted share of
//! its signature found in the scan:
//!
//! | part           | weight | score                        |
//! |----------------|--------|------------------------------|
//! | root element   | 0.5    | 1 if the root name matches   |
//! | namespace URIs | 0.3    | fraction of needles declared |
//! | marker tags    | 0.2    | fraction of markers seen     |
//!
//! Parts a signature leaves empty are dropped from the denominator.

use std::collections::HashSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

use super::{builtin, PlatformTemplate};
use crate::error::DetectionError;

/// Minimum confidence for auto-detection to accept a template
pub const DETECTION_THRESHOLD: f32 = 0.6;

/// How many bytes of the source detection looks at
pub const PEEK_BYTES: usize = 8 * 1024;

const ROOT_WEIGHT: f32 = 0.5;
const NAMESPACE_WEIGHT: f32 = 0.3;
const MARKER_WEIGHT: f32 = 0.2;

/// Structural fingerprint of a platform's export documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Accepted root element local names
    pub root_elements: Vec<String>,
    /// Namespace URI prefixes; one declared URI starting with a needle counts as a hit
    pub namespaces: Vec<String>,
    /// Distinctive element local names
    pub markers: Vec<String>,
}

/// What the scan of the document head found
#[derive(Debug, Default, Clone)]
pub struct DocumentScan {
    pub root: Option<String>,
    pub namespaces: Vec<String>,
    pub elements: HashSet<String>,
}

/// A detected template and how sure detection was
#[derive(Debug, Clone)]
pub struct DetectionMatch {
    pub template: PlatformTemplate,
    pub confidence: f32,
}

impl Signature {
    /// Confidence in `[0, 1]` that the scanned document belongs to this signature
    pub fn confidence(&self, scan: &DocumentScan) -> f32 {
        let mut weight = 0.0;
        let mut score = 0.0;

        if !self.root_elements.is_empty() {
            weight += ROOT_WEIGHT;
            if let Some(root) = &scan.root {
                if self.root_elements.iter().any(|r| r == root) {
                    score += ROOT_WEIGHT;
                }
            }
        }

        if !self.namespaces.is_empty() {
            weight += NAMESPACE_WEIGHT;
            let hits = self
                .namespaces
                .iter()
                .filter(|needle| scan.namespaces.iter().any(|uri| uri.starts_with(needle.as_str())))
                .count();
            score += NAMESPACE_WEIGHT * hits as f32 / self.namespaces.len() as f32;
        }

        if !self.markers.is_empty() {
            weight += MARKER_WEIGHT;
            let hits = self
                .markers
                .iter()
                .filter(|marker| scan.elements.contains(marker.as_str()))
                .count();
            score += MARKER_WEIGHT * hits as f32 / self.markers.len() as f32;
        }

        if weight == 0.0 {
            0.0
        } else {
            score / weight
        }
    }
}

/// Scan the head of a document. A peek that cuts an element in half is fine:
/// scanning just stops at the first syntax error.
pub fn scan_document(peek: &[u8]) -> DocumentScan {
    let mut reader = Reader::from_reader(peek);
    let mut buf = Vec::new();
    let mut scan = DocumentScan::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => record_element(&mut scan, e, &reader),
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
        buf.clear();
    }

    scan
}

fn record_element<R>(scan: &mut DocumentScan, element: &BytesStart<'_>, reader: &Reader<R>) {
    let local = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
    if scan.root.is_none() {
        scan.root = Some(local.clone());
    }
    scan.elements.insert(local);

    for attr in element.attributes().flatten() {
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            if let Ok(value) = attr.decode_and_unescape_value(reader) {
                scan.namespaces.push(value.into_owned());
            }
        }
    }
}

/// Pick the best built-in template for the document head
pub fn detect_platform(peek: &[u8]) -> Result<DetectionMatch, DetectionError> {
    let scan = scan_document(peek);
    let mut best: Option<DetectionMatch> = None;

    for template in builtin::all() {
        let confidence = template
            .signature()
            .map_or(0.0, |signature| signature.confidence(&scan));
        tracing::debug!(platform = template.name(), confidence, "Detection score");

        // Strictly greater keeps the earlier built-in on ties
        if best.as_ref().map_or(true, |b| confidence > b.confidence) {
            best = Some(DetectionMatch {
                template,
                confidence,
            });
        }
    }

    match best {
        Some(found) if found.confidence >= DETECTION_THRESHOLD => Ok(found),
        Some(found) if found.confidence > 0.0 => Err(DetectionError {
            best_candidate: Some((found.template.name().to_lowercase(), found.confidence)),
            threshold: DETECTION_THRESHOLD,
        }),
        _ => Err(DetectionError {
            best_candidate: None,
            threshold: DETECTION_THRESHOLD,
        }),
    }
}
