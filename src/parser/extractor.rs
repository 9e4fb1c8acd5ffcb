//! Streaming extraction of one raw record per item element
//!
//! Built on quick-xml's namespace-aware pull reader. Only the item being
//! assembled is held in memory; everything outside item elements is skipped
//! as it streams past.

use std::collections::BTreeMap;
use std::io::BufRead;

use chrono::NaiveDate;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use super::dates::parse_date;
use crate::conversion::stats::{ConversionWarning, WarningKind};
use crate::error::{ParseError, ParseResult};
use crate::template::{CanonicalField, ElementName, PlatformTemplate};

/// A value as extracted, before any content processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Text(String),
    /// Categories and tags: trimmed, de-duplicated, first-seen order
    List(Vec<String>),
}

/// One item's extracted values. Fields the item did not carry are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1-based position of the item in the document
    pub index: usize,
    pub values: BTreeMap<CanonicalField, RawValue>,
    /// Parsed publication date, when the date value matched a format
    pub published: Option<NaiveDate>,
    pub warnings: Vec<ConversionWarning>,
}

impl RawRecord {
    pub fn text(&self, field: CanonicalField) -> Option<&str> {
        match self.values.get(&field) {
            Some(RawValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn list(&self, field: CanonicalField) -> &[String] {
        match self.values.get(&field) {
            Some(RawValue::List(items)) => items,
            _ => &[],
        }
    }

    pub fn has(&self, field: CanonicalField) -> bool {
        self.values.contains_key(&field)
    }
}

/// Owned view of a start tag, detached from the read buffer
struct ElementInfo {
    namespace: Option<Vec<u8>>,
    prefix: Option<Vec<u8>>,
    local: Vec<u8>,
    attributes: Vec<(String, String)>,
    /// Attributes whose value had undecodable bytes replaced
    lossy: Vec<String>,
}

impl ElementInfo {
    fn read(
        namespace: Option<Vec<u8>>,
        start: &BytesStart<'_>,
        with_attributes: bool,
        decoder: Decoder,
    ) -> Self {
        let mut attributes = Vec::new();
        let mut lossy = Vec::new();
        if with_attributes {
            for attr in start.attributes().flatten() {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                let value = decode_text(decoder, &attr.value);
                if value.lossy {
                    lossy.push(key.clone());
                }
                attributes.push((key, value.text));
            }
        }

        Self {
            namespace,
            prefix: start.name().prefix().map(|p| p.as_ref().to_vec()),
            local: start.local_name().as_ref().to_vec(),
            attributes,
            lossy,
        }
    }

    fn name(&self) -> ElementName<'_> {
        ElementName {
            namespace: self.namespace.as_deref(),
            prefix: self.prefix.as_deref(),
            local: &self.local,
        }
    }
}

/// What one pull from the reader amounted to
enum Step {
    Open(ElementInfo),
    Empty(ElementInfo),
    Close,
    Text(Decoded),
    Eof,
    Skip,
}

/// Text being collected for the fields an element maps to
struct Capture {
    depth: usize,
    fields: Vec<CanonicalField>,
    text: String,
}

struct ItemState {
    depth: usize,
    values: BTreeMap<CanonicalField, RawValue>,
    captures: Vec<Capture>,
    /// Fields that took a value with replaced bytes
    lossy: Vec<CanonicalField>,
}

impl ItemState {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            values: BTreeMap::new(),
            captures: Vec::new(),
            lossy: Vec::new(),
        }
    }

    fn mark_lossy(&mut self, field: CanonicalField) {
        if !self.lossy.contains(&field) {
            self.lossy.push(field);
        }
    }
}

/// Pull-based extractor yielding one [`RawRecord`] per item element
///
/// The iterator is fused: after the end of the document or the first
/// [`ParseError`] it only returns `None`.
pub struct StreamingExtractor<R: BufRead> {
    reader: NsReader<R>,
    template: PlatformTemplate,
    buf: Vec<u8>,
    depth: usize,
    item: Option<ItemState>,
    items_extracted: usize,
    finished: bool,
}

impl<R: BufRead> StreamingExtractor<R> {
    pub fn new(reader: R, template: PlatformTemplate) -> Self {
        Self {
            reader: NsReader::from_reader(reader),
            template,
            buf: Vec::with_capacity(8 * 1024),
            depth: 0,
            item: None,
            items_extracted: 0,
            finished: false,
        }
    }

    pub fn template(&self) -> &PlatformTemplate {
        &self.template
    }

    /// Items fully extracted so far
    pub fn items_extracted(&self) -> usize {
        self.items_extracted
    }

    /// Bytes of the source consumed by the parser so far
    pub fn byte_position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn error(&self, message: String) -> ParseError {
        ParseError::new(message, Some(self.byte_position()), self.items_extracted)
    }

    fn read_item(&mut self) -> ParseResult<Option<RawRecord>> {
        loop {
            let in_item = self.item.is_some();
            let capturing = self.item.as_ref().map_or(false, |item| !item.captures.is_empty());

            // Refined from the XML declaration once it has been read
            let decoder = self.reader.decoder();

            self.buf.clear();
            let pulled = match self.reader.read_resolved_event_into(&mut self.buf) {
                Ok((resolved, event)) => {
                    let namespace = match resolved {
                        ResolveResult::Bound(ns) => Some(ns.as_ref().to_vec()),
                        _ => None,
                    };
                    Ok(match event {
                        Event::Start(ref e) => {
                            Step::Open(ElementInfo::read(namespace, e, in_item, decoder))
                        }
                        Event::Empty(ref e) => {
                            Step::Empty(ElementInfo::read(namespace, e, in_item, decoder))
                        }
                        Event::End(_) => Step::Close,
                        Event::Text(ref e) if capturing => Step::Text(decode_text(decoder, e)),
                        Event::CData(ref e) if capturing => Step::Text(decode_cdata(decoder, e)),
                        Event::Eof => Step::Eof,
                        _ => Step::Skip,
                    })
                }
                Err(e) => Err(e.to_string()),
            };
            let step = match pulled {
                Ok(step) => step,
                Err(message) => return Err(self.error(format!("Malformed XML: {}", message))),
            };

            match step {
                Step::Open(info) => {
                    self.depth += 1;
                    if self.item.is_none() {
                        if self.template.item_tag().matches_name(&info.name()) {
                            self.item = Some(ItemState::new(self.depth));
                        }
                    } else {
                        self.open_field(&info, false);
                    }
                }
                Step::Empty(info) => {
                    if self.item.is_none() {
                        if self.template.item_tag().matches_name(&info.name()) {
                            let item = ItemState::new(self.depth + 1);
                            return Ok(Some(self.finish_item(item)));
                        }
                    } else {
                        self.depth += 1;
                        self.open_field(&info, true);
                        self.depth -= 1;
                    }
                }
                Step::Close => {
                    let depth = self.depth;
                    self.depth = self.depth.saturating_sub(1);

                    let closes_item = self.item.as_ref().map_or(false, |item| item.depth == depth);
                    if closes_item {
                        if let Some(item) = self.item.take() {
                            return Ok(Some(self.finish_item(item)));
                        }
                    } else if let Some(item) = self.item.as_mut() {
                        if item.captures.last().map_or(false, |c| c.depth == depth) {
                            if let Some(capture) = item.captures.pop() {
                                for field in capture.fields {
                                    commit(&mut item.values, field, &capture.text);
                                }
                            }
                        }
                    }
                }
                Step::Text(decoded) => {
                    if let Some(item) = self.item.as_mut() {
                        for capture in item.captures.iter_mut() {
                            capture.text.push_str(&decoded.text);
                        }
                        if decoded.lossy {
                            let fields: Vec<_> =
                                item.captures.iter().flat_map(|c| c.fields.clone()).collect();
                            for field in fields {
                                item.mark_lossy(field);
                            }
                        }
                    }
                }
                Step::Eof => {
                    if self.depth > 0 || self.item.is_some() {
                        return Err(self.error(format!(
                            "Unexpected end of document with {} element(s) still open",
                            self.depth.max(1)
                        )));
                    }
                    return Ok(None);
                }
                Step::Skip => {}
            }
        }
    }

    /// Match an element inside the current item against the field mappings
    fn open_field(&mut self, info: &ElementInfo, empty: bool) {
        let Some(item) = self.item.as_mut() else {
            return;
        };
        let name = info.name();
        let mut text_fields = Vec::new();

        for (field, path) in self.template.field_mappings() {
            if !path.matches(&name, &info.attributes) {
                continue;
            }
            match path.attribute() {
                Some(attr) => {
                    if let Some((key, value)) = info.attributes.iter().find(|(key, _)| key == attr) {
                        commit(&mut item.values, *field, value);
                        if info.lossy.contains(key) {
                            item.mark_lossy(*field);
                        }
                    }
                }
                None if empty => commit(&mut item.values, *field, ""),
                None => text_fields.push(*field),
            }
        }

        if !text_fields.is_empty() {
            item.captures.push(Capture {
                depth: self.depth,
                fields: text_fields,
                text: String::new(),
            });
        }
    }

    fn finish_item(&mut self, item: ItemState) -> RawRecord {
        self.items_extracted += 1;
        let index = self.items_extracted;
        let mut warnings = Vec::new();

        let published = match item.values.get(&CanonicalField::Date) {
            Some(RawValue::Text(raw)) if !raw.is_empty() => {
                let parsed = parse_date(raw, self.template.date_formats());
                if parsed.is_none() {
                    tracing::warn!(item = index, value = %raw, "Unparsable date");
                    warnings.push(ConversionWarning::new(
                        WarningKind::DateUnparsed,
                        CanonicalField::Date.as_str(),
                        index,
                        format!("'{}' matched none of the template's date formats", raw),
                    ));
                }
                parsed
            }
            _ => None,
        };

        let encoding = self.reader.decoder().encoding().name();
        for field in &item.lossy {
            tracing::warn!(item = index, field = field.as_str(), encoding, "Undecodable bytes replaced");
            warnings.push(ConversionWarning::new(
                WarningKind::Encoding,
                field.as_str(),
                index,
                format!("bytes not valid in {} were replaced with U+FFFD", encoding),
            ));
        }

        tracing::trace!(item = index, fields = item.values.len(), "Extracted item");

        RawRecord {
            index,
            values: item.values,
            published,
            warnings,
        }
    }
}

impl<R: BufRead> Iterator for StreamingExtractor<R> {
    type Item = ParseResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_item() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                self.item = None;
                Some(Err(error))
            }
        }
    }
}

impl<R: BufRead> std::iter::FusedIterator for StreamingExtractor<R> {}

/// Store a value: single fields keep their first value, list fields collect
/// distinct non-empty values
fn commit(values: &mut BTreeMap<CanonicalField, RawValue>, field: CanonicalField, raw: &str) {
    let value = raw.trim();

    if field.is_multi_valued() {
        if value.is_empty() {
            return;
        }
        if let RawValue::List(items) = values
            .entry(field)
            .or_insert_with(|| RawValue::List(Vec::new()))
        {
            if !items.iter().any(|existing| existing == value) {
                items.push(value.to_string());
            }
        }
    } else {
        values
            .entry(field)
            .or_insert_with(|| RawValue::Text(value.to_string()));
    }
}

/// Text decoded from the document's encoding
struct Decoded {
    text: String,
    /// Some bytes were not valid in that encoding and were replaced
    lossy: bool,
}

fn decode_cdata(decoder: Decoder, raw: &[u8]) -> Decoded {
    match decoder.decode(raw) {
        Ok(text) => Decoded {
            text: text.into_owned(),
            lossy: false,
        },
        Err(_) => Decoded {
            text: String::from_utf8_lossy(raw).into_owned(),
            lossy: true,
        },
    }
}

/// Decode and unescape XML text; entities XML does not define are decoded
/// as HTML entities where known and kept verbatim otherwise
fn decode_text(decoder: Decoder, raw: &[u8]) -> Decoded {
    let Decoded { text, lossy } = decode_cdata(decoder, raw);
    let text = match quick_xml::escape::unescape(&text) {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => html_escape::decode_html_entities(&text).into_owned(),
    };
    Decoded { text, lossy }
}
