//! Content processing: raw extracted values to normalized records
//!
//! Content stays abstract text here; byte encoding happens when rows are
//! formatted.

pub mod encoding;
pub mod html;
pub mod slug;

pub use encoding::{OutputEncoding, PLACEHOLDER};

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::conversion::stats::{ConversionWarning, WarningKind};
use crate::conversion::ConversionConfig;
use crate::parser::RawRecord;
use crate::template::{CanonicalField, PlatformTemplate, PostStatus};

/// A post after content processing, ready for formatting
///
/// Empty values are represented as `None` so the formatter can tell a
/// missing required column from a present one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub index: usize,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub published: Option<NaiveDate>,
    pub featured_image: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
}

/// A normalized record plus the warnings raised on the way
#[derive(Debug, Clone)]
pub struct Processed {
    pub record: NormalizedRecord,
    pub warnings: Vec<ConversionWarning>,
}

/// Applies the configured content policy to raw records
#[derive(Debug, Clone)]
pub struct ContentProcessor {
    config: ConversionConfig,
    strip_pattern: Option<Regex>,
}

impl ContentProcessor {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            config: config.clone(),
            strip_pattern: html::tag_pattern(&config.strip_tags),
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Normalize one raw record. The slug is the base slug; run-wide
    /// uniqueness is the orchestrator's job.
    pub fn process(&self, raw: &RawRecord, template: &PlatformTemplate) -> Processed {
        let index = raw.index;
        let mut warnings = raw.warnings.clone();

        let title = raw.text(CanonicalField::Title).and_then(|t| non_empty(self.process_title(t)));
        let author = raw.text(CanonicalField::Author).and_then(|a| non_empty(self.process_title(a)));

        let content = raw.text(CanonicalField::Content).and_then(|body| {
            let (content, truncated) = self.process_content(body);
            if let Some(original_len) = truncated {
                tracing::warn!(item = index, original_len, "Content truncated");
                warnings.push(ConversionWarning::new(
                    WarningKind::ContentTruncated,
                    CanonicalField::Content.as_str(),
                    index,
                    format!(
                        "content of {} characters truncated to {}",
                        original_len,
                        content.chars().count()
                    ),
                ));
            }
            non_empty(content)
        });

        let excerpt = raw
            .text(CanonicalField::Excerpt)
            .and_then(|e| non_empty(self.process_excerpt(e)))
            .or_else(|| {
                if self.config.derive_excerpt {
                    content.as_deref().and_then(|c| non_empty(self.derive_excerpt(c)))
                } else {
                    None
                }
            });

        let slug = raw
            .text(CanonicalField::Slug)
            .and_then(|s| slug::slugify(&html::to_plain_text(s), self.config.slug_max_length))
            .or_else(|| {
                if self.config.generate_slugs {
                    Some(
                        title
                            .as_deref()
                            .and_then(|t| slug::slugify(t, self.config.slug_max_length))
                            .unwrap_or_else(|| slug::fallback_slug(index)),
                    )
                } else {
                    None
                }
            });

        let status = match raw.text(CanonicalField::Status).map(str::trim) {
            None | Some("") => PostStatus::Draft,
            Some(value) => match template.map_status(value) {
                Some(status) => status,
                None => {
                    tracing::warn!(item = index, value, "Unmapped status, using Draft");
                    warnings.push(ConversionWarning::new(
                        WarningKind::StatusUnmapped,
                        CanonicalField::Status.as_str(),
                        index,
                        format!("status '{}' has no mapping, using Draft", value),
                    ));
                    PostStatus::Draft
                }
            },
        };

        let featured_image = raw
            .text(CanonicalField::FeaturedImage)
            .and_then(|url| non_empty(normalize_url(url)));

        let seo_title = raw
            .text(CanonicalField::SeoTitle)
            .and_then(|t| non_empty(self.process_title(t)))
            .or_else(|| title.clone());
        let seo_description = raw
            .text(CanonicalField::SeoDescription)
            .and_then(|d| non_empty(self.process_excerpt(d)))
            .or_else(|| excerpt.clone());

        let record = NormalizedRecord {
            index,
            title,
            slug,
            content,
            excerpt,
            author,
            published: raw.published,
            featured_image,
            categories: process_terms(raw.list(CanonicalField::Categories)),
            tags: process_terms(raw.list(CanonicalField::Tags)),
            status,
            seo_title,
            seo_description,
        };

        Processed { record, warnings }
    }

    /// Clean body HTML per the configured policy. The second value is the
    /// original length in characters when the content was truncated.
    pub fn process_content(&self, body: &str) -> (String, Option<usize>) {
        let body = html::unwrap_cdata(body);

        let processed = if self.config.preserve_html {
            let mut out = if self.config.sanitize_html {
                html::sanitize(&body)
            } else {
                body.into_owned()
            };
            if let Some(pattern) = &self.strip_pattern {
                out = html::remove_tags(&out, pattern).into_owned();
            }
            let out = html::rewrite_images(&out);
            let out = html::rewrite_links(&out);
            html::normalize_void_tags(out.trim())
        } else if self.config.sanitize_html {
            html::to_plain_text(&html::sanitize(&body))
        } else {
            html::to_plain_text(&body)
        };

        match self.config.max_content_length {
            Some(max) => match html::truncate_at_word(&processed, max) {
                Some(truncated) => {
                    let original_len = processed.chars().count();
                    (truncated, Some(original_len))
                }
                None => (processed, None),
            },
            None => (processed, None),
        }
    }

    /// Titles and author names: plain text on one line
    pub fn process_title(&self, title: &str) -> String {
        html::to_plain_text(&html::unwrap_cdata(title))
    }

    /// Explicit excerpts: plain text within the excerpt length
    pub fn process_excerpt(&self, excerpt: &str) -> String {
        let text = html::to_plain_text(&html::unwrap_cdata(excerpt));
        html::clip_excerpt(&text, self.config.excerpt_max_length, false)
    }

    /// Excerpt from the leading sentences of processed content
    pub fn derive_excerpt(&self, content: &str) -> String {
        let text = html::to_plain_text(content);
        html::clip_excerpt(&text, self.config.excerpt_max_length, true)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Protocol-relative URLs get an explicit https scheme
fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    }
}

/// Category and tag names as plain text, empties and repeats dropped
fn process_terms(terms: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let term = html::to_plain_text(term);
        if !term.is_empty() && !out.contains(&term) {
            out.push(term);
        }
    }
    out
}
