use std::collections::BTreeMap;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use blogconv::content::{html, slug, ContentProcessor};
use blogconv::conversion::{ConversionConfig, WarningKind};
use blogconv::parser::{RawRecord, RawValue};
use blogconv::template::{builtin, CanonicalField, PostStatus};

fn raw(index: usize, values: &[(CanonicalField, &str)]) -> RawRecord {
    let mut map = BTreeMap::new();
    for (field, value) in values {
        let value = if field.is_multi_valued() {
            RawValue::List(value.split('|').map(str::to_string).collect())
        } else {
            RawValue::Text(value.to_string())
        };
        map.insert(*field, value);
    }
    RawRecord {
        index,
        values: map,
        published: NaiveDate::from_ymd_opt(2024, 3, 9),
        warnings: Vec::new(),
    }
}

#[test]
fn test_sanitize_strips_script_urls_and_handlers() {
    let clean = html::sanitize(r#"<a href="javascript:x()" onclick="y()">link</a><style>p{}</style>"#);
    assert_eq!(clean, "<a>link</a>");

    // Ordinary attributes survive
    let clean = html::sanitize(r#"<a href="https://example.com" title="t">ok</a>"#);
    assert_eq!(clean, r#"<a href="https://example.com" title="t">ok</a>"#);
}

#[test]
fn test_void_tags_are_self_closed() {
    assert_eq!(
        html::normalize_void_tags(r#"<img src="/cup.jpg"><br></br><hr/>"#),
        r#"<img src="/cup.jpg" /><br /><hr />"#
    );
}

#[test]
fn test_plain_text_conversion() {
    assert_eq!(
        html::to_plain_text("<h1>Title</h1><p>One &amp; two</p><!-- note -->"),
        "Title One & two"
    );
    assert_eq!(html::to_plain_text("  spaced\n\tout  "), "spaced out");
}

#[test]
fn test_truncation_and_excerpts() {
    assert_eq!(html::truncate_at_word("one two three", 9).as_deref(), Some("one two"));
    assert_eq!(html::truncate_at_word("short", 10), None);

    assert_eq!(
        html::clip_excerpt("First one. Second one is longer.", 15, true),
        "First one."
    );
    assert_eq!(html::clip_excerpt("alpha beta gamma delta", 12, false), "alpha...");
    assert_eq!(html::clip_excerpt("fits", 12, false), "fits");
}

#[test]
fn test_slugify() {
    assert_eq!(slug::slugify("Hello, World!", 60).as_deref(), Some("hello-world"));
    assert_eq!(slug::slugify("Café & Déjà Vu", 60).as_deref(), Some("cafe-deja-vu"));
    assert_eq!(slug::slugify("  --Rust 2024--  ", 60).as_deref(), Some("rust-2024"));
    assert_eq!(slug::slugify("one two three", 8).as_deref(), Some("one-two"));
    assert_eq!(slug::slugify("!!!", 60), None);
    assert_eq!(slug::fallback_slug(7), "post-7");
}

#[test]
fn test_plain_text_policy() {
    let processor = ContentProcessor::new(&ConversionConfig::plain_text());
    let (content, truncated) = processor
        .process_content(r#"<p>Coffee &mdash; and a strange feeling.</p><img src="/cup.jpg"><br>"#);
    assert_eq!(content, "Coffee \u{2014} and a strange feeling.");
    assert_eq!(truncated, None);
}

#[test]
fn test_images_and_links_are_rewritten() {
    let processor = ContentProcessor::new(&ConversionConfig::default());
    let (content, _) = processor.process_content(
        r#"<p>See <a href="//example.org/guide">the guide</a> or <a href="/faq">FAQ</a>.</p><img src="//cdn.example.org/x.png"><img alt="gone">"#,
    );
    assert_eq!(
        content,
        r#"<p>See <a href="https://example.org/guide" rel="noopener" target="_blank">the guide</a> or <a href="/faq">FAQ</a>.</p><img src="https://cdn.example.org/x.png" alt="Image" />"#
    );
}

#[test]
fn test_strip_tags_keep_inner_text() {
    let config = ConversionConfig::default().with_strip_tag("span");
    let processor = ContentProcessor::new(&config);
    let (content, _) = processor.process_content(r#"<p><span class="x">Hi</span> there</p>"#);
    assert_eq!(content, "<p>Hi there</p>");
}

#[test]
fn test_unsanitized_html_is_kept() {
    let config = ConversionConfig::default().with_sanitize_html(false);
    let processor = ContentProcessor::new(&config);
    let (content, _) = processor.process_content("<p>x</p><script>y()</script>");
    assert_eq!(content, "<p>x</p><script>y()</script>");
}

#[test]
fn test_truncation_reports_original_length() {
    let config = ConversionConfig::plain_text().with_max_content_length(Some(12));
    let processor = ContentProcessor::new(&config);
    let (content, truncated) = processor.process_content("<p>alpha beta gamma delta</p>");
    assert_eq!(content, "alpha beta");
    assert_eq!(truncated, Some(22));
}

#[test]
fn test_unmapped_status_becomes_draft() {
    let processor = ContentProcessor::new(&ConversionConfig::default());
    let record = raw(
        3,
        &[
            (CanonicalField::Title, "Binned"),
            (CanonicalField::Status, "trash"),
        ],
    );

    let processed = processor.process(&record, &builtin::wordpress());
    assert_eq!(processed.record.status, PostStatus::Draft);
    assert_eq!(processed.warnings.len(), 1);
    assert_eq!(processed.warnings[0].kind, WarningKind::StatusUnmapped);
    assert_eq!(processed.warnings[0].index, 3);

    // An absent status is a draft without a warning
    let processed = processor.process(&raw(4, &[(CanonicalField::Title, "Quiet")]), &builtin::wordpress());
    assert_eq!(processed.record.status, PostStatus::Draft);
    assert!(processed.warnings.is_empty());
}

#[test]
fn test_slug_sources() {
    let processor = ContentProcessor::new(&ConversionConfig::default());
    let wordpress = builtin::wordpress();

    let from_source = raw(
        1,
        &[
            (CanonicalField::Title, "Ignored For Slug"),
            (CanonicalField::Slug, "Mixed Case Slug"),
        ],
    );
    assert_eq!(
        processor.process(&from_source, &wordpress).record.slug.as_deref(),
        Some("mixed-case-slug")
    );

    let untitled = raw(9, &[(CanonicalField::Title, "???")]);
    let processed = processor.process(&untitled, &wordpress);
    assert_eq!(processed.record.title.as_deref(), Some("???"));
    assert_eq!(processed.record.slug.as_deref(), Some("post-9"));

    let source_only = ContentProcessor::new(&ConversionConfig::default().with_generate_slugs(false));
    let titled = raw(2, &[(CanonicalField::Title, "Has A Title")]);
    assert_eq!(source_only.process(&titled, &wordpress).record.slug, None);
}

#[test]
fn test_excerpt_derivation_can_be_disabled() {
    let record = raw(
        1,
        &[
            (CanonicalField::Title, "Post"),
            (CanonicalField::Content, "<p>Only a body.</p>"),
        ],
    );

    let derived = ContentProcessor::new(&ConversionConfig::default())
        .process(&record, &builtin::wordpress())
        .record;
    assert_eq!(derived.excerpt.as_deref(), Some("Only a body."));
    assert_eq!(derived.seo_description.as_deref(), Some("Only a body."));

    let mut config = ConversionConfig::default();
    config.derive_excerpt = false;
    let plain = ContentProcessor::new(&config)
        .process(&record, &builtin::wordpress())
        .record;
    assert_eq!(plain.excerpt, None);
    assert_eq!(plain.seo_description, None);
}

#[test]
fn test_terms_are_cleaned_and_deduplicated() {
    let processor = ContentProcessor::new(&ConversionConfig::default());
    let record = raw(
        1,
        &[
            (CanonicalField::Title, "Terms"),
            (CanonicalField::Categories, "News|| News |<b>News</b>|Rust &amp; XML"),
        ],
    );
    let out = processor.process(&record, &builtin::wordpress()).record;
    assert_eq!(out.categories, vec!["News", "Rust & XML"]);
    assert!(out.tags.is_empty());
}
