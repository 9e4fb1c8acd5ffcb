//! Platform detection, built-in templates and custom templates

use std::path::PathBuf;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use blogconv::conversion::RunState;
use blogconv::error::ConversionError;
use blogconv::template::{builtin, PostStatus};
use blogconv::validation::parse_record;
use blogconv::{ConversionConfig, NormalizedRecord, PlatformSelector, PlatformTemplate, XmlSource};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn preview_all(name: &str, platform: PlatformSelector) -> (Vec<NormalizedRecord>, String) {
    let mut preview = blogconv::preview(XmlSource::from_file(fixture(name)), platform, 100).unwrap();
    let records: Vec<_> = preview.by_ref().collect();
    let report = preview.into_report();
    assert_eq!(report.state, RunState::Completed);
    assert!(report.failure.is_none());
    (records, report.platform)
}

#[test]
fn test_detects_each_builtin_fixture() {
    for (name, platform) in [
        ("sample_wordpress.xml", "WordPress"),
        ("sample_ghost.xml", "Ghost"),
        ("sample_jekyll.xml", "Jekyll"),
    ] {
        let report = blogconv::stats(XmlSource::from_file(fixture(name)), PlatformSelector::Auto).unwrap();
        assert_eq!(report.platform, platform, "detected platform for {}", name);
        assert_eq!(report.state, RunState::Completed);
    }
}

#[test]
fn test_plain_rss_is_rejected() {
    let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>News</title>
<item><title>One</title><description>Plain feed item</description></item>
</channel></rss>"#;

    let error = blogconv::stats(rss, PlatformSelector::Auto).unwrap_err();
    assert_matches!(error.root_cause(), ConversionError::Detection(detection) => {
        let (name, confidence) = detection.best_candidate.clone().unwrap();
        assert_eq!(name, "wordpress");
        assert!(confidence < detection.threshold);
    });
    assert!(error.user_message().contains("--platform"));
}

#[test]
fn test_unrelated_document_has_no_candidate() {
    let error = blogconv::stats(
        XmlSource::from_file(fixture("sample_atom.xml")),
        PlatformSelector::Auto,
    )
    .unwrap_err();
    assert_matches!(
        error.root_cause(),
        ConversionError::Detection(detection) if detection.best_candidate.is_none()
    );

    // Nothing was read past detection, but the run still reports
    let report = error.report().unwrap();
    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.total_items, 0);
    assert!(report.failure.as_deref().unwrap().contains("Could not detect platform"));
}

#[test]
fn test_named_platform_bypasses_detection() {
    // An explicit platform is trusted even when the document would not detect
    let rss = r#"<rss><channel><item><title>One</title></item></channel></rss>"#;
    let report = blogconv::stats(rss, PlatformSelector::Named("WordPress".to_string())).unwrap();
    assert_eq!(report.total_items, 1);
    assert_eq!(report.converted, 0);
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn test_unknown_platform_name() {
    let error = blogconv::stats("<rss/>", "medium".parse::<PlatformSelector>().unwrap()).unwrap_err();
    assert_matches!(error.root_cause(), ConversionError::Template(_));
    assert!(error.to_string().contains("wordpress, ghost, jekyll"));
    assert_eq!(error.report().map(|report| report.state), Some(RunState::Failed));
    assert_eq!(error.rows_written(), Some(0));
}

#[test]
fn test_unknown_platform_convert_reports_failure() {
    let mut out = Vec::new();
    let error = blogconv::convert(
        XmlSource::from_file(fixture("sample_wordpress.xml")),
        PlatformSelector::Named("blogger".to_string()),
        &ConversionConfig::default(),
        &mut out,
    )
    .unwrap_err();

    let report = error.report().unwrap();
    assert_eq!(report.mode, blogconv::conversion::RunMode::Convert);
    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.converted, 0);
    assert!(out.is_empty());
}

#[test]
fn test_ghost_posts() {
    let (records, platform) = preview_all("sample_ghost.xml", PlatformSelector::Auto);
    assert_eq!(platform, "Ghost");
    assert_eq!(records.len(), 2);

    let theme = &records[0];
    assert_eq!(theme.slug.as_deref(), Some("shipping-the-ghost-theme"));
    assert_eq!(theme.featured_image.as_deref(), Some("https://cdn.example.com/theme.png"));
    assert_eq!(theme.tags, vec!["Release", "Design"]);
    assert!(theme.categories.is_empty());
    assert_eq!(theme.seo_title.as_deref(), Some("Ghost theme release"));
    assert_eq!(theme.seo_description.as_deref(), Some("What changed in the new theme."));
    assert_eq!(theme.published, NaiveDate::from_ymd_opt(2023, 11, 2));
    assert_eq!(theme.status, PostStatus::Published);

    let roadmap = &records[1];
    assert_eq!(roadmap.slug.as_deref(), Some("roadmap-draft"));
    assert_eq!(roadmap.status, PostStatus::Draft);
    assert_eq!(roadmap.seo_title.as_deref(), Some("Roadmap Draft"));
    assert_eq!(roadmap.excerpt.as_deref(), Some("Ideas for next quarter."));
    assert_eq!(roadmap.featured_image, None);
}

#[test]
fn test_jekyll_posts() {
    let (records, platform) = preview_all("sample_jekyll.xml", PlatformSelector::Auto);
    assert_eq!(platform, "Jekyll");
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.slug.as_deref(), Some("static-sites-are-back"));
    assert_eq!(first.status, PostStatus::Published);
    assert_eq!(first.categories, vec!["Web"]);
    assert_eq!(first.tags, vec!["jekyll", "static"]);
    assert_eq!(first.published, NaiveDate::from_ymd_opt(2022, 6, 10));
    assert!(first.excerpt.as_deref().unwrap().contains("They never really left."));

    let second = &records[1];
    assert_eq!(second.status, PostStatus::Draft);
    assert_eq!(second.published, NaiveDate::from_ymd_opt(2022, 7, 1));
}

#[test]
fn test_jekyll_converts_to_csv() {
    let mut out = Vec::new();
    let summary = blogconv::convert(
        XmlSource::from_file(fixture("sample_jekyll.xml")),
        PlatformSelector::Named("jekyll".to_string()),
        &ConversionConfig::default(),
        &mut out,
    )
    .unwrap();
    assert_eq!(summary.rows_written, 2);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<_> = text.split("\r\n").filter(|l| !l.is_empty()).collect();
    let second = parse_record(lines[2], ',').unwrap();
    assert_eq!(second[0], "Notes on Liquid");
    assert_eq!(second[5], "2022-07-01");
    assert_eq!(second[9], "Draft");
}

fn assert_atom_entry(records: &[NormalizedRecord], platform: &str) {
    assert_eq!(platform, "Atom");
    assert_eq!(records.len(), 1);

    let entry = &records[0];
    assert_eq!(entry.title.as_deref(), Some("First Entry"));
    assert_eq!(entry.slug.as_deref(), Some("first-entry"));
    assert_eq!(entry.author.as_deref(), Some("Avery"));
    assert_eq!(entry.published, NaiveDate::from_ymd_opt(2021, 3, 4));
    assert_eq!(entry.categories, vec!["journal", "atom"]);
    assert_eq!(
        entry.featured_image.as_deref(),
        Some("https://journal.example.com/first.jpg")
    );
    assert_eq!(entry.excerpt.as_deref(), Some("The first entry."));
    assert_eq!(entry.content.as_deref(), Some("<p>Hello from Atom.</p>"));
    // No status mapping: everything lands as a draft
    assert_eq!(entry.status, PostStatus::Draft);
}

#[test]
fn test_custom_json_template() {
    let (records, platform) = preview_all(
        "sample_atom.xml",
        PlatformSelector::Custom(fixture("custom_template.json")),
    );
    assert_atom_entry(&records, &platform);
}

#[test]
fn test_custom_yaml_template() {
    let (records, platform) = preview_all(
        "sample_atom.xml",
        PlatformSelector::Custom(fixture("custom_template.yaml")),
    );
    assert_atom_entry(&records, &platform);
}

#[test]
fn test_prebuilt_template_selector() {
    let template = PlatformTemplate::from_file(&fixture("custom_template.json")).unwrap();
    let (records, platform) = preview_all("sample_atom.xml", PlatformSelector::Template(template));
    assert_atom_entry(&records, &platform);
}

#[test]
fn test_builtin_listing() {
    let names: Vec<String> = blogconv::list_platforms()
        .iter()
        .map(|t| t.name().to_string())
        .collect();
    assert_eq!(names, vec!["WordPress", "Ghost", "Jekyll"]);
    assert_eq!(builtin::NAMES.len(), names.len());
}
