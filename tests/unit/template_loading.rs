use std::fs;
use std::path::PathBuf;

use assert_matches::assert_matches;
use tempfile::TempDir;

use blogconv::error::TemplateError;
use blogconv::template::{builtin, CanonicalField, PlatformTemplate, PostStatus, TemplateDocument};

fn write_template(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const MINIMAL: &str = r#"{
    "item_tag": "entry",
    "field_mappings": {
        "title": "headline",
        "date": "posted",
        "status": "state"
    },
    "date_formats": ["%d/%m/%Y"],
    "status_mapping": {"LIVE": "Published", "hidden": "draft"}
}"#;

#[test]
fn test_load_json_template() {
    let dir = TempDir::new().unwrap();
    let path = write_template(&dir, "newsroom.json", MINIMAL);

    let template = PlatformTemplate::from_file(&path).unwrap();
    // Unnamed documents take the file stem
    assert_eq!(template.name(), "newsroom");
    assert_eq!(template.mapping(CanonicalField::Title).unwrap().as_str(), "headline");
    assert_eq!(template.date_formats(), ["%d/%m/%Y".to_string()]);
    assert_eq!(template.map_status("live"), Some(PostStatus::Published));
    assert_eq!(template.map_status(" Hidden "), Some(PostStatus::Draft));
    assert_eq!(template.map_status("archived"), None);
    assert!(template.signature().is_none());
}

#[test]
fn test_load_yaml_template() {
    let dir = TempDir::new().unwrap();
    let path = write_template(
        &dir,
        "blog.yml",
        "name: Blog\nitem_tag: article\nfield_mappings:\n  title: name\n  tags: \"label[@kind='tag']\"\n",
    );

    let template = PlatformTemplate::from_file(&path).unwrap();
    assert_eq!(template.name(), "Blog");
    assert_eq!(template.item_tag().as_str(), "article");
    assert!(template.mapping(CanonicalField::Tags).is_some());
    assert!(template.mapping(CanonicalField::Date).is_none());
}

#[test]
fn test_missing_file() {
    let error = PlatformTemplate::from_file(&PathBuf::from("no/such/template.json")).unwrap_err();
    assert_matches!(error, TemplateError::Io { .. });
}

#[test]
fn test_malformed_documents() {
    let dir = TempDir::new().unwrap();

    let json = write_template(&dir, "broken.json", "{ \"item_tag\": ");
    assert_matches!(PlatformTemplate::from_file(&json), Err(TemplateError::Syntax { .. }));

    let yaml = write_template(&dir, "broken.yaml", "item_tag: [unclosed");
    assert_matches!(PlatformTemplate::from_file(&yaml), Err(TemplateError::Syntax { .. }));
}

#[test]
fn test_invalid_templates() {
    let cases = [
        (r#"{"item_tag": "", "field_mappings": {"title": "t"}}"#, "item_tag must not be empty"),
        (r#"{"item_tag": "entry", "field_mappings": {}}"#, "field_mappings must not be empty"),
        (r#"{"item_tag": "entry[@a='b']", "field_mappings": {"title": "t"}}"#, "item_tag cannot"),
        (r#"{"item_tag": "entry", "field_mappings": {"body": "t"}}"#, "not a canonical field"),
        (r#"{"item_tag": "entry", "field_mappings": {"title": "a b"}}"#, "invalid source path"),
        (r#"{"item_tag": "entry", "field_mappings": {"date": "d"}}"#, "date_formats must list"),
        (
            r#"{"item_tag": "entry", "field_mappings": {"date": "d"}, "date_formats": ["%Q"]}"#,
            "unparsable date format",
        ),
        (
            r#"{"item_tag": "entry", "field_mappings": {"title": "t"}, "status_mapping": {"x": "live"}}"#,
            "must be 'Published' or 'Draft'",
        ),
    ];

    for (json, expected) in cases {
        let error = TemplateDocument::from_json(json)
            .and_then(TemplateDocument::into_template)
            .unwrap_err();
        assert_matches!(&error, TemplateError::Invalid { .. });
        assert!(
            error.to_string().contains(expected),
            "expected '{}' in '{}'",
            expected,
            error
        );
    }
}

#[test]
fn test_unknown_builtin() {
    let error = PlatformTemplate::load("blogger").unwrap_err();
    assert_matches!(&error, TemplateError::UnknownPlatform { name, .. } if name == "blogger");
    assert!(error.to_string().contains("wordpress, ghost, jekyll"));

    assert_eq!(PlatformTemplate::load("WP").unwrap().name(), "WordPress");
}

#[test]
fn test_builtin_round_trips_through_document() {
    for template in builtin::all() {
        let document = TemplateDocument::from(&template);
        let json = serde_json::to_string(&document).unwrap();
        let rebuilt = TemplateDocument::from_json(&json)
            .and_then(TemplateDocument::into_template)
            .unwrap();

        assert_eq!(rebuilt.name(), template.name());
        assert_eq!(rebuilt.item_tag(), template.item_tag());
        assert_eq!(rebuilt.field_mappings(), template.field_mappings());
        assert_eq!(rebuilt.status_mapping(), template.status_mapping());
        assert_eq!(rebuilt.date_formats(), template.date_formats());
    }
}
