//! Built-in templates for WordPress, Ghost and Jekyll exports

use std::collections::BTreeMap;

use super::detect::Signature;
use super::{CanonicalField, PlatformTemplate, PostStatus};

/// Built-in platform names, in detection tie-break order
pub const NAMES: [&str; 3] = ["wordpress", "ghost", "jekyll"];

/// Look up a built-in template by (case-insensitive) name
pub fn by_name(name: &str) -> Option<PlatformTemplate> {
    match name.trim().to_lowercase().as_str() {
        "wordpress" | "wp" => Some(wordpress()),
        "ghost" => Some(ghost()),
        "jekyll" => Some(jekyll()),
        _ => None,
    }
}

/// All built-in templates in tie-break order
pub fn all() -> Vec<PlatformTemplate> {
    vec![wordpress(), ghost(), jekyll()]
}

/// WordPress WXR (RSS 2.0 with `wp:` extensions)
pub fn wordpress() -> PlatformTemplate {
    let mut namespaces = BTreeMap::new();
    namespaces.insert(
        "content".to_string(),
        vec!["http://purl.org/rss/1.0/modules/content/".to_string()],
    );
    namespaces.insert(
        "dc".to_string(),
        vec!["http://purl.org/dc/elements/1.1/".to_string()],
    );
    namespaces.insert(
        "wp".to_string(),
        ["1.0", "1.1", "1.2"]
            .iter()
            .map(|v| format!("http://wordpress.org/export/{}/", v))
            .collect(),
    );
    namespaces.insert(
        "excerpt".to_string(),
        ["1.0", "1.1", "1.2"]
            .iter()
            .map(|v| format!("http://wordpress.org/export/{}/excerpt/", v))
            .collect(),
    );

    PlatformTemplate::build(
        "WordPress",
        "WordPress XML export format (WXR)",
        "item",
        &[
            (CanonicalField::Title, "title"),
            (CanonicalField::Content, "content:encoded"),
            (CanonicalField::Excerpt, "excerpt:encoded"),
            (CanonicalField::Author, "dc:creator"),
            (CanonicalField::Date, "pubDate"),
            (CanonicalField::Status, "wp:status"),
            (CanonicalField::Slug, "wp:post_name"),
            (CanonicalField::Categories, "category[@domain='category']"),
            (CanonicalField::Tags, "category[@domain='post_tag']"),
            (CanonicalField::FeaturedImage, "wp:attachment_url"),
        ],
        &["%a, %d %b %Y %H:%M:%S %z", "%Y-%m-%d %H:%M:%S"],
        &[
            ("publish", PostStatus::Published),
            ("draft", PostStatus::Draft),
            ("private", PostStatus::Draft),
            ("pending", PostStatus::Draft),
            ("future", PostStatus::Draft),
        ],
        namespaces,
    )
    .map(|template| {
        template.with_signature(Signature {
            root_elements: vec!["rss".to_string()],
            namespaces: vec!["http://wordpress.org/export/".to_string()],
            markers: vec![
                "wxr_version".to_string(),
                "post_type".to_string(),
                "post_id".to_string(),
            ],
        })
    })
    .unwrap_or_else(|e| unreachable!("built-in WordPress template is valid: {}", e))
}

/// Ghost export rendered as XML
pub fn ghost() -> PlatformTemplate {
    PlatformTemplate::build(
        "Ghost",
        "Ghost export format (JSON export converted to XML)",
        "post",
        &[
            (CanonicalField::Title, "title"),
            (CanonicalField::Content, "html"),
            (CanonicalField::Excerpt, "excerpt"),
            (CanonicalField::Author, "author"),
            (CanonicalField::Date, "published_at"),
            (CanonicalField::Status, "status"),
            (CanonicalField::Slug, "slug"),
            (CanonicalField::Tags, "tag"),
            (CanonicalField::FeaturedImage, "feature_image"),
            (CanonicalField::SeoTitle, "meta_title"),
            (CanonicalField::SeoDescription, "meta_description"),
        ],
        &[
            "%Y-%m-%dT%H:%M:%S%.fZ",
            "%Y-%m-%dT%H:%M:%S%.f%:z",
            "%Y-%m-%d %H:%M:%S",
        ],
        &[
            ("published", PostStatus::Published),
            ("draft", PostStatus::Draft),
            ("scheduled", PostStatus::Draft),
        ],
        BTreeMap::new(),
    )
    .map(|template| {
        template.with_signature(Signature {
            root_elements: vec!["ghost".to_string()],
            namespaces: Vec::new(),
            markers: vec![
                "html".to_string(),
                "published_at".to_string(),
                "feature_image".to_string(),
                "mobiledoc".to_string(),
            ],
        })
    })
    .unwrap_or_else(|e| unreachable!("built-in Ghost template is valid: {}", e))
}

/// Jekyll posts: front matter keys as elements, body in `content`
pub fn jekyll() -> PlatformTemplate {
    PlatformTemplate::build(
        "Jekyll",
        "Jekyll front matter and markdown",
        "post",
        &[
            (CanonicalField::Title, "title"),
            (CanonicalField::Content, "content"),
            (CanonicalField::Excerpt, "excerpt"),
            (CanonicalField::Author, "author"),
            (CanonicalField::Date, "date"),
            (CanonicalField::Status, "published"),
            (CanonicalField::Slug, "slug"),
            (CanonicalField::Categories, "category"),
            (CanonicalField::Tags, "tag"),
            (CanonicalField::FeaturedImage, "image"),
        ],
        &["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S %z"],
        &[
            ("true", PostStatus::Published),
            ("yes", PostStatus::Published),
            ("published", PostStatus::Published),
            ("false", PostStatus::Draft),
            ("no", PostStatus::Draft),
            ("draft", PostStatus::Draft),
        ],
        BTreeMap::new(),
    )
    .map(|template| {
        template.with_signature(Signature {
            root_elements: vec!["jekyll".to_string(), "site".to_string()],
            namespaces: Vec::new(),
            markers: vec![
                "front_matter".to_string(),
                "layout".to_string(),
                "permalink".to_string(),
            ],
        })
    })
    .unwrap_or_else(|e| unreachable!("built-in Jekyll template is valid: {}", e))
}
