//! Platform templates: declarative descriptions of how to pull canonical
//! post fields out of a blog export.
//!
//! Supporting a new platform means authoring a template, either as a
//! built-in in [`builtin`] or as a custom JSON/YAML document loaded through
//! [`custom`]. The extractor never branches on the platform.

pub mod builtin;
pub mod custom;
pub mod detect;
pub mod path;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::{ConversionResult, TemplateError, TemplateResult};

pub use custom::TemplateDocument;
pub use detect::{detect_platform, DetectionMatch, Signature, DETECTION_THRESHOLD};
pub use path::{ElementName, NamespaceMatch, SourcePath};

/// The fixed set of normalized post attributes every template maps into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Title,
    Slug,
    Content,
    Excerpt,
    Author,
    Date,
    Status,
    Categories,
    Tags,
    FeaturedImage,
    SeoTitle,
    SeoDescription,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 12] = [
        CanonicalField::Title,
        CanonicalField::Slug,
        CanonicalField::Content,
        CanonicalField::Excerpt,
        CanonicalField::Author,
        CanonicalField::Date,
        CanonicalField::Status,
        CanonicalField::Categories,
        CanonicalField::Tags,
        CanonicalField::FeaturedImage,
        CanonicalField::SeoTitle,
        CanonicalField::SeoDescription,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Title => "title",
            CanonicalField::Slug => "slug",
            CanonicalField::Content => "content",
            CanonicalField::Excerpt => "excerpt",
            CanonicalField::Author => "author",
            CanonicalField::Date => "date",
            CanonicalField::Status => "status",
            CanonicalField::Categories => "categories",
            CanonicalField::Tags => "tags",
            CanonicalField::FeaturedImage => "featured_image",
            CanonicalField::SeoTitle => "seo_title",
            CanonicalField::SeoDescription => "seo_description",
        }
    }

    /// Fields that collect every matching element instead of the first
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, CanonicalField::Categories | CanonicalField::Tags)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == wanted)
            .ok_or_else(|| format!("'{}' is not a canonical field", s))
    }
}

/// Canonical publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostStatus {
    Published,
    Draft,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Published => "Published",
            PostStatus::Draft => "Draft",
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "published" => Ok(PostStatus::Published),
            "draft" => Ok(PostStatus::Draft),
            other => Err(format!(
                "status target '{}' must be 'Published' or 'Draft'",
                other
            )),
        }
    }
}

/// A loaded, validated platform template. Immutable once built.
#[derive(Debug, Clone)]
pub struct PlatformTemplate {
    name: String,
    description: String,
    item_tag: SourcePath,
    field_mappings: BTreeMap<CanonicalField, SourcePath>,
    date_formats: Vec<String>,
    status_mapping: BTreeMap<String, PostStatus>,
    namespaces: BTreeMap<String, Vec<String>>,
    signature: Option<Signature>,
}

impl PlatformTemplate {
    /// Load a built-in template by name
    pub fn load(name: &str) -> TemplateResult<Self> {
        builtin::by_name(name).ok_or_else(|| TemplateError::UnknownPlatform {
            name: name.to_string(),
            available: builtin::NAMES.join(", "),
        })
    }

    /// Load and validate a custom template document
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        TemplateDocument::from_file(path)?.into_template()
    }

    /// Validated constructor shared by built-ins and custom documents
    pub fn build(
        name: &str,
        description: &str,
        item_tag: &str,
        field_mappings: &[(CanonicalField, &str)],
        date_formats: &[&str],
        status_mapping: &[(&str, PostStatus)],
        namespaces: BTreeMap<String, Vec<String>>,
    ) -> TemplateResult<Self> {
        if item_tag.trim().is_empty() {
            return Err(TemplateError::invalid(name, "item_tag must not be empty"));
        }
        let item_tag = SourcePath::parse(item_tag)
            .map_err(|e| TemplateError::invalid(name, format!("item_tag: {}", e)))?
            .resolve_prefixes(&namespaces);
        if item_tag.needs_attributes() {
            return Err(TemplateError::invalid(
                name,
                "item_tag cannot use attribute filters or attribute extraction",
            ));
        }

        if field_mappings.is_empty() {
            return Err(TemplateError::invalid(name, "field_mappings must not be empty"));
        }

        let mut mappings = BTreeMap::new();
        for (field, raw_path) in field_mappings {
            let path = SourcePath::parse(raw_path)
                .map_err(|e| TemplateError::invalid(name, format!("mapping for '{}': {}", field, e)))?
                .resolve_prefixes(&namespaces);
            mappings.insert(*field, path);
        }

        for format in date_formats {
            validate_date_format(format)
                .map_err(|e| TemplateError::invalid(name, e))?;
        }
        if mappings.contains_key(&CanonicalField::Date) && date_formats.is_empty() {
            return Err(TemplateError::invalid(
                name,
                "date_formats must list at least one format when 'date' is mapped",
            ));
        }

        let status_mapping = status_mapping
            .iter()
            .map(|(source, status)| (source.trim().to_lowercase(), *status))
            .collect();

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            item_tag,
            field_mappings: mappings,
            date_formats: date_formats.iter().map(|f| f.to_string()).collect(),
            status_mapping,
            namespaces,
            signature: None,
        })
    }

    pub(crate) fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn item_tag(&self) -> &SourcePath {
        &self.item_tag
    }

    pub fn field_mappings(&self) -> &BTreeMap<CanonicalField, SourcePath> {
        &self.field_mappings
    }

    pub fn mapping(&self, field: CanonicalField) -> Option<&SourcePath> {
        self.field_mappings.get(&field)
    }

    pub fn date_formats(&self) -> &[String] {
        &self.date_formats
    }

    pub fn status_mapping(&self) -> &BTreeMap<String, PostStatus> {
        &self.status_mapping
    }

    pub fn namespaces(&self) -> &BTreeMap<String, Vec<String>> {
        &self.namespaces
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Map a source status value to a canonical one
    pub fn map_status(&self, raw: &str) -> Option<PostStatus> {
        self.status_mapping.get(&raw.trim().to_lowercase()).copied()
    }
}

/// Reject strftime patterns chrono cannot interpret
fn validate_date_format(format: &str) -> Result<(), String> {
    if format.trim().is_empty() {
        return Err("date format must not be empty".to_string());
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("unparsable date format '{}'", format));
    }
    Ok(())
}

/// How the caller chooses the template for a run
#[derive(Debug, Clone)]
pub enum PlatformSelector {
    /// Detect from the document's structural signature
    Auto,
    /// A built-in platform by name
    Named(String),
    /// A custom template document on disk
    Custom(PathBuf),
    /// An already-built template
    Template(PlatformTemplate),
}

impl PlatformSelector {
    /// Resolve to a template; `peek` is the head of the source document
    pub fn resolve(&self, peek: &[u8]) -> ConversionResult<PlatformTemplate> {
        match self {
            PlatformSelector::Auto => {
                let detected = detect_platform(peek)?;
                tracing::info!(
                    platform = detected.template.name(),
                    confidence = detected.confidence,
                    "Detected platform"
                );
                Ok(detected.template)
            }
            PlatformSelector::Named(name) => Ok(PlatformTemplate::load(name)?),
            PlatformSelector::Custom(path) => Ok(PlatformTemplate::from_file(path)?),
            PlatformSelector::Template(template) => Ok(template.clone()),
        }
    }

    /// Whether resolving needs a look at the document
    pub fn needs_peek(&self) -> bool {
        matches!(self, PlatformSelector::Auto)
    }

    pub fn description(&self) -> String {
        match self {
            PlatformSelector::Auto => "auto-detect".to_string(),
            PlatformSelector::Named(name) => name.clone(),
            PlatformSelector::Custom(path) => format!("custom template {}", path.display()),
            PlatformSelector::Template(template) => template.name().to_string(),
        }
    }
}

impl FromStr for PlatformSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(PlatformSelector::Auto)
        } else {
            Ok(PlatformSelector::Named(s.trim().to_string()))
        }
    }
}
