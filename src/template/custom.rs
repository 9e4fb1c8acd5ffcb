//! Custom template documents (JSON, or YAML by file extension)

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{CanonicalField, PlatformTemplate, PostStatus};
use crate::error::{TemplateError, TemplateResult};

/// A namespace entry may list one URI or several (e.g. export versions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamespaceUris {
    One(String),
    Many(Vec<String>),
}

impl NamespaceUris {
    fn into_vec(self) -> Vec<String> {
        match self {
            NamespaceUris::One(uri) => vec![uri],
            NamespaceUris::Many(uris) => uris,
        }
    }
}

/// On-disk form of a template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub item_tag: String,
    #[serde(default)]
    pub field_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub date_formats: Vec<String>,
    #[serde(default)]
    pub status_mapping: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespaces: BTreeMap<String, NamespaceUris>,
}

impl TemplateDocument {
    /// Read a document, choosing YAML for `.yaml`/`.yml` and JSON otherwise
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplateError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let mut document: TemplateDocument = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| TemplateError::Syntax {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&content).map_err(|e| TemplateError::Syntax {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        if document.name.is_none() {
            document.name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(|stem| stem.to_string());
        }

        Ok(document)
    }

    /// Parse a JSON document held in memory
    pub fn from_json(json: &str) -> TemplateResult<Self> {
        serde_json::from_str(json).map_err(|e| TemplateError::Syntax {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }

    /// Validate and build the template
    pub fn into_template(self) -> TemplateResult<PlatformTemplate> {
        let name = self.name.unwrap_or_else(|| "custom".to_string());

        let mut mappings = Vec::with_capacity(self.field_mappings.len());
        for (target, source) in &self.field_mappings {
            let field: CanonicalField = target
                .parse()
                .map_err(|e: String| TemplateError::invalid(&name, e))?;
            mappings.push((field, source.as_str()));
        }

        let mut statuses = Vec::with_capacity(self.status_mapping.len());
        for (source, target) in &self.status_mapping {
            let status: PostStatus = target
                .parse()
                .map_err(|e: String| TemplateError::invalid(&name, e))?;
            statuses.push((source.as_str(), status));
        }

        let formats: Vec<&str> = self.date_formats.iter().map(String::as_str).collect();
        let namespaces = self
            .namespaces
            .into_iter()
            .map(|(prefix, uris)| (prefix, uris.into_vec()))
            .collect();

        PlatformTemplate::build(
            &name,
            self.description.as_deref().unwrap_or("Custom template"),
            &self.item_tag,
            &mappings,
            &formats,
            &statuses,
            namespaces,
        )
    }
}

impl From<&PlatformTemplate> for TemplateDocument {
    fn from(template: &PlatformTemplate) -> Self {
        // Paths keep their raw spelling; prefixes stay resolvable through `namespaces`
        let field_mappings = template
            .field_mappings()
            .iter()
            .map(|(field, path)| (field.as_str().to_string(), path.as_str().to_string()))
            .collect();

        let status_mapping = template
            .status_mapping()
            .iter()
            .map(|(source, status)| (source.clone(), status.as_str().to_string()))
            .collect();

        let namespaces = template
            .namespaces()
            .iter()
            .map(|(prefix, uris)| {
                let entry = match uris.as_slice() {
                    [single] => NamespaceUris::One(single.clone()),
                    _ => NamespaceUris::Many(uris.clone()),
                };
                (prefix.clone(), entry)
            })
            .collect();

        Self {
            name: Some(template.name().to_string()),
            description: Some(template.description().to_string()),
            item_tag: template.item_tag().as_str().to_string(),
            field_mappings,
            date_formats: template.date_formats().to_vec(),
            status_mapping,
            namespaces,
        }
    }
}
