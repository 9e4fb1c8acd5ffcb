//! Source path expressions used by templates to locate values inside an item
//!
//! Grammar: `[{uri}|prefix:]local[@attr='value'][/@attr]`
//!
//! - `{uri}local` matches elements bound to that namespace URI
//! - `prefix:local` matches by namespace when the template declares the
//!   prefix, otherwise by the literal prefix
//! - `local` matches unprefixed elements only
//! - `[@attr='value']` keeps elements whose attribute equals `value`
//! - `/@attr` takes the attribute value instead of the element text

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:\{([^}]+)\}|([A-Za-z_][\w.-]*):)?([A-Za-z_][\w.-]*)(?:\[@([A-Za-z_][\w.:-]*)=(?:'([^']*)'|"([^"]*)")\])?(?:/@([A-Za-z_][\w.:-]*))?$"#,
    )
    .expect("source path pattern is valid")
});

/// How the namespace part of a path is matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceMatch {
    /// No prefix: only unprefixed element names match
    Unprefixed,
    /// Any of these namespace URIs
    Uris(Vec<String>),
    /// Literal prefix, used when the template does not declare it
    Prefix(String),
}

/// A view of one element as seen by the extractor
#[derive(Debug, Clone, Copy)]
pub struct ElementName<'a> {
    pub namespace: Option<&'a [u8]>,
    pub prefix: Option<&'a [u8]>,
    pub local: &'a [u8],
}

/// Parsed source path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePath {
    raw: String,
    namespace: NamespaceMatch,
    local: String,
    filter: Option<(String, String)>,
    attribute: Option<String>,
}

impl SourcePath {
    /// Parse a path expression
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        let captures = PATH_PATTERN
            .captures(trimmed)
            .ok_or_else(|| format!("invalid source path '{}'", raw))?;

        let namespace = if let Some(uri) = captures.get(1) {
            NamespaceMatch::Uris(vec![uri.as_str().to_string()])
        } else if let Some(prefix) = captures.get(2) {
            NamespaceMatch::Prefix(prefix.as_str().to_string())
        } else {
            NamespaceMatch::Unprefixed
        };

        let filter = captures.get(4).map(|attr| {
            let value = captures
                .get(5)
                .or_else(|| captures.get(6))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (attr.as_str().to_string(), value)
        });

        Ok(Self {
            raw: trimmed.to_string(),
            namespace,
            local: captures[3].to_string(),
            filter,
            attribute: captures.get(7).map(|m| m.as_str().to_string()),
        })
    }

    /// Replace declared prefixes with the namespace URIs they stand for
    pub fn resolve_prefixes(mut self, namespaces: &BTreeMap<String, Vec<String>>) -> Self {
        if let NamespaceMatch::Prefix(prefix) = &self.namespace {
            if let Some(uris) = namespaces.get(prefix) {
                self.namespace = NamespaceMatch::Uris(uris.clone());
            }
        }
        self
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn local_name(&self) -> &str {
        &self.local
    }

    pub fn namespace(&self) -> &NamespaceMatch {
        &self.namespace
    }

    /// Attribute to read instead of the element text
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Check the element name, ignoring any attribute filter
    pub fn matches_name(&self, element: &ElementName<'_>) -> bool {
        if element.local != self.local.as_bytes() {
            return false;
        }

        match &self.namespace {
            NamespaceMatch::Unprefixed => element.prefix.is_none(),
            NamespaceMatch::Prefix(prefix) => element.prefix == Some(prefix.as_bytes()),
            NamespaceMatch::Uris(uris) => match element.namespace {
                Some(ns) => uris.iter().any(|uri| uri.as_bytes() == ns),
                None => false,
            },
        }
    }

    /// Check name and attribute filter; `attributes` holds (local name, value) pairs
    pub fn matches(&self, element: &ElementName<'_>, attributes: &[(String, String)]) -> bool {
        if !self.matches_name(element) {
            return false;
        }

        match &self.filter {
            None => true,
            Some((attr, expected)) => attributes
                .iter()
                .any(|(name, value)| name == attr && value == expected),
        }
    }

    /// Whether matching needs the element's attributes
    pub fn needs_attributes(&self) -> bool {
        self.filter.is_some() || self.attribute.is_some()
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
