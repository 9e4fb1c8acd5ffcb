//! Configuration options for blog export conversion

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content::OutputEncoding;
use crate::error::{ConversionError, ConversionResult};

/// Output column delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelimiterType {
    /// Comma delimiter (,)
    #[default]
    Comma,
    /// Tab delimiter (\\t)
    Tab,
    /// Pipe delimiter (|)
    Pipe,
}

impl DelimiterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelimiterType::Comma => ",",
            DelimiterType::Tab => "\t",
            DelimiterType::Pipe => "|",
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            DelimiterType::Comma => ',',
            DelimiterType::Tab => '\t',
            DelimiterType::Pipe => '|',
        }
    }
}

impl FromStr for DelimiterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comma" | "," => Ok(DelimiterType::Comma),
            "tab" | "\t" => Ok(DelimiterType::Tab),
            "pipe" | "|" => Ok(DelimiterType::Pipe),
            other => Err(format!(
                "Invalid delimiter '{}'. Use 'comma', 'tab', or 'pipe'",
                other
            )),
        }
    }
}

/// Cell quoting strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStrategy {
    /// Quote only cells that need it
    #[default]
    Smart,
    /// Quote every cell
    Always,
}

impl FromStr for QuoteStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smart" => Ok(QuoteStrategy::Smart),
            "always" => Ok(QuoteStrategy::Always),
            other => Err(format!("Invalid quote strategy '{}'. Use 'smart' or 'always'", other)),
        }
    }
}

/// Conversion configuration options
///
/// Missing keys in a configuration file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Keep HTML markup in content (otherwise strip to plain text)
    pub preserve_html: bool,
    /// Remove unsafe elements and attributes from preserved HTML
    pub sanitize_html: bool,
    /// Tags removed from preserved HTML, inner text kept
    pub strip_tags: Vec<String>,
    /// Content longer than this many characters is truncated
    pub max_content_length: Option<usize>,
    /// Maximum slug length in characters
    pub slug_max_length: usize,
    /// Derive slugs from titles when the source has none
    pub generate_slugs: bool,
    /// Output byte encoding
    pub output_encoding: OutputEncoding,
    /// Maximum excerpt length in characters
    pub excerpt_max_length: usize,
    /// Build an excerpt from the content when the source has none
    pub derive_excerpt: bool,
    /// Column delimiter
    pub delimiter: DelimiterType,
    /// Cell quoting strategy
    pub quote_strings: QuoteStrategy,
    /// Re-parse emitted rows and check them against the schema
    pub validate_output: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            preserve_html: true,
            sanitize_html: true,
            strip_tags: Vec::new(),
            max_content_length: None,
            slug_max_length: 60,
            generate_slugs: true,
            output_encoding: OutputEncoding::Utf8,
            excerpt_max_length: 300,
            derive_excerpt: true,
            delimiter: DelimiterType::Comma,
            quote_strings: QuoteStrategy::Smart,
            validate_output: true,
        }
    }
}

impl ConversionConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain-text content for CMSs that do not accept HTML
    pub fn plain_text() -> Self {
        Self {
            preserve_html: false,
            ..Default::default()
        }
    }

    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> ConversionResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConversionError::io(e, Some(path.to_path_buf())))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            ConversionError::configuration(format!("{}: {}", path.display(), e))
        })?;
        config.validate().map_err(ConversionError::configuration)?;
        Ok(config)
    }

    /// Keep or strip HTML
    pub fn with_preserve_html(mut self, preserve: bool) -> Self {
        self.preserve_html = preserve;
        self
    }

    /// Enable/disable unsafe HTML removal
    pub fn with_sanitize_html(mut self, sanitize: bool) -> Self {
        self.sanitize_html = sanitize;
        self
    }

    /// Add a tag to the strip list
    pub fn with_strip_tag(mut self, tag: impl Into<String>) -> Self {
        self.strip_tags.push(tag.into());
        self
    }

    /// Set maximum content length
    pub fn with_max_content_length(mut self, max: Option<usize>) -> Self {
        self.max_content_length = max;
        self
    }

    /// Set maximum slug length
    pub fn with_slug_max_length(mut self, max: usize) -> Result<Self, String> {
        if max == 0 {
            return Err("Slug max length must be at least 1".to_string());
        }
        self.slug_max_length = max;
        Ok(self)
    }

    /// Enable/disable slug generation
    pub fn with_generate_slugs(mut self, generate: bool) -> Self {
        self.generate_slugs = generate;
        self
    }

    /// Set output encoding
    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.output_encoding = encoding;
        self
    }

    /// Set maximum excerpt length
    pub fn with_excerpt_max_length(mut self, max: usize) -> Self {
        self.excerpt_max_length = max;
        self
    }

    /// Set column delimiter
    pub fn with_delimiter(mut self, delimiter: DelimiterType) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set cell quoting strategy
    pub fn with_quote_strategy(mut self, strategy: QuoteStrategy) -> Self {
        self.quote_strings = strategy;
        self
    }

    /// Enable/disable output validation
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_output = validate;
        self
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.slug_max_length == 0 {
            return Err("Slug max length must be at least 1".to_string());
        }

        if self.max_content_length == Some(0) {
            return Err("Max content length must be greater than 0".to_string());
        }

        // Room for at least one character and the ellipsis
        if self.excerpt_max_length < 4 {
            return Err("Excerpt max length must be at least 4".to_string());
        }

        for tag in &self.strip_tags {
            let valid = tag
                .chars()
                .next()
                .map_or(false, |c| c.is_ascii_alphabetic())
                && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(format!("Invalid tag name in strip list: '{}'", tag));
            }
        }

        Ok(())
    }
}
