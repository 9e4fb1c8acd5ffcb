//! Command-line interface module

use clap::{ArgAction, Parser, ValueEnum};
use console::style;
use std::path::PathBuf;
use std::time::Duration;

use crate::content::{NormalizedRecord, OutputEncoding};
use crate::conversion::config::{DelimiterType, QuoteStrategy};
use crate::conversion::{ConversionConfig, ConversionReport, RunOutcome};
use crate::error::{ConversionError, ConversionResult};
use crate::parser::XmlSource;
use crate::template::PlatformSelector;

/// Main CLI arguments
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "blogconv")]
#[command(about = "Convert blog XML exports (WordPress, Ghost, Jekyll) to CMS import CSV")]
#[command(version)]
#[command(long_about = None)]
pub struct Args {
    /// Input XML export ('-' for standard input)
    #[arg()]
    pub input: Option<String>,

    /// Output CSV file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Source platform: auto, wordpress, ghost or jekyll
    #[arg(short, long, default_value = "auto")]
    pub platform: String,

    /// Custom template document (JSON, or YAML by extension)
    #[arg(short, long, conflicts_with = "platform")]
    pub template: Option<PathBuf>,

    /// Conversion settings file (JSON); flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the first N records that would be converted, write nothing
    #[arg(long, value_name = "N", conflicts_with = "stats")]
    pub preview: Option<usize>,

    /// Report counts and field presence only, write nothing
    #[arg(long)]
    pub stats: bool,

    /// List built-in platforms and exit
    #[arg(long)]
    pub list_platforms: bool,

    /// Print a built-in template as a custom template document and exit
    #[arg(long, value_name = "PLATFORM")]
    pub show_template: Option<String>,

    /// Strip HTML from content and emit plain text
    #[arg(long, conflicts_with = "preserve_html")]
    pub strip_html: bool,

    /// Keep HTML markup in content (default)
    #[arg(long)]
    pub preserve_html: bool,

    /// Do not remove unsafe elements and attributes from preserved HTML
    #[arg(long)]
    pub no_sanitize: bool,

    /// Remove a tag from preserved HTML, keeping its text (repeatable)
    #[arg(long = "strip-tag", value_name = "TAG")]
    pub strip_tags: Vec<String>,

    /// Truncate content longer than N characters at a word boundary
    #[arg(long, value_name = "N")]
    pub max_content_length: Option<usize>,

    /// Maximum slug length (default: 60)
    #[arg(long, value_name = "N")]
    pub slug_max_length: Option<usize>,

    /// Only use slugs present in the source; records without one are skipped
    #[arg(long)]
    pub no_slugs: bool,

    /// Maximum excerpt length (default: 300)
    #[arg(long, value_name = "N")]
    pub excerpt_max_length: Option<usize>,

    /// Output encoding: utf-8, ascii or iso-8859-1 (default: utf-8)
    #[arg(long)]
    pub encoding: Option<Encoding>,

    /// Column delimiter: comma, tab, or pipe (default: comma)
    #[arg(long)]
    pub delimiter: Option<Delimiter>,

    /// Quote every cell instead of only ambiguous ones
    #[arg(long)]
    pub quote_all: bool,

    /// Skip re-parsing emitted rows
    #[arg(long)]
    pub no_validate: bool,

    /// Write the run report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Increase logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Delimiter types for CLI
#[derive(ValueEnum, Debug, Clone)]
pub enum Delimiter {
    #[value(name = "comma", alias = ",")]
    Comma,
    #[value(name = "tab", alias = "\t")]
    Tab,
    #[value(name = "pipe", alias = "|")]
    Pipe,
}

impl From<Delimiter> for DelimiterType {
    fn from(delimiter: Delimiter) -> Self {
        match delimiter {
            Delimiter::Comma => DelimiterType::Comma,
            Delimiter::Tab => DelimiterType::Tab,
            Delimiter::Pipe => DelimiterType::Pipe,
        }
    }
}

/// Output encodings for CLI
#[derive(ValueEnum, Debug, Clone)]
pub enum Encoding {
    #[value(name = "utf-8", alias = "utf8")]
    Utf8,
    #[value(name = "ascii")]
    Ascii,
    #[value(name = "iso-8859-1", alias = "latin1")]
    Latin1,
}

impl From<Encoding> for OutputEncoding {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Utf8 => OutputEncoding::Utf8,
            Encoding::Ascii => OutputEncoding::Ascii,
            Encoding::Latin1 => OutputEncoding::Latin1,
        }
    }
}

/// What the invocation asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListPlatforms,
    ShowTemplate,
    Convert,
    Preview(usize),
    Stats,
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub args: Args,
    pub conversion_config: ConversionConfig,
}

impl CliConfig {
    /// Create CLI configuration from arguments
    pub fn from_args(args: Args) -> ConversionResult<Self> {
        let conversion_config = Self::create_conversion_config(&args)?;

        Ok(Self {
            args,
            conversion_config,
        })
    }

    /// Create conversion configuration from the settings file and flags
    fn create_conversion_config(args: &Args) -> ConversionResult<ConversionConfig> {
        let mut config = match &args.config {
            Some(path) => ConversionConfig::from_file(path)?,
            None => ConversionConfig::default(),
        };

        if args.strip_html {
            config.preserve_html = false;
        } else if args.preserve_html {
            config.preserve_html = true;
        }
        if args.no_sanitize {
            config.sanitize_html = false;
        }
        for tag in &args.strip_tags {
            config = config.with_strip_tag(tag.as_str());
        }
        if args.max_content_length.is_some() {
            config.max_content_length = args.max_content_length;
        }
        if let Some(max) = args.slug_max_length {
            config = config
                .with_slug_max_length(max)
                .map_err(ConversionError::configuration)?;
        }
        if args.no_slugs {
            config.generate_slugs = false;
        }
        if let Some(max) = args.excerpt_max_length {
            config.excerpt_max_length = max;
        }
        if let Some(encoding) = &args.encoding {
            config.output_encoding = encoding.clone().into();
        }
        if let Some(delimiter) = &args.delimiter {
            config.delimiter = delimiter.clone().into();
        }
        if args.quote_all {
            config.quote_strings = QuoteStrategy::Always;
        }
        if args.no_validate {
            config.validate_output = false;
        }

        // Validate configuration
        config.validate().map_err(ConversionError::configuration)?;

        Ok(config)
    }

    pub fn action(&self) -> Action {
        if self.args.list_platforms {
            Action::ListPlatforms
        } else if self.args.show_template.is_some() {
            Action::ShowTemplate
        } else if let Some(limit) = self.args.preview {
            Action::Preview(limit)
        } else if self.args.stats {
            Action::Stats
        } else {
            Action::Convert
        }
    }

    /// Template selection: a custom document wins over `--platform`
    pub fn selector(&self) -> PlatformSelector {
        match &self.args.template {
            Some(path) => PlatformSelector::Custom(path.clone()),
            None => self
                .args
                .platform
                .parse()
                .unwrap_or(PlatformSelector::Auto),
        }
    }

    /// Input source, or `None` when no input was given
    pub fn source(&self) -> Option<XmlSource> {
        match self.args.input.as_deref() {
            None => None,
            Some("-") => Some(XmlSource::Stdin),
            Some(path) => Some(XmlSource::from_file(path)),
        }
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.args.quiet
    }

    /// Log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        if self.args.quiet {
            return "error";
        }
        match self.args.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Get input source description
    pub fn input_description(&self) -> String {
        match self.args.input.as_deref() {
            Some("-") => "standard input".to_string(),
            Some(input) => format!("'{}'", input),
            None => "no input specified".to_string(),
        }
    }

    /// Get output destination description
    pub fn output_description(&self) -> String {
        if let Some(output) = &self.args.output {
            format!("'{}'", output.display())
        } else {
            "standard output".to_string()
        }
    }
}

/// CLI utilities and helpers
pub struct CliUtils;

impl CliUtils {
    /// Format a file size in human-readable format
    pub fn format_file_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", bytes, UNITS[unit_index])
        } else {
            format!("{:.1} {}", size, UNITS[unit_index])
        }
    }

    /// Format a duration in human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_millis = duration.as_millis();

        if total_millis < 1000 {
            format!("{}ms", total_millis)
        } else if total_millis < 60_000 {
            format!("{:.1}s", total_millis as f64 / 1000.0)
        } else {
            let minutes = total_millis / 60_000;
            let seconds = (total_millis % 60_000) / 1000;
            format!("{}m {}s", minutes, seconds)
        }
    }

    /// Progress bar over source bytes
    pub fn create_progress_bar(total_bytes: u64) -> indicatif::ProgressBar {
        let pb = indicatif::ProgressBar::new(total_bytes);
        let style = indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }

    /// Spinner for sources of unknown length
    pub fn create_spinner() -> indicatif::ProgressBar {
        let pb = indicatif::ProgressBar::new_spinner();
        let style = indicatif::ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner());
        pb.set_style(style);
        pb
    }

    /// Show a success message (if not in quiet mode)
    pub fn show_success(message: &str, quiet: bool) {
        if !quiet {
            if Self::should_use_color() {
                eprintln!("{} {}", style("✓").green(), message);
            } else {
                eprintln!("✓ {}", message);
            }
        }
    }

    /// Show an error message
    pub fn show_error(message: &str) {
        if Self::should_use_color() {
            eprintln!("{} {}", style("✗").red().bold(), message);
        } else {
            eprintln!("✗ {}", message);
        }
    }

    /// Show a warning message (if not in quiet mode)
    pub fn show_warning(message: &str, quiet: bool) {
        if !quiet {
            if Self::should_use_color() {
                eprintln!("{} {}", style("⚠").yellow(), message);
            } else {
                eprintln!("⚠ {}", message);
            }
        }
    }

    /// Check if output should be colored
    pub fn should_use_color() -> bool {
        atty::is(atty::Stream::Stderr) && std::env::var("NO_COLOR").is_err()
    }

    /// Get the terminal size
    pub fn get_terminal_size() -> (u16, u16) {
        terminal_size::terminal_size()
            .map(|(width, height)| (width.0, height.0))
            .unwrap_or((80, 24))
    }

    /// Shorten text to `width` characters for one-line display
    pub fn clip(text: &str, width: usize) -> String {
        let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= width {
            return flat;
        }
        let kept: String = flat.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Multi-line rendering of a report for the terminal
pub fn render_report(report: &ConversionReport) -> String {
    let mut lines = vec![
        report.summary(),
        format!(
            "  read {} in {}",
            CliUtils::format_file_size(report.bytes_read),
            CliUtils::format_duration(Duration::from_millis(report.elapsed_ms))
        ),
    ];

    if report.published + report.drafts > 0 {
        lines.push(format!(
            "  status: {} published, {} draft",
            report.published, report.drafts
        ));
    }
    if !report.field_presence.is_empty() {
        let presence: Vec<String> = report
            .field_presence
            .iter()
            .map(|(field, count)| format!("{} {}", field, count))
            .collect();
        lines.push(format!("  fields: {}", presence.join(", ")));
    }
    for skip in &report.skipped {
        lines.push(format!("  skipped item {} ({}): {}", skip.index, skip.field, skip.reason));
    }
    for warning in &report.warnings {
        lines.push(format!("  warning: {}", warning));
    }
    if let Some(failure) = &report.failure {
        lines.push(format!("  failure: {}", failure));
    }

    lines.join("\n")
}

/// One-line rendering of a previewed record
pub fn render_record(record: &NormalizedRecord, width: usize) -> String {
    let date = record
        .published
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let head = format!(
        "#{} {} [{}] {} {}",
        record.index,
        record.slug.as_deref().unwrap_or(""),
        record.status,
        date,
        record.author.as_deref().unwrap_or("")
    );
    let title = record.title.as_deref().unwrap_or("");
    let room = width.saturating_sub(head.chars().count() + 3).max(10);
    format!("{} | {}", head, CliUtils::clip(title, room))
}

/// Show the final report with the outcome highlighted
pub fn show_report(report: &ConversionReport, quiet: bool) {
    let rendered = render_report(report);
    match report.outcome() {
        RunOutcome::FullyConverted => CliUtils::show_success(&rendered, quiet),
        RunOutcome::CompletedWithSkips => CliUtils::show_warning(&rendered, quiet),
        RunOutcome::Failed => CliUtils::show_error(&rendered),
    }
}

/// Handle CLI errors with user-friendly messages
pub fn handle_error(error: &ConversionError) {
    let message = error.user_message();
    CliUtils::show_error(&message);

    if let Some(report) = error.report() {
        eprintln!("{}", render_report(report));
    }

    // Provide helpful suggestions
    match error.root_cause() {
        ConversionError::Template(_) => {
            eprintln!("\nTip: Use --list-platforms to see the built-in platforms");
        }
        ConversionError::Parse(_) => {
            eprintln!("\nTip: The export looks truncated or malformed; rows before the failure were kept");
        }
        _ => {}
    }

    // Show usage hint
    eprintln!("\nTry 'blogconv --help' for usage information.");
}
