use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

use blogconv::cli::{self, Action, Args, CliConfig, CliUtils};
use blogconv::conversion::{ConversionOrchestrator, ConversionReport, Progress};
use blogconv::template::{builtin, TemplateDocument};
use blogconv::ConversionError;

fn main() -> ExitCode {
    let args = Args::parse();
    let config = match CliConfig::from_args(args) {
        Ok(config) => config,
        Err(error) => {
            cli::handle_error(&error);
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.log_level());

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match error.downcast_ref::<ConversionError>() {
                Some(conversion) => cli::handle_error(conversion),
                None => CliUtils::show_error(&format!("{:#}", error)),
            }
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` takes precedence over the verbosity flags
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(config: &CliConfig) -> Result<()> {
    match config.action() {
        Action::ListPlatforms => list_platforms(),
        Action::ShowTemplate => show_template(config),
        Action::Preview(limit) => run_preview(config, limit),
        Action::Stats => run_stats(config),
        Action::Convert => run_convert(config),
    }
}

fn list_platforms() -> Result<()> {
    for template in blogconv::list_platforms() {
        println!("{:<10} {}", template.name().to_lowercase(), template.description());
    }
    Ok(())
}

fn show_template(config: &CliConfig) -> Result<()> {
    let name = config.args.show_template.as_deref().unwrap_or_default();
    let template = builtin::by_name(name).ok_or_else(|| {
        anyhow!(
            "Unknown platform '{}'. Available: {}",
            name,
            builtin::NAMES.join(", ")
        )
    })?;
    let document = TemplateDocument::from(&template);
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn orchestrator(config: &CliConfig) -> ConversionOrchestrator {
    ConversionOrchestrator::new(config.selector(), config.conversion_config.clone())
}

fn require_source(config: &CliConfig) -> Result<blogconv::XmlSource> {
    config
        .source()
        .ok_or_else(|| anyhow!("No input provided. Pass an export file, or '-' for standard input"))
}

fn run_preview(config: &CliConfig, limit: usize) -> Result<()> {
    let orchestrator = orchestrator(config);
    let mut preview = orchestrator
        .preview(require_source(config)?, limit)
        .map_err(|error| fail_with_report(config, error))?;
    let (width, _) = CliUtils::get_terminal_size();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in preview.by_ref() {
        writeln!(out, "{}", cli::render_record(&record, width as usize))?;
    }
    out.flush()?;

    finish(config, &preview.into_report())
}

fn run_stats(config: &CliConfig) -> Result<()> {
    let orchestrator = orchestrator(config);
    let ticker = Ticker::start(orchestrator.progress(), config.is_quiet());
    let result = orchestrator.stats(require_source(config)?);
    ticker.stop();

    let report = result.map_err(|error| fail_with_report(config, error))?;
    if !config.is_quiet() {
        println!("{}", cli::render_report(&report));
    }
    write_report_file(config, &report)
}

fn run_convert(config: &CliConfig) -> Result<()> {
    let orchestrator = orchestrator(config);
    let source = require_source(config)?;

    let writer: Box<dyn Write> = match &config.args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(io::stdout()),
    };

    tracing::info!(
        input = %config.input_description(),
        output = %config.output_description(),
        "Converting"
    );

    let ticker = Ticker::start(
        orchestrator.progress(),
        config.is_quiet() || config.args.output.is_none(),
    );
    let result = orchestrator.convert(source, writer);
    ticker.stop();

    match result {
        Ok(summary) => {
            if config.args.output.is_some() {
                CliUtils::show_success(
                    &format!("Converted to: {}", config.output_description()),
                    config.is_quiet(),
                );
            }
            finish(config, &summary.report)
        }
        Err(error) => Err(fail_with_report(config, error)),
    }
}

/// Write the report of a failed run to `--report` before passing the error on
fn fail_with_report(config: &CliConfig, error: ConversionError) -> anyhow::Error {
    if let Some(report) = error.report() {
        if let Err(write_error) = write_report_file(config, report) {
            tracing::warn!(error = %format!("{:#}", write_error), "Could not write report");
        }
    }
    error.into()
}

/// Print the report and write it to `--report` when asked
fn finish(config: &CliConfig, report: &ConversionReport) -> Result<()> {
    cli::show_report(report, config.is_quiet());
    write_report_file(config, report)?;
    match &report.failure {
        Some(failure) => Err(anyhow!("Run failed: {}", failure)),
        None => Ok(()),
    }
}

fn write_report_file(config: &CliConfig, report: &ConversionReport) -> Result<()> {
    if let Some(path) = &config.args.report {
        let json = report.to_json()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }
    Ok(())
}

/// Polls run progress from a background thread and drives a progress bar
struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Ticker {
    fn start(progress: Progress, hidden: bool) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        if hidden || !atty::is(atty::Stream::Stderr) {
            return Self { stop, handle: None };
        }

        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            let mut bar: Option<indicatif::ProgressBar> = None;
            while !flag.load(Ordering::Relaxed) && !progress.is_finished() {
                // The total is known once the source has been opened
                if progress.bytes_consumed() == 0 {
                    thread::sleep(Duration::from_millis(50));
                    continue;
                }
                let pb = bar.get_or_insert_with(|| match progress.total_bytes() {
                    Some(total) => CliUtils::create_progress_bar(total),
                    None => CliUtils::create_spinner(),
                });
                pb.set_position(progress.bytes_consumed());
                let message = match progress.estimated_total() {
                    Some(total) => format!("{} / ~{} posts", progress.records_processed(), total),
                    None => format!("{} posts", progress.records_processed()),
                };
                pb.set_message(message);
                pb.tick();
                thread::sleep(Duration::from_millis(100));
            }
            if let Some(pb) = bar {
                pb.finish_and_clear();
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
