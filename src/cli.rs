//! CLI parsing and orchestration. Builds the HTTP browser, runs the listing scraper, writes
//! documents as JSON. Maps errors to exit codes.

use crate::config::{self, Config};
use crate::scraper::{
    EuPayScraper, HttpBrowser, MissingDateBehavior, MissingTextBehavior, RunOptions, RunSummary,
    ScraperError, Timing, WaitPolicy, EPC_SEARCH_URL,
};
use crate::sink::{JsonArraySink, JsonLinesSink};
use clap::Parser;
use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_MILLIS: u64 = 1000;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Output(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Output(_) => 3,
        }
    }
}

/// Output encoding for delivered documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line, written as documents arrive.
    JsonLines,
    /// One JSON array, written at the end of the run.
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "epcscrape")]
#[command(about = "Scrape European Payments Council documents from the search listing and emit JSON records")]
#[command(
    after_help = "Config file keys (base_url, output_dir, user_agent, timeout_secs, navigation_delay_secs, detail_delay_secs, consent_wait_secs, container_wait_secs, poll_millis, max_documents, missing_text, missing_date) are read from ./epcscrape.toml or ~/.config/epcscrape/config.toml. CLI flags override config. Set RUST_LOG for finer log control."
)]
pub struct Args {
    /// Output path. Default: stdout, or {output_dir}/epc-documents.{ext} when output_dir is configured.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: jsonl or json.
    #[arg(long, default_value = "jsonl", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Listing base URL (default: the EPC search page).
    #[arg(long)]
    pub base_url: Option<String>,

    /// First listing page index (0-based).
    #[arg(long, default_value_t = 0)]
    pub start_page: u32,

    /// Stop after delivering this many documents.
    #[arg(long)]
    pub max_documents: Option<usize>,

    /// Stop after this many listing pages.
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Link of the newest document from a previous run; stop when it is reached.
    #[arg(long)]
    pub last_known: Option<String>,

    /// How to handle detail pages without text: skip (default) or fail.
    #[arg(long, value_parser = parse_missing_text)]
    pub missing_text: Option<MissingTextBehavior>,

    /// How to handle listing rows without a date: sentinel (default, dated 2000-01-01) or skip.
    #[arg(long, value_parser = parse_missing_date)]
    pub missing_date: Option<MissingDateBehavior>,

    /// Fail instead of stopping when a listing page has no results.
    #[arg(long)]
    pub fail_on_empty_page: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Pause after opening a listing page, in seconds (overrides config; default 2).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and full error chain.
    #[arg(long)]
    pub verbose: bool,
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_lowercase().as_str() {
        "jsonl" | "ndjson" => Ok(OutputFormat::JsonLines),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!(
            "Invalid --format value: '{}'. Use jsonl or json.",
            s
        )),
    }
}

fn parse_missing_text(s: &str) -> Result<MissingTextBehavior, String> {
    match s.to_lowercase().as_str() {
        "skip" => Ok(MissingTextBehavior::Skip),
        "fail" => Ok(MissingTextBehavior::Fail),
        _ => Err(format!(
            "Invalid --missing-text value: '{}'. Use skip or fail.",
            s
        )),
    }
}

fn parse_missing_date(s: &str) -> Result<MissingDateBehavior, String> {
    match s.to_lowercase().as_str() {
        "sentinel" => Ok(MissingDateBehavior::Sentinel),
        "skip" => Ok(MissingDateBehavior::Skip),
        _ => Err(format!(
            "Invalid --missing-date value: '{}'. Use sentinel or skip.",
            s
        )),
    }
}

fn extension_for_format(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::JsonLines => "jsonl",
        OutputFormat::Json => "json",
    }
}

/// Ensure output path parent exists.
fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Delays and waits from CLI flags, then config, then defaults.
fn timing_from(args: &Args, config: Option<&Config>) -> Timing {
    let defaults = Timing::default();
    let secs = |v: Option<u64>, d: Duration| v.map(Duration::from_secs).unwrap_or(d);
    let poll = Duration::from_millis(
        config
            .and_then(|c| c.poll_millis)
            .unwrap_or(DEFAULT_POLL_MILLIS)
            .max(1),
    );
    Timing {
        navigation_delay: secs(
            args.delay.or_else(|| config.and_then(|c| c.navigation_delay_secs)),
            defaults.navigation_delay,
        ),
        detail_delay: secs(
            config.and_then(|c| c.detail_delay_secs),
            defaults.detail_delay,
        ),
        consent_wait: WaitPolicy::new(
            secs(
                config.and_then(|c| c.consent_wait_secs),
                defaults.consent_wait.timeout,
            ),
            poll,
        ),
        container_wait: WaitPolicy::new(
            secs(
                config.and_then(|c| c.container_wait_secs),
                defaults.container_wait.timeout,
            ),
            poll,
        ),
    }
}

/// Where documents go: explicit path, configured directory, or stdout.
fn output_target(args: &Args, config: Option<&Config>) -> Option<PathBuf> {
    args.output.clone().or_else(|| {
        config.and_then(|c| c.output_dir.as_ref()).map(|dir| {
            dir.join(format!(
                "epc-documents.{}",
                extension_for_format(args.format)
            ))
        })
    })
}

/// Entry point for the CLI. Returns the run summary on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<RunSummary, CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let config = config.as_ref();

    let missing_text = match args.missing_text {
        Some(b) => b,
        None => config
            .and_then(|c| c.missing_text.as_deref())
            .map(parse_missing_text)
            .transpose()
            .map_err(CliRunError::InvalidInput)?
            .unwrap_or(MissingTextBehavior::Skip),
    };
    let missing_date = match args.missing_date {
        Some(b) => b,
        None => config
            .and_then(|c| c.missing_date.as_deref())
            .map(parse_missing_date)
            .transpose()
            .map_err(CliRunError::InvalidInput)?
            .unwrap_or(MissingDateBehavior::Sentinel),
    };

    let output_path = output_target(args, config);
    if let Some(ref path) = output_path {
        validate_output_path(path)?;
    }

    let timeout_secs = args
        .timeout
        .or_else(|| config.and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.and_then(|c| c.user_agent.clone()));
    let mut builder = HttpBrowser::builder().timeout_secs(timeout_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let mut browser = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    let writer: Box<dyn Write> = match &output_path {
        Some(path) => Box::new(std::fs::File::create(path).map_err(|e| {
            CliRunError::Output(format!("Cannot create {}: {}", path.display(), e))
        })?),
        None => Box::new(std::io::stdout().lock()),
    };

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: usize, page: u32| {
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new_spinner();
            if let Ok(style) = indicatif::ProgressStyle::default_spinner()
                .template("{spinner} {msg} ({elapsed})")
            {
                bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_message(format!("{} documents (listing page {})", n, page));
    };
    let progress: Option<&dyn Fn(usize, u32)> = if args.quiet { None } else { Some(&progress_cb) };

    let options = RunOptions {
        base_url: args
            .base_url
            .clone()
            .or_else(|| config.and_then(|c| c.base_url.clone()))
            .unwrap_or_else(|| EPC_SEARCH_URL.to_string()),
        start_page: args.start_page,
        max_documents: args
            .max_documents
            .or_else(|| config.and_then(|c| c.max_documents)),
        max_pages: args.max_pages,
        last_known_link: args.last_known.clone(),
        stop_on_empty_page: !args.fail_on_empty_page,
        missing_text,
        missing_date,
        timing: timing_from(args, config),
        progress,
    };

    let mut scraper = EuPayScraper::new(&mut browser);
    let summary = match args.format {
        OutputFormat::JsonLines => {
            let mut sink = JsonLinesSink::new(writer);
            scraper.run(&mut sink, &options)?
        }
        OutputFormat::Json => {
            let mut sink = JsonArraySink::new(writer);
            let result = scraper.run(&mut sink, &options);
            // Keep whatever was collected before a failure.
            sink.finish()
                .map_err(|e| CliRunError::Output(format!("Failed to write JSON: {}", e)))?;
            result?
        }
    };

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    if !args.quiet {
        eprintln!(
            "Delivered {} document(s) from {} listing page(s); {} skipped, {} lost. Stopped: {:?}.",
            summary.delivered,
            summary.pages_visited,
            summary.skipped.len(),
            summary.lost.len(),
            summary.stop
        );
        if let Some(path) = &output_path {
            eprintln!("Wrote {}", path.display());
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["epcscrape"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn parse_format_all() {
        assert_eq!(parse_format("jsonl").unwrap(), OutputFormat::JsonLines);
        assert_eq!(parse_format("ndjson").unwrap(), OutputFormat::JsonLines);
        assert_eq!(parse_format("JSON").unwrap(), OutputFormat::Json);
        assert!(parse_format("csv").is_err());
    }

    #[test]
    fn parse_missing_text_all() {
        assert_eq!(parse_missing_text("skip").unwrap(), MissingTextBehavior::Skip);
        assert_eq!(parse_missing_text("FAIL").unwrap(), MissingTextBehavior::Fail);
        assert!(parse_missing_text("placeholder").is_err());
    }

    #[test]
    fn parse_missing_date_all() {
        assert_eq!(
            parse_missing_date("sentinel").unwrap(),
            MissingDateBehavior::Sentinel
        );
        assert_eq!(parse_missing_date("skip").unwrap(), MissingDateBehavior::Skip);
        assert!(parse_missing_date("drop").is_err());
    }

    #[test]
    fn args_defaults() {
        let a = args(&[]);
        assert_eq!(a.format, OutputFormat::JsonLines);
        assert_eq!(a.start_page, 0);
        assert!(a.max_documents.is_none());
        assert!(!a.fail_on_empty_page);
    }

    #[test]
    fn args_flags() {
        let a = args(&[
            "--max-documents",
            "10",
            "--start-page",
            "3",
            "--missing-date",
            "skip",
            "--last-known",
            "https://www.europeanpaymentscouncil.eu/x",
            "-q",
        ]);
        assert_eq!(a.max_documents, Some(10));
        assert_eq!(a.start_page, 3);
        assert_eq!(a.missing_date, Some(MissingDateBehavior::Skip));
        assert_eq!(
            a.last_known.as_deref(),
            Some("https://www.europeanpaymentscouncil.eu/x")
        );
        assert!(a.quiet);
    }

    #[test]
    fn timing_defaults_without_config() {
        let t = timing_from(&args(&[]), None);
        assert_eq!(t, Timing::default());
    }

    #[test]
    fn timing_cli_overrides_config() {
        let config = Config {
            navigation_delay_secs: Some(7),
            container_wait_secs: Some(9),
            poll_millis: Some(250),
            ..Config::default()
        };
        let t = timing_from(&args(&["--delay", "1"]), Some(&config));
        assert_eq!(t.navigation_delay, Duration::from_secs(1));
        assert_eq!(t.container_wait.timeout, Duration::from_secs(9));
        assert_eq!(t.container_wait.poll, Duration::from_millis(250));
        assert_eq!(t.consent_wait.timeout, Duration::from_secs(5));
    }

    #[test]
    fn output_target_prefers_flag_then_config_dir() {
        let config = Config {
            output_dir: Some(PathBuf::from("out")),
            ..Config::default()
        };
        assert_eq!(output_target(&args(&[]), None), None);
        assert_eq!(
            output_target(&args(&["--format", "json"]), Some(&config)),
            Some(PathBuf::from("out/epc-documents.json"))
        );
        assert_eq!(
            output_target(&args(&["-o", "docs.jsonl"]), Some(&config)),
            Some(PathBuf::from("docs.jsonl"))
        );
    }

    #[test]
    fn validate_output_path_parent_exists() {
        let path = std::env::temp_dir().join("epcscrape_cli_test_output.jsonl");
        assert!(validate_output_path(&path).is_ok());
    }

    #[test]
    fn validate_output_path_parent_missing() {
        let path = PathBuf::from("/nonexistent_dir_epcscrape_xyz/output.jsonl");
        let result = validate_output_path(&path);
        assert!(result.is_err());
        if let Err(CliRunError::InvalidInput(msg)) = result {
            assert!(msg.contains("parent directory does not exist"));
        }
    }

    #[test]
    fn cli_run_error_exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliRunError::Scraper(ScraperError::ElementNotFound {
                what: "article list".into(),
                url: "https://x".into()
            })
            .exit_code(),
            2
        );
        assert_eq!(CliRunError::Output("disk full".into()).exit_code(), 3);
    }

    #[test]
    fn scraper_error_is_not_repeated_as_its_own_cause() {
        use std::error::Error;
        let e = CliRunError::from(ScraperError::HttpStatus {
            status: 503,
            url: "https://x".into(),
        });
        assert_eq!(e.to_string(), "HTTP 503 when fetching: https://x");
        assert!(e.source().is_none());
    }
}
