//! CLI binary for html2md.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, drives the batch stream and prints results.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use futures::StreamExt;
use html2md::convert::log_failure;
use html2md::pipeline::pdf::check_pdf_engine;
use html2md::progress::BatchProgress;
use html2md::runlog::{RunLog, RunRecord};
use html2md::{
    convert_batch_stream, read_batch_file, BatchProgressCallback, ConversionConfig, Html2MdError,
    Session,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Batch progress bar. URLs may finish out of order when `--outdir` is set,
/// so each line names its own index.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} URLs  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting batch of {total} URLs…"))
        ));
    }

    fn on_url_start(&self, _index: usize, _total: usize, url: &str) {
        self.bar.set_message(url.to_string());
    }

    fn on_url_complete(&self, index: usize, total: usize, url: &str, markdown_len: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            url,
            dim(&format!("{markdown_len} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_url_error(&self, index: usize, total: usize, url: &str, error: &str) {
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            url,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} URLs converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} URLs converted  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Single page to stdout
  html2md --url https://example.com

  # Main content only, saved under out/
  html2md --url https://example.com/blog/post --main-content --outdir out

  # Markdown, text and PDF for every URL in a list
  html2md --batch urls.txt --outdir out --all-formats

  # Keep a JSON Lines run log and export it to CSV
  html2md --batch urls.txt --outdir out --log-file runs.jsonl
  html2md-log-export --in runs.jsonl --out runs.csv

SECURITY:
  Only http and https URLs are fetched (https only with --https-only).
  Hosts that resolve to private, loopback, link-local, multicast or
  reserved addresses are refused, and every redirect hop is re-checked.
  Scripts, frames, event handlers and javascript:/vbscript:/data: URLs are
  stripped before conversion.

ENVIRONMENT VARIABLES:
  RUST_LOG          Override the log filter (e.g. html2md=debug)
  PDFIUM_LIB_PATH   Path to libpdfium, needed for --all-formats
  HTML2MD_*         Fallback for any flag, e.g. HTML2MD_OUTDIR=out
"#;

/// Convert web pages to Markdown with SSRF and XSS protection.
#[derive(Parser, Debug)]
#[command(
    name = "html2md",
    version,
    about = "Convert web pages to Markdown with SSRF and XSS protection",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// URL of the page to convert.
    #[arg(long, env = "HTML2MD_URL", conflicts_with = "batch")]
    url: Option<String>,

    /// File with one URL per line (blank lines and `#` comments skipped).
    #[arg(long, env = "HTML2MD_BATCH")]
    batch: Option<PathBuf>,

    /// Write files into this directory instead of printing Markdown.
    #[arg(long, env = "HTML2MD_OUTDIR")]
    outdir: Option<PathBuf>,

    /// Also write .txt and .pdf next to the .md (requires --outdir).
    #[arg(long, env = "HTML2MD_ALL_FORMATS")]
    all_formats: bool,

    /// Convert only the page's main content (main, article or role=main).
    #[arg(long, env = "HTML2MD_MAIN_CONTENT")]
    main_content: bool,

    /// Print this help and exit.
    #[arg(long)]
    help_only: bool,

    /// Refuse plain http URLs, including redirect targets.
    #[arg(long, env = "HTML2MD_HTTPS_ONLY")]
    https_only: bool,

    /// Number of URLs fetched at once in batch mode with --outdir.
    #[arg(short, long, env = "HTML2MD_CONCURRENCY", default_value_t = 5)]
    concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long, env = "HTML2MD_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Maximum number of redirects followed per URL.
    #[arg(long, env = "HTML2MD_MAX_REDIRECTS", default_value_t = 10)]
    max_redirects: usize,

    /// Maximum response body size in bytes.
    #[arg(long, env = "HTML2MD_MAX_BYTES", default_value_t = 10 * 1024 * 1024)]
    max_bytes: u64,

    /// Append one JSON Lines record per processed URL to this file.
    #[arg(long, env = "HTML2MD_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HTML2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "HTML2MD_QUIET")]
    quiet: bool,

    /// Disable the batch progress bar.
    #[arg(long, env = "HTML2MD_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.help_only || (cli.url.is_none() && cli.batch.is_none()) {
        Cli::command()
            .print_long_help()
            .context("Failed to print help")?;
        return Ok(());
    }

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO lines in batch mode unless verbose.
    let show_progress = cli.batch.is_some() && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Preconditions ────────────────────────────────────────────────────
    let all_formats = cli.all_formats && cli.outdir.is_some();
    if cli.all_formats && cli.outdir.is_none() {
        tracing::warn!("--all-formats has no effect without --outdir; printing Markdown only");
    }
    if all_formats {
        if let Err(e) = check_pdf_engine() {
            eprintln!("Error: Missing dependency: {e}");
            std::process::exit(1);
        }
    }

    let urls = match (&cli.url, &cli.batch) {
        (Some(url), _) => vec![url.clone()],
        (None, Some(path)) => match read_batch_file(path) {
            Ok(urls) => urls,
            Err(e @ Html2MdError::BatchFileNotFound { .. }) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            Err(e) => return Err(e).context("Failed to read batch file"),
        },
        (None, None) => Vec::new(),
    };

    let progress: Option<BatchProgress> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, all_formats, progress)?;
    let session = Session::new(config).context("Failed to create HTTP session")?;

    let mut run_log = match &cli.log_file {
        Some(path) => Some(
            RunLog::open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?,
        ),
        None => None,
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let mut results = convert_batch_stream(urls, session, cli.outdir.clone());
    let stdout = io::stdout();
    while let Some(item) = results.next().await {
        match &item.result {
            Ok(output) if cli.outdir.is_none() => {
                let mut handle = stdout.lock();
                handle
                    .write_all(output.markdown.as_bytes())
                    .context("Failed to write to stdout")?;
                if !output.markdown.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
            Ok(_) => {}
            Err(e) => log_failure(&item.input, e),
        }

        if let Some(log) = run_log.as_mut() {
            let record = RunRecord::from_result(&item.input, &item.result);
            if let Err(e) = log.append(&record) {
                tracing::error!("File error: could not append to run log: {e}");
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    cli: &Cli,
    all_formats: bool,
    progress: Option<BatchProgress>,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .https_only(cli.https_only)
        .max_redirects(cli.max_redirects)
        .timeout_secs(cli.timeout)
        .max_content_bytes(cli.max_bytes)
        .concurrency(cli.concurrency)
        .main_content(cli.main_content)
        .all_formats(all_formats);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
