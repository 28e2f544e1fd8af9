//! Export an html2md JSON Lines run log to CSV.

use anyhow::{Context, Result};
use clap::Parser;
use html2md::log_export::{export_file, parse_fields, DEFAULT_FIELDS};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Export html2md JSONL logs to CSV.
#[derive(Parser, Debug)]
#[command(name = "html2md-log-export", version, about = "Export html2md JSONL logs to CSV")]
struct Cli {
    /// JSON Lines log written by `html2md --log-file`.
    #[arg(long = "in", visible_alias = "input", value_name = "FILE")]
    input: PathBuf,

    /// CSV file to create (overwritten if it exists).
    #[arg(long = "out", visible_alias = "output", value_name = "FILE")]
    output: PathBuf,

    /// Comma-separated record fields to export, in column order.
    #[arg(long, default_value = DEFAULT_FIELDS)]
    fields: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let fields = parse_fields(&cli.fields);
    if fields.is_empty() {
        anyhow::bail!("--fields must name at least one field");
    }

    let stats = export_file(&cli.input, &cli.output, &fields).with_context(|| {
        format!(
            "Failed to export {} to {}",
            cli.input.display(),
            cli.output.display()
        )
    })?;
    tracing::info!(
        "Wrote {} row(s) to {} ({} line(s) skipped)",
        stats.rows,
        cli.output.display(),
        stats.skipped
    );
    Ok(())
}
