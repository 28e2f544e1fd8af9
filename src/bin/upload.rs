//! Upload a file to the Anthropic Files API.

use anyhow::Result;
use clap::Parser;
use html2md::error::UploadError;
use html2md::upload::{upload_file, UploadClient};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Upload a file to the Anthropic API.
#[derive(Parser, Debug)]
#[command(name = "html2md-upload", version, about = "Upload a file to the Anthropic API.")]
struct Cli {
    /// Path to the file to upload.
    file: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(id) => {
            println!("File uploaded successfully. ID: {id}");
            Ok(())
        }
        Err(e @ (UploadError::FileNotFound { .. } | UploadError::Read { .. })) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("API error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<String, UploadError> {
    if !cli.file.is_file() {
        return Err(UploadError::FileNotFound {
            path: cli.file.clone(),
        });
    }
    let client = UploadClient::from_env()?;
    let uploaded = upload_file(&cli.file, &client).await?;
    Ok(uploaded.id)
}
