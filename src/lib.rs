//! # html2md
//!
//! Fetch web pages and convert them to Markdown, with SSRF protection on
//! every hop and XSS sanitization before conversion.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL
//!  │
//!  ├─ 1. Validate  scheme allow-list, resolve host, refuse private addresses
//!  ├─ 2. Fetch     manual redirects (each target re-validated), size + time caps
//!  ├─ 3. Sanitize  drop script/iframe/…, on* handlers, javascript:/data: URLs
//!  ├─ 4. Select    optional main-content extraction (main/article/role=main)
//!  ├─ 5. Convert   HTML → Markdown, plus TXT and PDF with `all_formats`
//!  └─ 6. Output    stdout, or collision-free files under an output directory
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use html2md::{process_url, ConversionConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().main_content(true).build()?;
//!     let session = Session::new(config)?;
//!     let output = process_url("https://example.com", &session, None).await?;
//!     println!("{}", output.markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `html2md`, `html2md-log-export` and `html2md-upload` binaries |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! html2md = { version = "0.3", default-features = false }
//! ```
//!
//! PDF output needs a pdfium shared library at runtime. It is looked up in
//! `PDFIUM_LIB_PATH`, then the working directory, then the system paths.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod log_export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod runlog;
pub mod session;
pub mod stream;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, SchemePolicy};
pub use convert::{convert_html, process_batch, process_url, read_batch_file};
pub use error::{ErrorCategory, Html2MdError, ValidationError};
pub use output::ConversionOutput;
pub use progress::BatchProgressCallback;
pub use session::Session;
pub use stream::{convert_batch_stream, BatchItem};
