//! Error types for the html2md library.
//!
//! Three families of error reflect three distinct failure modes:
//!
//! * [`ValidationError`]: the URL was refused before any request was made
//!   (bad scheme, private address, unresolvable host). Always wrapped in
//!   [`Html2MdError::Blocked`] when it reaches callers.
//!
//! * [`Html2MdError`]: a single URL could not be converted. Batch drivers
//!   log it and move on; the error never aborts sibling URLs. The few
//!   variants that stop a whole run (`BatchFileNotFound`,
//!   `PdfEngineUnavailable`, `InvalidConfig`) are raised before any URL is
//!   processed.
//!
//! * [`ExportError`] / [`UploadError`]: failures of the two auxiliary tools.
//!
//! Every [`Html2MdError`] maps to an [`ErrorCategory`] whose prefix is what
//! the CLI prints in front of the message.

use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Why a URL was refused before fetching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The scheme is not in the active allow-list.
    #[error("Invalid URL scheme '{scheme}': only {allowed} URLs are allowed")]
    InvalidScheme {
        scheme: String,
        allowed: &'static str,
    },

    /// The input did not parse as an absolute URL.
    #[error("Invalid URL scheme: '{input}' is not an absolute http(s) URL")]
    NotAbsolute { input: String },

    /// The URL parsed but carries no host component.
    #[error("URL has no host: '{url}'")]
    MissingHost { url: String },

    /// The host is a literal IP in a blocked range.
    #[error("Blocked private IP: {ip}")]
    PrivateIp { ip: IpAddr },

    /// At least one resolved address of the host is in a blocked range.
    #[error("Blocked domain resolving to private IP: {host} ({ip})")]
    PrivateResolution { host: String, ip: IpAddr },

    /// DNS failed or returned no addresses.
    #[error("could not resolve hostname {host}: {reason}")]
    Unresolvable { host: String, reason: String },
}

/// Per-URL error returned by [`crate::process_url`] and friends.
#[derive(Debug, Error)]
pub enum Html2MdError {
    // ── Validation ────────────────────────────────────────────────────────
    /// The URL (or a redirect target) was refused by the validator.
    #[error(transparent)]
    Blocked(#[from] ValidationError),

    // ── Network ───────────────────────────────────────────────────────────
    /// Connection, TLS or protocol failure.
    #[error("Request to '{url}' failed: {reason}")]
    Network { url: String, reason: String },

    /// The request did not complete within the configured timeout.
    #[error("Request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The final (non-redirect) response had a non-2xx status.
    #[error("HTTP {status} from '{url}'")]
    HttpStatus { url: String, status: u16 },

    /// The redirect chain was longer than the hop cap.
    #[error("too many redirects (max {max})")]
    TooManyRedirects { max: usize },

    /// A redirect response carried an unusable `Location` header.
    #[error("Invalid redirect from '{from}' to '{location}': {reason}")]
    BadRedirect {
        from: String,
        location: String,
        reason: String,
    },

    /// `Content-Length` announced a body above the size cap.
    #[error("Content too large: {declared} bytes exceeds the {limit} byte limit")]
    ContentTooLarge { declared: u64, limit: u64 },

    /// The streamed body crossed the size cap.
    #[error("Content exceeded limit of {limit} bytes")]
    ContentExceededLimit { limit: u64 },

    // ── File ──────────────────────────────────────────────────────────────
    /// Could not create the output directory or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The batch file given on the command line does not exist.
    #[error("Batch file not found: {path}")]
    BatchFileNotFound { path: PathBuf },

    /// The batch file exists but could not be read.
    #[error("Failed to read batch file '{path}': {source}")]
    BatchFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Conversion ────────────────────────────────────────────────────────
    /// The Markdown serializer failed.
    #[error("Markdown conversion failed: {0}")]
    Markdown(String),

    /// pdfium could not lay out or save the PDF.
    #[error("PDF generation failed: {0}")]
    PdfRender(String),

    /// pdfium could not be bound at all.
    #[error(
        "pdfium library not available: {0}\n\
Install libpdfium or set PDFIUM_LIB_PATH=/path/to/libpdfium to enable PDF output."
    )]
    PdfEngineUnavailable(String),

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used for log prefixes and run-log status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Network,
    File,
    Conversion,
}

impl ErrorCategory {
    /// Prefix printed in front of the error message.
    pub fn prefix(self) -> &'static str {
        match self {
            ErrorCategory::Validation => "Validation error:",
            ErrorCategory::Network => "Network error:",
            ErrorCategory::File => "File error:",
            ErrorCategory::Conversion => "Conversion failed:",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix().trim_end_matches(':'))
    }
}

impl Html2MdError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Html2MdError::Blocked(_) => ErrorCategory::Validation,
            Html2MdError::Network { .. }
            | Html2MdError::Timeout { .. }
            | Html2MdError::HttpStatus { .. }
            | Html2MdError::TooManyRedirects { .. }
            | Html2MdError::BadRedirect { .. }
            | Html2MdError::ContentTooLarge { .. }
            | Html2MdError::ContentExceededLimit { .. } => ErrorCategory::Network,
            Html2MdError::OutputWriteFailed { .. }
            | Html2MdError::BatchFileNotFound { .. }
            | Html2MdError::BatchFileUnreadable { .. } => ErrorCategory::File,
            Html2MdError::Markdown(_)
            | Html2MdError::PdfRender(_)
            | Html2MdError::PdfEngineUnavailable(_)
            | Html2MdError::InvalidConfig(_)
            | Html2MdError::Internal(_) => ErrorCategory::Conversion,
        }
    }

    /// True when the URL was refused by the validator rather than failing later.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Html2MdError::Blocked(_))
    }
}

/// Errors from the JSON Lines → CSV exporter.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to read log file '{path}': {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV file '{path}': {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the Files API uploader.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,

    /// The API answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}
