//! Configuration types for fetching and converting web pages.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct carries every knob so a
//! [`crate::Session`] can be cloned across batch workers without any other
//! shared state.

use crate::error::Html2MdError;
use crate::progress::BatchProgress;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default cap on the number of redirects followed for one URL.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default response body cap: 10 MiB.
pub const DEFAULT_MAX_CONTENT_BYTES: u64 = 10 * 1024 * 1024;

/// Default batch fan-out when writing to an output directory.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Browser-like `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Headers sent with every page request, in send order.
///
/// Some sites serve a stripped page (or a 403) to clients that do not look
/// like a browser.
pub fn default_headers() -> Vec<(String, String)> {
    [
        ("User-Agent", DEFAULT_USER_AGENT),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Referer", "https://www.google.com/"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "cross-site"),
        ("Sec-Fetch-User", "?1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Which URL schemes the validator lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchemePolicy {
    /// `http` and `https` (default).
    #[default]
    HttpAndHttps,
    /// `https` only.
    HttpsOnly,
}

impl SchemePolicy {
    pub fn allows(self, scheme: &str) -> bool {
        match self {
            SchemePolicy::HttpAndHttps => scheme == "http" || scheme == "https",
            SchemePolicy::HttpsOnly => scheme == "https",
        }
    }

    /// Human-readable allow-list used in denial messages.
    pub fn describe(self) -> &'static str {
        match self {
            SchemePolicy::HttpAndHttps => "http and https",
            SchemePolicy::HttpsOnly => "https",
        }
    }
}

/// Configuration for fetching and converting one or more URLs.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use html2md::{ConversionConfig, SchemePolicy};
///
/// let config = ConversionConfig::builder()
///     .scheme_policy(SchemePolicy::HttpsOnly)
///     .main_content(true)
///     .concurrency(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_redirects, 10);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Allowed URL schemes. Default: http and https.
    pub scheme_policy: SchemePolicy,

    /// Maximum redirects followed per URL. Default: 10.
    ///
    /// Every hop is re-validated before it is requested, so the cap bounds
    /// both latency and the number of validator round-trips.
    pub max_redirects: usize,

    /// Per-request timeout in seconds. Default: 30.
    pub timeout_secs: u64,

    /// Maximum response body size in bytes. Default: 10 MiB.
    pub max_content_bytes: u64,

    /// Number of URLs fetched at once in batch mode with an output
    /// directory. Default: 5.
    pub concurrency: usize,

    /// Reduce the page to its `main`/`article`/`[role=main]`/`body` element
    /// before conversion. Default: false.
    pub main_content: bool,

    /// Also produce `.txt` and `.pdf` outputs. Default: false.
    pub all_formats: bool,

    /// Request headers sent with every page fetch.
    pub headers: Vec<(String, String)>,

    /// Optional per-URL batch progress callback.
    pub progress_callback: Option<BatchProgress>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scheme_policy: SchemePolicy::default(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            concurrency: DEFAULT_CONCURRENCY,
            main_content: false,
            all_formats: false,
            headers: default_headers(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("scheme_policy", &self.scheme_policy)
            .field("max_redirects", &self.max_redirects)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_content_bytes", &self.max_content_bytes)
            .field("concurrency", &self.concurrency)
            .field("main_content", &self.main_content)
            .field("all_formats", &self.all_formats)
            .field("headers", &self.headers.len())
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn scheme_policy(mut self, policy: SchemePolicy) -> Self {
        self.config.scheme_policy = policy;
        self
    }

    pub fn https_only(self, v: bool) -> Self {
        self.scheme_policy(if v {
            SchemePolicy::HttpsOnly
        } else {
            SchemePolicy::HttpAndHttps
        })
    }

    pub fn max_redirects(mut self, n: usize) -> Self {
        self.config.max_redirects = n;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn max_content_bytes(mut self, bytes: u64) -> Self {
        self.config.max_content_bytes = bytes;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn main_content(mut self, v: bool) -> Self {
        self.config.main_content = v;
        self
    }

    pub fn all_formats(mut self, v: bool) -> Self {
        self.config.all_formats = v;
        self
    }

    /// Add or replace a request header (case-insensitive name match).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.config
            .headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.config.headers.push((name, value.into()));
        self
    }

    pub fn progress_callback(mut self, cb: BatchProgress) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Html2MdError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Html2MdError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.timeout_secs == 0 {
            return Err(Html2MdError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_content_bytes == 0 {
            return Err(Html2MdError::InvalidConfig(
                "Maximum content size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let c = ConversionConfig::default();
        assert_eq!(c.max_redirects, 10);
        assert_eq!(c.timeout_secs, 30);
        assert_eq!(c.max_content_bytes, 10_485_760);
        assert_eq!(c.concurrency, 5);
        assert_eq!(c.scheme_policy, SchemePolicy::HttpAndHttps);
        assert!(!c.main_content);
        assert!(!c.all_formats);
    }

    #[test]
    fn scheme_policy_allows() {
        assert!(SchemePolicy::HttpAndHttps.allows("http"));
        assert!(SchemePolicy::HttpAndHttps.allows("https"));
        assert!(!SchemePolicy::HttpAndHttps.allows("ftp"));
        assert!(!SchemePolicy::HttpsOnly.allows("http"));
        assert!(SchemePolicy::HttpsOnly.allows("https"));
    }

    #[test]
    fn build_rejects_zero_concurrency() {
        let err = ConversionConfig::builder().concurrency(0).build().unwrap_err();
        assert!(err.to_string().contains("Concurrency"), "got: {err}");
    }

    #[test]
    fn build_rejects_zero_timeout() {
        assert!(ConversionConfig::builder().timeout_secs(0).build().is_err());
    }

    #[test]
    fn header_replaces_case_insensitively() {
        let c = ConversionConfig::builder()
            .header("user-agent", "custom/1.0")
            .build()
            .unwrap();
        let agents: Vec<_> = c
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("user-agent"))
            .collect();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].1, "custom/1.0");
    }

    #[test]
    fn default_headers_look_like_a_browser() {
        let headers = default_headers();
        assert!(headers
            .iter()
            .any(|(k, v)| k == "User-Agent" && v.contains("Chrome/120")));
        assert!(headers.iter().any(|(k, _)| k == "Accept-Language"));
    }
}
