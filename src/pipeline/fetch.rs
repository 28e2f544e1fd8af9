//! Page fetching with manual, re-validated redirect handling.
//!
//! The HTTP client never follows redirects by itself. [`fetch_validated`]
//! drives the loop: validate, request, and on a 3xx resolve `Location`
//! against the current URL and go round again. A redirect to an internal
//! address is therefore caught by the same validator that checked the
//! original URL.
//!
//! ```text
//! ┌──────────┐  ok   ┌───────────┐ 3xx + Location ┌──────────┐
//! │ validate │──────▶│ transport │───────────────▶│ join URL │──┐
//! └──────────┘       └───────────┘                └──────────┘  │
//!      ▲                   │ other status                       │
//!      │                   ▼                                    │
//!      │             FetchedPage / HttpStatus                   │
//!      └────────────────── hop < max_redirects ◀────────────────┘
//! ```

use crate::config::ConversionConfig;
use crate::error::Html2MdError;
use crate::pipeline::resolve::GuardedResolver;
use crate::pipeline::validate::validate_url;
use crate::session::Session;
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// One response as seen by the redirect follower.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Raw `Location` header, if any.
    pub location: Option<String>,
    /// Decoded body. Empty for redirect responses.
    pub body: String,
}

impl HttpResponse {
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues a single GET without following redirects.
///
/// Implementations enforce the configured timeout and body-size limit and
/// report failures as network-category [`Html2MdError`]s.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<HttpResponse, Html2MdError>;
}

/// The production transport: reqwest with redirects disabled, browser-like
/// default headers and the [`GuardedResolver`] installed.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout_secs: u64,
    max_content_bytes: u64,
}

impl ReqwestTransport {
    pub fn new(config: &ConversionConfig) -> Result<Self, Html2MdError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Html2MdError::InvalidConfig(format!("header '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Html2MdError::InvalidConfig(format!("header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .dns_resolver(Arc::new(GuardedResolver))
            .build()
            .map_err(|e| Html2MdError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
            max_content_bytes: config.max_content_bytes,
        })
    }

    fn map_error(&self, url: &Url, e: reqwest::Error) -> Html2MdError {
        if e.is_timeout() {
            Html2MdError::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            Html2MdError::Network {
                url: url.to_string(),
                reason: error_chain(&e),
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, Html2MdError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if matches!(status, 301 | 302 | 303 | 307 | 308) {
            return Ok(HttpResponse {
                status,
                location,
                body: String::new(),
            });
        }

        if let Some(declared) = response.content_length() {
            if declared > self.max_content_bytes {
                return Err(Html2MdError::ContentTooLarge {
                    declared,
                    limit: self.max_content_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.map_error(url, e))?;
            if (body.len() + chunk.len()) as u64 > self.max_content_bytes {
                return Err(Html2MdError::ContentExceededLimit {
                    limit: self.max_content_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse {
            status,
            location,
            body: decode_body(&body, content_type.as_deref()),
        })
    }
}

/// Flatten a reqwest error and its sources into one line.
///
/// reqwest's own `Display` is often just "error sending request"; the
/// useful part (connection refused, blocked resolver answer) is a source.
fn error_chain(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}

/// Decode `bytes` using the `charset` from `Content-Type`, falling back to
/// UTF-8. A BOM overrides both.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(|ct| {
            ct.split(';').find_map(|part| {
                let (key, value) = part.split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| value.trim().trim_matches('"').to_string())
            })
        })
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!("Body contained invalid {} sequences", encoding.name());
    }
    text.into_owned()
}

/// The final, successful response for a URL.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after following redirects.
    pub final_url: Url,
    pub status: u16,
    pub html: String,
    /// Number of redirects followed.
    pub redirects: usize,
}

/// Fetch `input`, validating it and every redirect target first.
///
/// At most `max_redirects` redirects are followed; one more aborts with
/// [`Html2MdError::TooManyRedirects`]. A denial at any hop aborts before the
/// transport is called for that hop.
pub async fn fetch_validated(input: &str, session: &Session) -> Result<FetchedPage, Html2MdError> {
    let config = session.config();
    let mut current = input.to_string();
    let mut redirects = 0usize;

    loop {
        let url = validate_url(&current, config.scheme_policy, session.resolver())
            .await
            .inspect_err(|e| warn!("{e}"))?;

        info!("Fetching content from: {}", url);
        let response = session.transport().get(&url).await?;

        if response.is_redirect() {
            let Some(location) = response.location.as_deref() else {
                return Err(Html2MdError::HttpStatus {
                    url: url.to_string(),
                    status: response.status,
                });
            };
            if redirects >= config.max_redirects {
                return Err(Html2MdError::TooManyRedirects {
                    max: config.max_redirects,
                });
            }
            let next = url.join(location).map_err(|e| Html2MdError::BadRedirect {
                from: url.to_string(),
                location: location.to_string(),
                reason: e.to_string(),
            })?;
            info!("Redirecting: {} -> {}", url, next);
            redirects += 1;
            current = next.to_string();
            continue;
        }

        if !response.is_success() {
            return Err(Html2MdError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        debug!(
            "Fetched {} ({} bytes, {} redirect(s))",
            url,
            response.body.len(),
            redirects
        );
        return Ok(FetchedPage {
            final_url: url,
            status: response.status,
            html: response.body,
            redirects,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            let r = HttpResponse {
                status,
                location: Some("/x".into()),
                body: String::new(),
            };
            assert!(r.is_redirect(), "{status}");
        }
        let not = HttpResponse {
            status: 304,
            location: None,
            body: String::new(),
        };
        assert!(!not.is_redirect());
    }

    #[test]
    fn decode_body_defaults_to_utf8() {
        assert_eq!(decode_body("héllo".as_bytes(), None), "héllo");
        assert_eq!(decode_body("héllo".as_bytes(), Some("text/html")), "héllo");
    }

    #[test]
    fn decode_body_honours_charset() {
        // 0xE9 is é in windows-1252 / latin-1.
        let bytes = [b'c', b'a', b'f', 0xE9];
        assert_eq!(
            decode_body(&bytes, Some("text/html; charset=ISO-8859-1")),
            "café"
        );
        assert_eq!(
            decode_body(&bytes, Some("text/html; Charset=\"windows-1252\"")),
            "café"
        );
    }

    #[test]
    fn decode_body_unknown_charset_falls_back() {
        assert_eq!(decode_body(b"plain", Some("text/html; charset=bogus")), "plain");
    }
}
