//! Eager conversion entry points.
//!
//! [`process_url`] runs the whole pipeline for one URL:
//!
//! ```text
//! normalise ─▶ validate+fetch ─▶ sanitize ─▶ [main content] ─▶ markdown ─▶ write
//!              (every hop)                                    [txt, pdf]
//! ```
//!
//! [`process_batch`] collects [`crate::stream::convert_batch_stream`] for
//! callers that want every result at once.

use crate::config::ConversionConfig;
use crate::error::Html2MdError;
use crate::output::{output_basename, write_unique_group, ConversionOutput, OutputFormat};
use crate::pipeline::extract::{extract_text, select_main_content};
use crate::pipeline::fetch::fetch_validated;
use crate::pipeline::markdown::html_to_markdown;
use crate::pipeline::pdf::render_text_pdf;
use crate::pipeline::sanitize::sanitize_document;
use crate::session::Session;
use crate::stream::{convert_batch_stream, BatchItem};
use dom_query::Document;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Markdown (and optionally plain text) rendered from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub markdown: String,
    pub text: Option<String>,
}

/// Fix the common `/?` typo (`https://x.test/?q=1` → `https://x.test?q=1`)
/// and surrounding whitespace.
///
/// Only a `/?` that opens the query of a bare-host URL is touched; paths and
/// query values pass through unchanged.
pub fn normalize_input_url(raw: &str) -> String {
    let raw = raw.trim();
    let Some(q) = raw.find('?') else {
        return raw.to_string();
    };
    let (head, query) = raw.split_at(q);
    let Some(host_start) = head.find("://").map(|i| i + 3) else {
        return raw.to_string();
    };
    match head[host_start..].find('/') {
        Some(slash) if host_start + slash == head.len() - 1 => {
            format!("{}{}", &head[..head.len() - 1], query)
        }
        _ => raw.to_string(),
    }
}

/// Fetch, sanitize and convert one URL.
///
/// With `outdir` the Markdown (and, with `all_formats`, the TXT and PDF) is
/// written there under a collision-free name; without it nothing touches the
/// filesystem and the caller prints [`ConversionOutput::markdown`].
pub async fn process_url(
    input: &str,
    session: &Session,
    outdir: Option<&Path>,
) -> Result<ConversionOutput, Html2MdError> {
    let url = normalize_input_url(input);
    info!("Processing URL: {}", url);

    let page = fetch_validated(&url, session).await?;

    info!("Converting to Markdown...");
    let config = session.config();
    let rendered = convert_html(&page.html, config)?;

    let written = match outdir {
        Some(dir) => write_outputs(dir, &output_basename(&url), &rendered).await?,
        None => Vec::new(),
    };
    for path in &written {
        info!("Saved {}", path.display());
    }

    Ok(ConversionOutput {
        input: url,
        final_url: page.final_url.to_string(),
        redirects: page.redirects,
        markdown: rendered.markdown,
        text: rendered.text,
        written,
    })
}

/// Sanitize `html` and render it per `config`. No I/O.
pub fn convert_html(html: &str, config: &ConversionConfig) -> Result<RenderedPage, Html2MdError> {
    let doc = Document::from(html);
    sanitize_document(&doc);

    let selected = if config.main_content {
        select_main_content(&doc).unwrap_or_else(|| doc.html().to_string())
    } else {
        doc.html().to_string()
    };

    let markdown = html_to_markdown(&selected)?;
    let text = config.all_formats.then(|| extract_text(&selected));
    debug!(
        "Rendered {} bytes of Markdown{}",
        markdown.len(),
        if text.is_some() { " plus text" } else { "" }
    );
    Ok(RenderedPage { markdown, text })
}

/// Render every payload first, then claim one shared name for all of them.
///
/// A PDF failure therefore leaves nothing on disk, and `page (1).md` always
/// sits next to `page (1).txt`.
async fn write_outputs(
    dir: &Path,
    stem: &str,
    rendered: &RenderedPage,
) -> Result<Vec<PathBuf>, Html2MdError> {
    let mut payloads = vec![(OutputFormat::Markdown, rendered.markdown.clone().into_bytes())];
    if let Some(text) = &rendered.text {
        let pdf = render_text_pdf(text).await?;
        payloads.push((OutputFormat::Text, text.clone().into_bytes()));
        payloads.push((OutputFormat::Pdf, pdf));
    }

    let dir = dir.to_path_buf();
    let stem = stem.to_string();
    tokio::task::spawn_blocking(move || {
        let parts: Vec<(&str, &[u8])> = payloads
            .iter()
            .map(|(format, bytes)| (format.extension(), bytes.as_slice()))
            .collect();
        write_unique_group(&dir, &stem, &parts)
    })
    .await
    .map_err(|e| Html2MdError::Internal(format!("Write task panicked: {}", e)))?
}

/// Read a batch file: one URL per line, blank lines and `#` comments skipped.
pub fn read_batch_file(path: &Path) -> Result<Vec<String>, Html2MdError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Html2MdError::BatchFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Html2MdError::BatchFileUnreadable {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Convert every URL in `urls`, returning one [`BatchItem`] per URL.
///
/// Items are in completion order when `outdir` is set (concurrent), input
/// order otherwise. A failing URL never stops the others.
pub async fn process_batch(
    urls: Vec<String>,
    session: &Session,
    outdir: Option<&Path>,
) -> Vec<BatchItem> {
    convert_batch_stream(urls, session.clone(), outdir.map(Path::to_path_buf))
        .collect()
        .await
}

/// Log a per-URL failure with its category prefix.
///
/// Always at `error`, so denials still show under `-q` and behind the
/// batch progress bar.
pub fn log_failure(input: &str, err: &Html2MdError) {
    error!("{}", failure_line(input, err));
}

/// `"<Category prefix> <message> (<input>)"`, as printed by [`log_failure`].
pub fn failure_line(input: &str, err: &Html2MdError) -> String {
    format!("{} {} ({})", err.category().prefix(), err, input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn normalize_fixes_slash_question_typo() {
        assert_eq!(
            normalize_input_url(" https://example.com/?q=1 "),
            "https://example.com?q=1"
        );
        assert_eq!(
            normalize_input_url("https://example.com/page"),
            "https://example.com/page"
        );
    }

    #[test]
    fn normalize_leaves_paths_and_query_values_alone() {
        assert_eq!(
            normalize_input_url("https://a.example/docs/?page=2&next=/?y"),
            "https://a.example/docs/?page=2&next=/?y"
        );
        assert_eq!(
            normalize_input_url("https://a.example/?next=/?y"),
            "https://a.example?next=/?y"
        );
        assert_eq!(normalize_input_url("not a url/?x"), "not a url/?x");
    }

    #[test]
    fn failure_line_carries_category_prefix() {
        let err = Html2MdError::Blocked(crate::error::ValidationError::PrivateIp {
            ip: "10.0.0.1".parse().unwrap(),
        });
        assert_eq!(
            failure_line("http://10.0.0.1/", &err),
            "Validation error: Blocked private IP: 10.0.0.1 (http://10.0.0.1/)"
        );
    }

    #[tokio::test]
    async fn all_formats_share_one_name_or_leave_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("page.md"), "old").unwrap();
        let rendered = RenderedPage {
            markdown: "# Page\n".to_string(),
            text: Some("Page\n".to_string()),
        };

        let names = |d: &Path| -> Vec<String> {
            let mut v: Vec<String> = std::fs::read_dir(d)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            v.sort();
            v
        };

        match write_outputs(dir.path(), "page", &rendered).await {
            Ok(paths) => {
                assert_eq!(
                    paths,
                    vec![
                        dir.path().join("page (1).md"),
                        dir.path().join("page (1).txt"),
                        dir.path().join("page (1).pdf"),
                    ]
                );
                assert_eq!(
                    names(dir.path()),
                    vec!["page (1).md", "page (1).pdf", "page (1).txt", "page.md"]
                );
            }
            // No pdfium here: the render fails before anything is written.
            Err(_) => assert_eq!(names(dir.path()), vec!["page.md"]),
        }
    }

    #[test]
    fn convert_html_sanitizes_before_rendering() {
        let html = r#"<html><body><h1>Hello</h1><script>alert('x')</script>
            <a href="javascript:alert(1)">Click me</a></body></html>"#;
        let page = convert_html(html, &ConversionConfig::default()).unwrap();
        assert!(page.markdown.contains("# Hello"), "got: {}", page.markdown);
        assert!(!page.markdown.contains("alert"));
        assert!(!page.markdown.contains("javascript:"));
        assert!(page.markdown.contains("Click me"));
        assert!(page.text.is_none());
    }

    #[test]
    fn convert_html_main_content_drops_chrome() {
        let html = "<body><nav>Site menu</nav><main><h2>Story</h2><p>Body text</p></main>\
                    <footer>Copyright</footer></body>";
        let config = ConversionConfig::builder().main_content(true).build().unwrap();
        let page = convert_html(html, &config).unwrap();
        assert!(page.markdown.contains("## Story"));
        assert!(!page.markdown.contains("Site menu"));
        assert!(!page.markdown.contains("Copyright"));
    }

    #[test]
    fn convert_html_all_formats_adds_text() {
        let config = ConversionConfig::builder().all_formats(true).build().unwrap();
        let page = convert_html("<p>One</p><p>Two</p>", &config).unwrap();
        assert_eq!(page.text.as_deref(), Some("One\nTwo\n"));
    }

    #[test]
    fn batch_file_skips_blanks_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(
            &path,
            "# header\nhttps://a.example\n\n   \n  https://b.example  \n#https://c.example\n",
        )
        .unwrap();
        assert_eq!(
            read_batch_file(&path).unwrap(),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn missing_batch_file_is_reported() {
        let err = read_batch_file(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, Html2MdError::BatchFileNotFound { .. }));
        assert!(err.to_string().starts_with("Batch file not found:"));
    }
}
