//! HTML sanitizer: drop active content before conversion.
//!
//! Three passes over the parsed DOM:
//!
//! 1. Elements in [`DANGEROUS_TAGS`] are removed with their subtree.
//! 2. Every `on*` event-handler attribute is removed.
//! 3. URL-bearing attributes whose value starts with a denied scheme
//!    (`javascript:`, `vbscript:`, `data:`) are removed.
//!
//! The Markdown serializer is handed the same tag list as its skip list, so
//! an element that survives here is still not rendered.

use dom_query::{Document, Selection};
use tracing::debug;

/// Elements removed entirely, subtree included.
pub const DANGEROUS_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "applet", "noscript", "frame", "frameset",
    "base", "link", "meta",
];

/// Attributes that carry a URL a browser would navigate to or load.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "xlink:href"];

const DENIED_URL_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Parse `html`, sanitize it, and serialize it back.
pub fn sanitize_html(html: &str) -> String {
    let doc = Document::from(html);
    sanitize_document(&doc);
    doc.html().to_string()
}

/// Sanitize an already-parsed document in place.
pub fn sanitize_document(doc: &Document) {
    let dangerous = doc.select(&DANGEROUS_TAGS.join(", "));
    let removed = dangerous.length();
    dangerous.remove();

    let mut stripped = 0usize;
    for node in doc.select("*").nodes() {
        let sel = Selection::from(node.clone());
        for (name, value) in element_attributes(&sel) {
            let lower = name.to_ascii_lowercase();
            let drop = lower.starts_with("on")
                || (URL_ATTRIBUTES.contains(&lower.as_str()) && is_dangerous_url(&value));
            if drop {
                sel.remove_attr(&name);
                stripped += 1;
            }
        }
    }

    if removed > 0 || stripped > 0 {
        debug!(
            "Sanitizer removed {} element(s) and {} attribute(s)",
            removed, stripped
        );
    }
}

fn element_attributes(sel: &Selection) -> Vec<(String, String)> {
    sel.nodes()
        .first()
        .map(|node| {
            node.attrs()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// True if `value` would execute or embed content when followed.
///
/// Browsers ignore embedded tabs, newlines and other control characters in
/// a scheme (`java\tscript:`), and leading whitespace, so those are removed
/// before comparing.
pub fn is_dangerous_url(value: &str) -> bool {
    let normalized: String = value
        .trim()
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect::<String>()
        .to_ascii_lowercase();
    DENIED_URL_SCHEMES.iter().any(|s| normalized.starts_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_script_blocks() {
        let out = sanitize_html("<p>Hi</p><script>alert('x')</script>");
        assert!(!out.contains("<script"), "got: {out}");
        assert!(!out.contains("alert"));
        assert!(out.contains("<p>Hi</p>"));
    }

    #[test]
    fn removes_every_dangerous_tag() {
        let html = r#"<head><base href="http://evil/"><meta http-equiv="refresh" content="0">
            <link rel="stylesheet" href="x.css"><style>body{}</style></head>
            <body><iframe src="x"></iframe><object></object><embed src="x">
            <applet></applet><noscript>ns</noscript><p>keep</p></body>"#;
        let out = sanitize_html(html);
        for tag in DANGEROUS_TAGS {
            assert!(!out.contains(&format!("<{tag}")), "<{tag}> survived: {out}");
        }
        assert!(out.contains("keep"));
    }

    #[test]
    fn strips_event_handlers_case_insensitively() {
        let out = sanitize_html(r#"<img src="a.png" onerror="x()"><div OnClick="y()">t</div>"#);
        assert!(!out.to_lowercase().contains("onerror"));
        assert!(!out.to_lowercase().contains("onclick"));
        assert!(out.contains(r#"src="a.png""#));
    }

    #[test]
    fn strips_javascript_href() {
        let out = sanitize_html(r#"<a href="javascript:alert(1)">Click me</a>"#);
        assert!(!out.contains("javascript:"), "got: {out}");
        assert!(out.contains("Click me"));
    }

    #[test]
    fn strips_obfuscated_schemes() {
        assert!(is_dangerous_url("  JavaScript:alert(1)"));
        assert!(is_dangerous_url("java\tscript:alert(1)"));
        assert!(is_dangerous_url("java\nscript:void(0)"));
        assert!(is_dangerous_url("VBScript:msgbox"));
        assert!(is_dangerous_url("data:text/html;base64,PHNjcmlwdD4="));
    }

    #[test]
    fn keeps_ordinary_urls() {
        assert!(!is_dangerous_url("https://example.com/"));
        assert!(!is_dangerous_url("/relative/path"));
        assert!(!is_dangerous_url("#anchor"));
        assert!(!is_dangerous_url("mailto:someone@example.com"));
    }

    #[test]
    fn strips_data_src_and_form_action() {
        let out = sanitize_html(
            r#"<img src="data:image/svg+xml,<svg onload=x>"><form action="javascript:x()"><button formaction="vbscript:y">b</button></form>"#,
        );
        assert!(!out.contains("data:"), "got: {out}");
        assert!(!out.contains("javascript:"));
        assert!(!out.contains("vbscript:"));
    }
}
