//! Main-content selection and plain-text extraction.

use dom_query::Document;

/// Candidate containers for the "main content" of a page, most specific first.
const MAIN_CONTENT_SELECTORS: &[&str] = &["main", "article", "[role=main]", "body"];

/// Elements after which a line break is inserted before taking text, so
/// `<p>a</p><p>b</p>` yields two lines rather than `ab`.
const BLOCK_SELECTOR: &str = "p, div, section, article, main, header, footer, aside, nav, \
li, dt, dd, tr, blockquote, pre, table, ul, ol, dl, figure, figcaption, \
h1, h2, h3, h4, h5, h6, hr";

/// Outer HTML of the first main-content candidate, or `None` if the
/// document has none of them.
pub fn select_main_content(doc: &Document) -> Option<String> {
    MAIN_CONTENT_SELECTORS.iter().find_map(|selector| {
        let sel = doc.select(selector).first();
        sel.exists().then(|| sel.html().to_string())
    })
}

/// Plain text of `html`: block boundaries become line breaks, each line is
/// trimmed, and runs of blank lines collapse to one.
pub fn extract_text(html: &str) -> String {
    let doc = Document::from(html);
    doc.select("br").replace_with_html("\n");
    doc.select(BLOCK_SELECTOR).append_html("\n");

    let body = doc.select("body");
    let raw = if body.exists() {
        body.text().to_string()
    } else {
        doc.select("html").text().to_string()
    };
    normalize_text(&raw)
}

/// Trim every line and collapse consecutive blank lines.
pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = true;
    for line in raw.lines().map(str::trim) {
        if line.is_empty() {
            if !blank_run {
                out.push('\n');
                blank_run = true;
            }
            continue;
        }
        out.push_str(line);
        out.push('\n');
        blank_run = false;
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}
