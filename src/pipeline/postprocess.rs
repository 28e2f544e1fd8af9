//! Post-processing: deterministic cleanup of converted Markdown.
//!
//! The serializer output is faithful to the HTML, which on real pages means
//! Windows line endings copied from the source, runs of blank lines left by
//! removed navigation blocks, zero-width characters used for tracking, and
//! empty links left behind by icon-only anchors. Each rule below is a pure
//! `&str → String` pass and is tested on its own.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule sees `\n` only.
//! Invisible characters are removed before blank-line collapsing, since a
//! line holding only a zero-width space is blank once it is gone.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to raw serializer output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF/CR → LF)
/// 2. Replace non-breaking spaces with plain spaces
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, joiners)
/// 4. Drop empty links (`[](…)`) left by icon-only anchors
/// 5. Trim trailing whitespace per line
/// 6. Collapse 4+ consecutive newlines down to 3
/// 7. Drop leading blank lines; end with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = replace_nbsp(&s);
    let s = remove_invisible_chars(&s);
    let s = remove_empty_links(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Non-breaking spaces ──────────────────────────────────────────────

fn replace_nbsp(input: &str) -> String {
    input.replace('\u{00A0}', " ")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Remove empty links ───────────────────────────────────────────────
//
// `<a href="/"><svg …/></a>` becomes `[](/)` once the SVG is dropped. The
// link carries no text a reader could follow, so it goes. Images (`![](…)`)
// are left alone.

static RE_EMPTY_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^!\]])\[\s*\]\([^)]*\)").unwrap());

fn remove_empty_links(input: &str) -> String {
    RE_EMPTY_LINK.replace_all(input, "$1").to_string()
}

// ── Rule 5: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 7: Trim leading blank lines, single final newline ───────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_start_matches('\n').trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
