//! Plain text → PDF via pdfium.
//!
//! Layout is deliberately simple: A4 pages, 11 pt Helvetica, lines hard-wrapped
//! at [`WRAP_COLUMNS`] characters, a new page whenever the current one is
//! full. pdfium is bound per document inside `spawn_blocking`, and a
//! process-wide lock keeps concurrent batch workers from entering the
//! library at the same time.
//!
//! The library is looked up in this order:
//! 1. `PDFIUM_LIB_PATH` (path to the shared library file)
//! 2. the current directory
//! 3. the system library path

use crate::error::Html2MdError;
use pdfium_render::prelude::*;
use std::sync::Mutex;
use tracing::debug;

/// Maximum characters per output line.
pub const WRAP_COLUMNS: usize = 90;

const FONT_SIZE_PT: f32 = 11.0;
const LINE_HEIGHT_PT: f32 = 14.0;
const MARGIN_PT: f32 = 50.0;
// A4 in points.
const PAGE_HEIGHT_PT: f32 = 841.89;

static PDFIUM_LOCK: Mutex<()> = Mutex::new(());

fn lines_per_page() -> usize {
    ((PAGE_HEIGHT_PT - 2.0 * MARGIN_PT) / LINE_HEIGHT_PT) as usize
}

fn bind_pdfium() -> Result<Pdfium, Html2MdError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) => Pdfium::bind_to_library(&path)
            .map_err(|e| Html2MdError::PdfEngineUnavailable(format!("{path}: {e}")))?,
        Err(_) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| Html2MdError::PdfEngineUnavailable(e.to_string()))?,
    };
    Ok(Pdfium::new(bindings))
}

fn lock() -> Result<std::sync::MutexGuard<'static, ()>, Html2MdError> {
    PDFIUM_LOCK
        .lock()
        .map_err(|_| Html2MdError::Internal("pdfium lock poisoned".into()))
}

/// Check that pdfium can be bound, without producing a document.
///
/// The CLI calls this up front when `--all-formats` is given so a missing
/// library is reported once instead of once per URL.
pub fn check_pdf_engine() -> Result<(), Html2MdError> {
    let _guard = lock()?;
    bind_pdfium().map(|_| ())
}

/// Render `text` to PDF bytes on the blocking pool.
pub async fn render_text_pdf(text: &str) -> Result<Vec<u8>, Html2MdError> {
    let text = text.to_string();
    tokio::task::spawn_blocking(move || render_text_pdf_blocking(&text))
        .await
        .map_err(|e| Html2MdError::Internal(format!("PDF task panicked: {}", e)))?
}

fn render_text_pdf_blocking(text: &str) -> Result<Vec<u8>, Html2MdError> {
    let _guard = lock()?;
    let pdfium = bind_pdfium()?;
    let pdf_err = |e: PdfiumError| Html2MdError::PdfRender(e.to_string());

    let mut document = pdfium.create_new_pdf().map_err(pdf_err)?;
    let font = document.fonts_mut().helvetica();

    let lines = wrap_lines(text, WRAP_COLUMNS);
    let per_page = lines_per_page();
    let pages: Vec<&[String]> = if lines.is_empty() {
        vec![lines.as_slice()]
    } else {
        lines.chunks(per_page).collect()
    };

    for chunk in &pages {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(pdf_err)?;
        for (i, line) in chunk.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let y = PAGE_HEIGHT_PT - MARGIN_PT - (i as f32 + 1.0) * LINE_HEIGHT_PT;
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(MARGIN_PT),
                    PdfPoints::new(y),
                    line,
                    font,
                    PdfPoints::new(FONT_SIZE_PT),
                )
                .map_err(pdf_err)?;
        }
    }

    debug!("Rendered {} line(s) onto {} page(s)", lines.len(), pages.len());
    document.save_to_bytes().map_err(pdf_err)
}

/// Hard-wrap `text` to at most `width` characters per line.
///
/// Breaks at the last space before the limit when there is one, otherwise
/// mid-word. Blank lines are kept so paragraphs stay separated.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for line in text.lines() {
        let mut rest: Vec<char> = line.trim_end().chars().collect();
        if rest.is_empty() {
            out.push(String::new());
            continue;
        }
        while rest.len() > width {
            let split = rest[..=width]
                .iter()
                .rposition(|c| *c == ' ')
                .filter(|&p| p > 0)
                .unwrap_or(width);
            let head: String = rest[..split].iter().collect();
            out.push(head.trim_end().to_string());
            let skip = if rest.get(split) == Some(&' ') { split + 1 } else { split };
            rest.drain(..skip);
        }
        out.push(rest.into_iter().collect());
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out
}
