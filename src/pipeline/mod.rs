//! Pipeline stages for URL-to-Markdown conversion.
//!
//! Each submodule implements one step and is testable on its own; the
//! network-facing stages take their I/O through the traits in [`resolve`]
//! and [`fetch`] so tests can substitute fakes.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ fetch ──▶ sanitize ──▶ extract ──▶ markdown ──▶ postprocess
//! (SSRF)      (hops)     (XSS)       (main/txt)   (htmd)       (cleanup)
//!                                        └──────▶ pdf
//! ```
//!
//! 1. [`resolve`] / [`validate`]: scheme check, DNS resolution and the
//!    private-address deny list
//! 2. [`fetch`]: HTTP GET with manual redirect handling; every hop goes back
//!    through [`validate`]
//! 3. [`sanitize`]: strip active content from the parsed DOM
//! 4. [`extract`]: main-content selection and plain-text rendering
//! 5. [`markdown`] + [`postprocess`]: HTML → Markdown and whitespace cleanup
//! 6. [`pdf`]: plain text → PDF via pdfium; runs in `spawn_blocking`

pub mod extract;
pub mod fetch;
pub mod markdown;
pub mod pdf;
pub mod postprocess;
pub mod resolve;
pub mod sanitize;
pub mod validate;
