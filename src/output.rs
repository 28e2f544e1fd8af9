//! Output naming, collision-free writes and result types.
//!
//! Names are derived from the URL and never overwrite an existing file:
//! `page.md`, then `page (1).md`, `page (2).md`, … The final claim on a name
//! is an atomic no-clobber rename of a fully written temp file, so two batch
//! workers that pick the same free name cannot overwrite each other and a
//! reader never sees a half-written output.

use crate::error::Html2MdError;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Stem used when a URL yields no usable file name.
pub const FALLBACK_BASENAME: &str = "conversion_result";

/// Characters replaced with `_` in derived file names.
const UNSAFE_FILENAME_CHARS: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

/// The kinds of file a conversion can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Text,
    Pdf,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Text => "txt",
            OutputFormat::Pdf => "pdf",
        }
    }
}

/// The result of converting one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// URL as given by the caller (after `/?` normalisation).
    pub input: String,
    /// URL the content was finally served from.
    pub final_url: String,
    /// Redirects followed to get there.
    pub redirects: usize,
    /// Cleaned Markdown.
    pub markdown: String,
    /// Plain text, present when all formats were requested.
    pub text: Option<String>,
    /// Files written, in `md`, `txt`, `pdf` order. Empty in stdout mode.
    pub written: Vec<PathBuf>,
}

impl ConversionOutput {
    /// First written path, or `"stdout"` when nothing was written.
    pub fn output_label(&self) -> String {
        self.written
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".to_string())
    }
}

/// Derive a file stem from a URL.
///
/// Drops the query, trailing slashes and everything up to the last `/`.
/// `http://example.com/` gives `example.com`, `http://example.com/foo?x=1`
/// gives `foo`, and anything that leaves nothing usable gives
/// [`FALLBACK_BASENAME`].
pub fn output_basename(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or_default();
    let without_fragment = without_query.split('#').next().unwrap_or_default();
    let trimmed = without_fragment.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or_default();

    let safe: String = last
        .chars()
        .map(|c| {
            if UNSAFE_FILENAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let safe = safe.trim();

    // "http:" is what remains of a bare "http://" after trimming.
    if safe.is_empty() || safe == "." || safe == ".." || trimmed.ends_with(':') {
        FALLBACK_BASENAME.to_string()
    } else {
        safe.to_string()
    }
}

/// `dir/stem.ext` for `n == 0`, else `dir/stem (n).ext`.
pub fn numbered_path(dir: &Path, stem: &str, n: u64, ext: &str) -> PathBuf {
    if n == 0 {
        dir.join(format!("{stem}.{ext}"))
    } else {
        dir.join(format!("{stem} ({n}).{ext}"))
    }
}

/// `path` if nothing exists there, else the first free `stem (n).ext`.
pub fn get_unique_filepath(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1u64..)
        .map(|n| match &ext {
            Some(ext) => numbered_path(parent, &stem, n, ext),
            None => parent.join(format!("{stem} ({n})")),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Write `bytes` to `dir/stem.ext`, or the first free numbered variant.
pub fn write_unique(dir: &Path, stem: &str, ext: &str, bytes: &[u8]) -> Result<PathBuf, Html2MdError> {
    write_unique_group(dir, stem, &[(ext, bytes)])?
        .pop()
        .ok_or_else(|| Html2MdError::Internal("No output path claimed".to_string()))
}

/// Write sibling outputs that share one stem.
///
/// Picks the lowest `n` for which every `stem (n).ext` in `parts` is free,
/// so `page.md` and `page.txt` never drift to different numbers. Creates
/// `dir` if needed. Each file is written to a temp file in `dir` and then
/// linked into place without clobbering. If another writer claims one of
/// the names first, or a write fails, the files already placed for this
/// group are removed before the next `n` is tried or the error returned.
pub fn write_unique_group(
    dir: &Path,
    stem: &str,
    parts: &[(&str, &[u8])],
) -> Result<Vec<PathBuf>, Html2MdError> {
    std::fs::create_dir_all(dir).map_err(|e| write_err(dir, e))?;

    let mut n = 0u64;
    loop {
        let names: Vec<PathBuf> = parts
            .iter()
            .map(|(ext, _)| numbered_path(dir, stem, n, ext))
            .collect();
        if names.iter().any(|p| p.exists()) {
            n += 1;
            continue;
        }
        match claim_all(dir, &names, parts) {
            Ok(()) => {
                for (path, (_, bytes)) in names.iter().zip(parts) {
                    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
                }
                return Ok(names);
            }
            Err(Claim::Taken(path)) => {
                debug!("{} was claimed concurrently; probing again", path.display());
                n += 1;
            }
            Err(Claim::Failed(e)) => return Err(e),
        }
    }
}

enum Claim {
    Taken(PathBuf),
    Failed(Html2MdError),
}

fn write_err(path: &Path, source: std::io::Error) -> Html2MdError {
    Html2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

fn claim_all(dir: &Path, names: &[PathBuf], parts: &[(&str, &[u8])]) -> Result<(), Claim> {
    let mut temps = Vec::with_capacity(parts.len());
    for (_, bytes) in parts {
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Claim::Failed(write_err(dir, e)))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| Claim::Failed(write_err(tmp.path(), e)))?;
        temps.push(tmp);
    }

    let mut placed: Vec<&Path> = Vec::with_capacity(names.len());
    for (tmp, path) in temps.into_iter().zip(names) {
        if let Err(e) = tmp.persist_noclobber(path) {
            for done in &placed {
                if let Err(rm) = std::fs::remove_file(done) {
                    warn!("Could not remove partial output {}: {}", done.display(), rm);
                }
            }
            return Err(if e.error.kind() == ErrorKind::AlreadyExists {
                Claim::Taken(path.clone())
            } else {
                Claim::Failed(write_err(path, e.error))
            });
        }
        placed.push(path);
    }
    Ok(())
}
