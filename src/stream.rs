//! Streaming batch API: emit one result per URL as it completes.
//!
//! With an output directory URLs are fetched concurrently (up to
//! `config.concurrency` at once) and results arrive in completion order.
//! Without one they are processed one after another so Markdown printed to
//! stdout stays in batch-file order.

use crate::convert::process_url;
use crate::error::Html2MdError;
use crate::output::ConversionOutput;
use crate::progress::BatchProgress;
use crate::session::Session;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// The outcome for one batch entry.
#[derive(Debug)]
pub struct BatchItem {
    /// 1-indexed position in the input list.
    pub index: usize,
    /// The URL as given.
    pub input: String,
    pub result: Result<ConversionOutput, Html2MdError>,
}

/// A boxed stream of batch results.
pub type BatchStream = Pin<Box<dyn Stream<Item = BatchItem> + Send>>;

/// Tracks completion so `on_batch_complete` fires exactly once, after the
/// last item, whichever task finishes it.
struct BatchTracker {
    total: usize,
    finished: AtomicUsize,
    succeeded: AtomicUsize,
    progress: Option<BatchProgress>,
}

impl BatchTracker {
    fn start(&self, index: usize, url: &str) {
        if let Some(cb) = &self.progress {
            cb.on_url_start(index, self.total, url);
        }
    }

    fn finish(&self, item: &BatchItem) {
        match &item.result {
            Ok(out) => {
                self.succeeded.fetch_add(1, Ordering::SeqCst);
                if let Some(cb) = &self.progress {
                    cb.on_url_complete(item.index, self.total, &item.input, out.markdown.len());
                }
            }
            Err(e) => {
                if let Some(cb) = &self.progress {
                    cb.on_url_error(item.index, self.total, &item.input, &e.to_string());
                }
            }
        }
        let done = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
        if done == self.total {
            let ok = self.succeeded.load(Ordering::SeqCst);
            info!("Batch complete: {}/{} URL(s) converted", ok, self.total);
            if let Some(cb) = &self.progress {
                cb.on_batch_complete(self.total, ok);
            }
        }
    }
}

/// Convert `urls`, yielding a [`BatchItem`] per URL as each finishes.
pub fn convert_batch_stream(
    urls: Vec<String>,
    session: Session,
    outdir: Option<PathBuf>,
) -> BatchStream {
    let tracker = Arc::new(BatchTracker {
        total: urls.len(),
        finished: AtomicUsize::new(0),
        succeeded: AtomicUsize::new(0),
        progress: session.config().progress_callback.clone(),
    });
    if let Some(cb) = &tracker.progress {
        cb.on_batch_start(tracker.total);
        if tracker.total == 0 {
            cb.on_batch_complete(0, 0);
        }
    }
    info!("Starting batch of {} URL(s)", tracker.total);

    let concurrency = session.config().concurrency;
    let concurrent = outdir.is_some();

    let jobs = urls.into_iter().enumerate().map(move |(i, input)| {
        let session = session.clone();
        let outdir = outdir.clone();
        let tracker = Arc::clone(&tracker);
        async move {
            let index = i + 1;
            tracker.start(index, &input);
            let result = process_url(&input, &session, outdir.as_deref()).await;
            let item = BatchItem {
                index,
                input,
                result,
            };
            tracker.finish(&item);
            item
        }
    });

    if concurrent {
        Box::pin(stream::iter(jobs).buffer_unordered(concurrency))
    } else {
        Box::pin(stream::iter(jobs).then(|job| job))
    }
}
