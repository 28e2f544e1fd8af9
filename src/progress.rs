//! Progress-callback trait for per-URL batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the batch driver works through its URLs. The CLI forwards them
//! to an `indicatif` bar; library users can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use html2md::{BatchProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_url_complete(&self, _index: usize, total: usize, url: &str, markdown_len: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}/{total} {url} ({markdown_len} bytes)");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch driver as it processes each URL.
///
/// With an output directory URLs are processed concurrently, so
/// `on_url_start`, `on_url_complete` and `on_url_error` may be called from
/// several tasks at once. All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first URL is fetched.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before a URL is validated and fetched.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in the batch file
    /// * `total`: number of URLs in the batch
    /// * `url`:   the URL as read from the batch file
    fn on_url_start(&self, index: usize, total: usize, url: &str) {
        let _ = (index, total, url);
    }

    /// Called when a URL converted successfully.
    fn on_url_complete(&self, index: usize, total: usize, url: &str, markdown_len: usize) {
        let _ = (index, total, url, markdown_len);
    }

    /// Called when a URL was blocked or failed.
    fn on_url_error(&self, index: usize, total: usize, url: &str, error: &str) {
        let _ = (index, total, url, error);
    }

    /// Called once after every URL has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type BatchProgress = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        successes: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_url_start(&self, _index: usize, _total: usize, _url: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_url_complete(&self, _index: usize, _total: usize, _url: &str, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_url_error(&self, _index: usize, _total: usize, _url: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total: usize, success_count: usize) {
            self.successes.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_url_start(1, 2, "https://example.com");
        cb.on_url_complete(1, 2, "https://example.com", 42);
        cb.on_url_error(2, 2, "file:///etc/passwd", "Invalid URL scheme 'file'");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_through_arc_dyn() {
        let tracker = Arc::new(TrackingCallback::default());
        let cb: BatchProgress = tracker.clone();

        cb.on_url_start(1, 2, "https://a.example");
        cb.on_url_complete(1, 2, "https://a.example", 10);
        cb.on_url_start(2, 2, "http://127.0.0.1");
        cb.on_url_error(2, 2, "http://127.0.0.1", "Blocked private IP: 127.0.0.1");
        cb.on_batch_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.successes.load(Ordering::SeqCst), 1);
    }
}
