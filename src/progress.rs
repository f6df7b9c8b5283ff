//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] (or pass one
//! to [`crate::convert::Converter::convert_with_progress`]) to receive events
//! as the batch is processed.
//!
//! Progress is best-effort: the pipeline never reads anything back from the
//! callback, and running without one produces identical output.
//!
//! # Example
//!
//! ```rust
//! use snaptex::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, latex_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Item {}/{} done ({} bytes)", index, total, latex_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes a batch.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// In parallel mode `on_item_start` runs on worker tasks and may be called
/// concurrently from different threads. Implementations must protect
/// shared mutable state (e.g. `Mutex`, `AtomicUsize`).
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after enumeration, before any model call.
    fn on_conversion_start(&self, total_items: usize) {
        let _ = total_items;
    }

    /// Called when a worker begins converting an item.
    ///
    /// # Arguments
    /// * `index`: 1-indexed page or image number
    /// * `total`: items in the batch
    fn on_item_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when an item produced LaTeX.
    fn on_item_complete(&self, index: usize, total: usize, latex_len: usize) {
        let _ = (index, total, latex_len);
    }

    /// Called when an item was replaced by a placeholder.
    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Coarse completion fraction.
    ///
    /// Fired once with `1.0` when a single-item batch finishes, or once
    /// after the whole parallel batch has been collected.
    fn on_progress(&self, fraction: f32) {
        let _ = fraction;
    }

    /// Called once after the document has been written (and compiled).
    fn on_conversion_complete(&self, total_items: usize, success_count: usize) {
        let _ = (total_items, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        fractions: Mutex<Vec<f32>>,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_item_start(&self, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_complete(&self, _index: usize, _total: usize, _latex_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_item_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_progress(&self, fraction: f32) {
            self.fractions.lock().unwrap().push(fraction);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_item_start(1, 5);
        cb.on_item_complete(1, 5, 42);
        cb.on_item_error(2, 5, "some error");
        cb.on_progress(1.0);
        cb.on_conversion_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_item_start(1, 2);
        tracker.on_item_complete(1, 2, 100);
        tracker.on_item_start(2, 2);
        tracker.on_item_error(2, 2, "VLM timeout");
        tracker.on_progress(1.0);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.fractions.lock().unwrap(), vec![1.0]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_conversion_start(10);
        cb.on_item_complete(1, 10, 512);
    }
}
