//! Progress-callback trait for per-chunk generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each chunk.
//!
//! # Example
//!
//! ```rust
//! use quizforge::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     questions: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for CountingCallback {
//!     fn on_chunk_complete(&self, page_number: usize, _total: usize, accepted: usize) {
//!         self.questions.fetch_add(accepted, Ordering::SeqCst);
//!         eprintln!("page {page_number}: {accepted} questions");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { questions: AtomicUsize::new(0) });
//! let config = GenerationConfig::builder()
//!     .progress_callback(counter as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generation pipeline as it processes each chunk.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Chunks are processed sequentially, but the trait is
/// `Send + Sync` so one callback can be shared by concurrent runs over
/// different sources.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once before the first chunk, with the number of selected chunks.
    fn on_generation_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called before the first generator call for a chunk.
    ///
    /// # Arguments
    /// * `page_number` — 1-indexed page (1 for single-block sources)
    /// * `total_chunks` — selected chunks in this run
    /// * `requested` — questions this chunk will ask for
    fn on_chunk_start(&self, page_number: usize, total_chunks: usize, requested: usize) {
        let _ = (page_number, total_chunks, requested);
    }

    /// Called before each retry of a batch.
    fn on_batch_retry(&self, page_number: usize, attempt: u32, reason: &str) {
        let _ = (page_number, attempt, reason);
    }

    /// Called when a chunk finished, with the number of records kept.
    fn on_chunk_complete(&self, page_number: usize, total_chunks: usize, accepted: usize) {
        let _ = (page_number, total_chunks, accepted);
    }

    /// Called when a chunk is skipped without calling the generator.
    fn on_chunk_skipped(&self, page_number: usize, total_chunks: usize, reason: &str) {
        let _ = (page_number, total_chunks, reason);
    }

    /// Called once after the last chunk.
    fn on_generation_complete(&self, total_chunks: usize, total_questions: usize) {
        let _ = (total_chunks, total_questions);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        skips: AtomicUsize,
        retries: AtomicUsize,
        questions: AtomicUsize,
    }

    impl GenerationProgressCallback for TrackingCallback {
        fn on_chunk_start(&self, _page: usize, _total: usize, _requested: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_retry(&self, _page: usize, _attempt: u32, _reason: &str) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _page: usize, _total: usize, accepted: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.questions.fetch_add(accepted, Ordering::SeqCst);
        }

        fn on_chunk_skipped(&self, _page: usize, _total: usize, _reason: &str) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_generation_start(3);
        cb.on_chunk_start(1, 3, 5);
        cb.on_batch_retry(1, 2, "malformed JSON");
        cb.on_chunk_complete(1, 3, 5);
        cb.on_chunk_skipped(2, 3, "empty page");
        cb.on_generation_complete(3, 5);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_chunk_start(1, 2, 5);
        tracker.on_batch_retry(1, 2, "no valid questions");
        tracker.on_chunk_complete(1, 2, 4);
        tracker.on_chunk_skipped(2, 2, "empty page");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.retries.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.questions.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_generation_start(10);
        cb.on_chunk_complete(1, 10, 3);
    }
}
