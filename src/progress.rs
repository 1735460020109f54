//! Progress-callback trait for per-bid acquisition events.
//!
//! Inject an [`Arc<dyn ScrapeProgress>`] via
//! [`crate::config::ScrapeConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline pages through listings and enriches
//! each bid.
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a log stream, or a
//! database record without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` so configs holding
//! one can move freely across tasks.

use std::sync::Arc;

/// Called by the acquisition pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential: events for a given run
/// arrive in order, from a single task.
pub trait ScrapeProgress: Send + Sync {
    /// Called once a listing page has been fetched and extracted.
    ///
    /// # Arguments
    /// * `page`      — 1-indexed listing page number
    /// * `extracted` — bids extracted from this page after filtering
    fn on_page_fetched(&self, page: u32, extracted: usize) {
        let _ = (page, extracted);
    }

    /// Called just before a bid's documents are downloaded and parsed.
    fn on_bid_start(&self, bid_number: &str, processed: usize, target: usize) {
        let _ = (bid_number, processed, target);
    }

    /// Called when a bid's enrichment finishes (successfully or degraded
    /// to a sentinel).
    ///
    /// # Arguments
    /// * `matched_city` — the resolved district or sentinel text
    fn on_bid_complete(&self, bid_number: &str, matched_city: &str) {
        let _ = (bid_number, matched_city);
    }

    /// Called once when the run stops, before persistence.
    ///
    /// # Arguments
    /// * `total` — enriched records accumulated by the run
    fn on_run_complete(&self, total: usize) {
        let _ = total;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopScrapeProgress;

impl ScrapeProgress for NoopScrapeProgress {}

/// Convenience alias matching the type stored in [`crate::config::ScrapeConfig`].
pub type ProgressCallback = Arc<dyn ScrapeProgress>;
