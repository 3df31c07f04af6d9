//! Per-process memoization of async producers.
//!
//! Every external source is slow and rate limited, while one generation run
//! asks for the same data once per locale. Wrapping each adapter in a
//! [`SingleFlight`] cell guarantees at most one execution of the underlying
//! fetch per process, with every caller sharing the settled result.

use homefeed_core::{CommunityEvent, FeedDraft, FetchError, MetricRecord};
use std::future::Future;
use tokio::sync::OnceCell;

/// A single-flight memo cell for one async producer.
///
/// The first caller runs the producer; callers arriving while it is in
/// flight await the same execution; later callers get the cached result
/// without re-invoking. A failed producer poisons the cell: the same error
/// is returned for the cell's whole lifetime and the producer is never
/// retried. Fresh cells per process give fresh attempts.
pub struct SingleFlight<T> {
    cell: OnceCell<Result<T, FetchError>>,
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the settled result, running `producer` only if this cell has
    /// never settled. Never cancels a producer; callers block until the
    /// in-flight execution settles.
    pub async fn get_or_fetch<F, Fut>(&self, producer: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        self.cell.get_or_init(producer).await.clone()
    }

    /// Whether this cell has settled (successfully or not).
    pub fn settled(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One memo cell per external source, constructed fresh per process (or per
/// preview-server regeneration cycle) and handed to the orchestrator.
/// Deliberately not a global: tests and regeneration cycles each build
/// their own.
#[derive(Default)]
pub struct FetchCache {
    pub total_staked: SingleFlight<MetricRecord>,
    pub node_count: SingleFlight<MetricRecord>,
    pub value_locked: SingleFlight<MetricRecord>,
    pub tx_count: SingleFlight<MetricRecord>,
    pub xml_feeds: SingleFlight<Vec<FeedDraft>>,
    pub blog_posts: SingleFlight<Vec<FeedDraft>>,
    pub community_events: SingleFlight<Vec<CommunityEvent>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }
}
