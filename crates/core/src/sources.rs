use crate::error::FetchError;
use crate::types::{CommunityEvent, FeedDraft, MetricRecord};
use async_trait::async_trait;

/// The set of external data sources one regeneration cycle draws from.
///
/// Each method performs one network round trip (or a small fixed fan-out the
/// adapter owns, in the case of `xml_feeds`) and returns a normalized record
/// or a typed [`FetchError`]. Implementations must not share mutable state
/// between methods; the orchestrator runs them fully in parallel and wraps
/// each behind its own memo cell.
#[async_trait]
pub trait Sources: Send + Sync {
    async fn total_staked(&self) -> Result<MetricRecord, FetchError>;
    async fn node_count(&self) -> Result<MetricRecord, FetchError>;
    async fn value_locked(&self) -> Result<MetricRecord, FetchError>;
    async fn tx_count(&self) -> Result<MetricRecord, FetchError>;

    /// Entries from every configured RSS/Atom feed, pre-normalization.
    async fn xml_feeds(&self) -> Result<Vec<FeedDraft>, FetchError>;

    /// Entries from the bespoke JSON blog API, pre-normalization.
    async fn blog_posts(&self) -> Result<Vec<FeedDraft>, FetchError>;

    /// Upcoming events, ordered by start time.
    async fn community_events(&self) -> Result<Vec<CommunityEvent>, FetchError>;
}
