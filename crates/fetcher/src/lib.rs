//! Network side of payload generation: one adapter per external source plus
//! the single-flight memoization that keeps each source to at most one
//! round trip per process.

pub mod single_flight;

mod blog;
mod calendar;
mod feeds;
mod metrics;
mod transport;

pub use single_flight::{FetchCache, SingleFlight};

use async_trait::async_trait;
use chrono::Utc;
use homefeed_core::{
    CommunityEvent, Error, FeedDraft, FetchError, MetricRecord, SiteSpec, Sources,
};
use reqwest::Client;

/// HTTP implementation of [`Sources`].
///
/// One shared client with the configured transport timeout, so a slow
/// provider bounds its own adapter instead of stalling the cycle. Adapters
/// hold no mutable state and run fully in parallel.
pub struct HttpSources {
    client: Client,
    spec: SiteSpec,
    explorer_api_key: Option<String>,
    calendar_api_key: Option<String>,
}

impl HttpSources {
    /// Build from a validated site spec.
    ///
    /// API keys are resolved from the environment variables the config
    /// names. A missing variable leaves the corresponding requests
    /// unauthenticated; whether the provider tolerates that surfaces as an
    /// adapter error at fetch time, not here.
    pub fn new(spec: SiteSpec) -> homefeed_core::Result<Self> {
        let client = Client::builder()
            .timeout(spec.cycle.timeout)
            .build()
            .map_err(|e| Error::InvalidData(format!("failed to build HTTP client: {}", e)))?;
        let explorer_api_key = resolve_key(spec.metrics.explorer_api_key_env.as_deref());
        let calendar_api_key = resolve_key(spec.calendar.api_key_env.as_deref());
        Ok(Self {
            client,
            spec,
            explorer_api_key,
            calendar_api_key,
        })
    }
}

fn resolve_key(env_name: Option<&str>) -> Option<String> {
    std::env::var(env_name?).ok()
}

#[async_trait]
impl Sources for HttpSources {
    async fn total_staked(&self) -> Result<MetricRecord, FetchError> {
        metrics::fetch_total_staked(&self.client, &self.spec.metrics).await
    }

    async fn node_count(&self) -> Result<MetricRecord, FetchError> {
        metrics::fetch_node_count(
            &self.client,
            &self.spec.metrics,
            self.explorer_api_key.as_deref(),
        )
        .await
    }

    async fn value_locked(&self) -> Result<MetricRecord, FetchError> {
        metrics::fetch_value_locked(&self.client, &self.spec.metrics).await
    }

    async fn tx_count(&self) -> Result<MetricRecord, FetchError> {
        metrics::fetch_tx_count(
            &self.client,
            &self.spec.metrics,
            self.explorer_api_key.as_deref(),
        )
        .await
    }

    async fn xml_feeds(&self) -> Result<Vec<FeedDraft>, FetchError> {
        feeds::fetch_xml_feeds(&self.client, &self.spec.feeds).await
    }

    async fn blog_posts(&self) -> Result<Vec<FeedDraft>, FetchError> {
        blog::fetch_blog_posts(&self.client, &self.spec.blog).await
    }

    async fn community_events(&self) -> Result<Vec<CommunityEvent>, FetchError> {
        calendar::fetch_community_events(
            &self.client,
            &self.spec.calendar,
            self.calendar_api_key.as_deref(),
            Utc::now(),
        )
        .await
    }
}
