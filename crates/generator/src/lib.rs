//! Generation orchestrator.
//!
//! One orchestrator serves one process: it owns the fetch cache, runs every
//! memoized adapter concurrently, waits for all of them to settle, merges
//! feed-shaped results and hands back an immutable [`AggregatedPayload`].
//! Repeated calls (one per locale) reuse the cache, so every source is
//! queried at most once per process.

use chrono::Utc;
use homefeed_core::{
    AggregatedPayload, CommunityEvent, CycleError, CycleStatus, FeedDraft, FetchError,
    MetricRecord, SiteSpec, SourceId, SourceReport, Sources,
};
use homefeed_fetcher::FetchCache;
use homefeed_merger::merge_feeds;

pub struct Orchestrator<S: Sources> {
    spec: SiteSpec,
    sources: S,
    cache: FetchCache,
}

impl<S: Sources> Orchestrator<S> {
    /// The cache is owned here rather than being process-global so tests
    /// and preview-server regeneration cycles get fresh cells by building a
    /// fresh orchestrator.
    pub fn new(spec: SiteSpec, sources: S) -> Self {
        Self {
            spec,
            sources,
            cache: FetchCache::new(),
        }
    }

    pub fn spec(&self) -> &SiteSpec {
        &self.spec
    }

    /// Run one regeneration cycle for `locale`.
    ///
    /// All adapters are invoked concurrently through their memo cells and
    /// the merge step starts only once every one of them has settled; a
    /// failure never short-circuits the others. Best-effort failures
    /// degrade their payload slice; a critical failure fails the cycle with
    /// [`CycleError`] and no partial payload.
    pub async fn generate_payload(&self, locale: &str) -> Result<AggregatedPayload, CycleError> {
        let (total_staked, node_count, value_locked, tx_count, xml_feeds, blog_posts, community_events) = tokio::join!(
            self.cache
                .total_staked
                .get_or_fetch(|| self.sources.total_staked()),
            self.cache
                .node_count
                .get_or_fetch(|| self.sources.node_count()),
            self.cache
                .value_locked
                .get_or_fetch(|| self.sources.value_locked()),
            self.cache.tx_count.get_or_fetch(|| self.sources.tx_count()),
            self.cache.xml_feeds.get_or_fetch(|| self.sources.xml_feeds()),
            self.cache
                .blog_posts
                .get_or_fetch(|| self.sources.blog_posts()),
            self.cache
                .community_events
                .get_or_fetch(|| self.sources.community_events()),
        );

        assemble_payload(
            locale,
            &self.spec,
            CycleResults {
                total_staked,
                node_count,
                value_locked,
                tx_count,
                xml_feeds,
                blog_posts,
                community_events,
            },
        )
    }
}

/// The settled outcome of every adapter for one cycle.
pub struct CycleResults {
    pub total_staked: Result<MetricRecord, FetchError>,
    pub node_count: Result<MetricRecord, FetchError>,
    pub value_locked: Result<MetricRecord, FetchError>,
    pub tx_count: Result<MetricRecord, FetchError>,
    pub xml_feeds: Result<Vec<FeedDraft>, FetchError>,
    pub blog_posts: Result<Vec<FeedDraft>, FetchError>,
    pub community_events: Result<Vec<CommunityEvent>, FetchError>,
}

/// The `Merging` step: classify each settled result, merge feed drafts and
/// assemble the payload. Pure so cycle policy is testable without I/O.
pub fn assemble_payload(
    locale: &str,
    spec: &SiteSpec,
    results: CycleResults,
) -> Result<AggregatedPayload, CycleError> {
    let mut reports = Vec::new();
    let mut degraded = false;

    fn settle<T>(
        spec: &SiteSpec,
        source: SourceId,
        result: Result<T, FetchError>,
        reports: &mut Vec<SourceReport>,
        degraded: &mut bool,
    ) -> Result<Option<T>, CycleError> {
        match result {
            Ok(value) => {
                reports.push(SourceReport {
                    source,
                    ok: true,
                    error: None,
                });
                Ok(Some(value))
            }
            Err(error) => {
                if spec.cycle.is_critical(source) {
                    return Err(CycleError { source, error });
                }
                reports.push(SourceReport {
                    source,
                    ok: false,
                    error: Some(error.to_string()),
                });
                *degraded = true;
                Ok(None)
            }
        }
    }

    let metric_results = [
        (SourceId::TotalStaked, results.total_staked),
        (SourceId::NodeCount, results.node_count),
        (SourceId::ValueLocked, results.value_locked),
        (SourceId::TxCount, results.tx_count),
    ];
    let mut metrics = Vec::new();
    for (source, result) in metric_results {
        if let Some(record) = settle(spec, source, result, &mut reports, &mut degraded)? {
            metrics.push(record);
        }
    }

    let xml_drafts = settle(
        spec,
        SourceId::XmlFeeds,
        results.xml_feeds,
        &mut reports,
        &mut degraded,
    )?
    .unwrap_or_default();
    let blog_drafts = settle(
        spec,
        SourceId::BlogPosts,
        results.blog_posts,
        &mut reports,
        &mut degraded,
    )?
    .unwrap_or_default();
    let merged = merge_feeds(vec![xml_drafts, blog_drafts], spec.cycle.feed_limit);

    let mut community_events = settle(
        spec,
        SourceId::CommunityEvents,
        results.community_events,
        &mut reports,
        &mut degraded,
    )?
    .unwrap_or_default();
    if let Some(limit) = spec.cycle.events_limit {
        community_events.truncate(limit);
    }

    Ok(AggregatedPayload {
        locale: locale.to_string(),
        metrics,
        feed_items: merged.items,
        community_events,
        generated_at: Utc::now(),
        revalidate_after: spec.cycle.revalidate,
        status: if degraded {
            CycleStatus::Degraded
        } else {
            CycleStatus::Ready
        },
        sources: reports,
        dropped_feed_entries: merged.dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use homefeed_core::{
        BlogSource, CalendarConfig, CycleConfig, MetricValue, MetricsConfig, SiteInfo,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_spec(critical: Vec<SourceId>) -> SiteSpec {
        SiteSpec {
            site: SiteInfo {
                name: "example.org".into(),
                locales: vec!["en".into(), "es".into()],
            },
            cycle: CycleConfig {
                revalidate: Duration::from_secs(86_400),
                timeout: Duration::from_secs(10),
                critical,
                feed_limit: None,
                events_limit: None,
            },
            metrics: MetricsConfig {
                beacon_api: "https://beacon.example".into(),
                explorer_api: "https://explorer.example".into(),
                explorer_api_key_env: None,
                tvl_api: "https://tvl.example".into(),
            },
            feeds: vec![],
            blog: BlogSource {
                name: "Blog".into(),
                url: "https://blog.example/posts.json".into(),
            },
            calendar: CalendarConfig {
                api_url: "https://calendar.example".into(),
                calendar_id: "c".into(),
                api_key_env: None,
            },
        }
    }

    fn metric(source: SourceId) -> MetricRecord {
        MetricRecord {
            name: source.as_str().into(),
            value: MetricValue::Number(1.0),
            fetched_at: Utc::now(),
        }
    }

    fn draft(title: &str, link: &str, day: u32) -> FeedDraft {
        FeedDraft {
            title: Some(title.into()),
            link: Some(link.into()),
            source_name: "Source".into(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()),
            image_url: None,
        }
    }

    fn all_ok() -> CycleResults {
        CycleResults {
            total_staked: Ok(metric(SourceId::TotalStaked)),
            node_count: Ok(metric(SourceId::NodeCount)),
            value_locked: Ok(metric(SourceId::ValueLocked)),
            tx_count: Ok(metric(SourceId::TxCount)),
            xml_feeds: Ok(vec![draft("A", "https://x", 2)]),
            blog_posts: Ok(vec![
                draft("A-dup", "https://x", 2),
                draft("B", "https://y", 3),
            ]),
            community_events: Ok(vec![CommunityEvent {
                title: "Community call".into(),
                date: Utc.with_ymd_and_hms(2024, 7, 10, 16, 0, 0).unwrap(),
                calendar_link: "https://cal.example/e/1".into(),
            }]),
        }
    }

    #[test]
    fn test_all_sources_ok_yields_ready() {
        let spec = test_spec(vec![SourceId::CommunityEvents]);
        let payload = assemble_payload("en", &spec, all_ok()).unwrap();

        assert_eq!(payload.status, CycleStatus::Ready);
        assert_eq!(payload.locale, "en");
        assert_eq!(payload.metrics.len(), 4);
        assert_eq!(payload.community_events.len(), 1);
        assert_eq!(payload.revalidate_after, Duration::from_secs(86_400));
        assert!(payload.sources.iter().all(|r| r.ok));

        // merged feed: dedupe by link, first-seen wins, newest first
        let links: Vec<_> = payload.feed_items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, vec!["https://y", "https://x"]);
        assert_eq!(payload.feed_items[1].title, "A");
    }

    #[test]
    fn test_best_effort_failure_degrades_slice_only() {
        let spec = test_spec(vec![]);
        let mut results = all_ok();
        results.xml_feeds = Err(FetchError::Network("dns failure".into()));

        let payload = assemble_payload("en", &spec, results).unwrap();

        assert_eq!(payload.status, CycleStatus::Degraded);
        // the failed slice is empty, the other feed source is intact
        assert_eq!(payload.feed_items.len(), 2);
        assert!(payload.feed_items.iter().all(|i| i.source_name == "Source"));
        assert_eq!(payload.metrics.len(), 4);
        assert_eq!(payload.community_events.len(), 1);

        let report = payload
            .sources
            .iter()
            .find(|r| r.source == SourceId::XmlFeeds)
            .unwrap();
        assert!(!report.ok);
        assert!(report.error.as_deref().unwrap().contains("dns failure"));
    }

    #[test]
    fn test_failed_metric_is_absent_from_payload() {
        let spec = test_spec(vec![]);
        let mut results = all_ok();
        results.tx_count = Err(FetchError::RateLimited);

        let payload = assemble_payload("en", &spec, results).unwrap();
        assert_eq!(payload.status, CycleStatus::Degraded);
        assert_eq!(payload.metrics.len(), 3);
        assert!(!payload.metrics.iter().any(|m| m.name == "tx_count"));
    }

    #[test]
    fn test_critical_failure_fails_cycle_without_partial_payload() {
        let spec = test_spec(vec![SourceId::CommunityEvents]);
        let mut results = all_ok();
        results.community_events = Err(FetchError::Network("calendar down".into()));

        let err = assemble_payload("en", &spec, results).unwrap_err();
        assert_eq!(err.source, SourceId::CommunityEvents);
        assert_eq!(err.error, FetchError::Network("calendar down".into()));
    }

    #[test]
    fn test_event_limit_truncates() {
        let mut spec = test_spec(vec![]);
        spec.cycle.events_limit = Some(1);
        let mut results = all_ok();
        let extra = CommunityEvent {
            title: "Second call".into(),
            date: Utc.with_ymd_and_hms(2024, 8, 1, 16, 0, 0).unwrap(),
            calendar_link: "https://cal.example/e/2".into(),
        };
        if let Ok(events) = &mut results.community_events {
            events.push(extra);
        }

        let payload = assemble_payload("en", &spec, results).unwrap();
        assert_eq!(payload.community_events.len(), 1);
    }

    /// Stub source set counting invocations per adapter.
    #[derive(Default)]
    struct StubSources {
        calls: [AtomicUsize; 7],
        fail_xml_feeds: bool,
    }

    impl StubSources {
        fn bump(&self, idx: usize) {
            self.calls[idx].fetch_add(1, Ordering::SeqCst);
        }

        fn call_counts(&self) -> Vec<usize> {
            self.calls.iter().map(|c| c.load(Ordering::SeqCst)).collect()
        }
    }

    #[async_trait]
    impl Sources for StubSources {
        async fn total_staked(&self) -> Result<MetricRecord, FetchError> {
            self.bump(0);
            Ok(metric(SourceId::TotalStaked))
        }

        async fn node_count(&self) -> Result<MetricRecord, FetchError> {
            self.bump(1);
            Ok(metric(SourceId::NodeCount))
        }

        async fn value_locked(&self) -> Result<MetricRecord, FetchError> {
            self.bump(2);
            Ok(metric(SourceId::ValueLocked))
        }

        async fn tx_count(&self) -> Result<MetricRecord, FetchError> {
            self.bump(3);
            Ok(metric(SourceId::TxCount))
        }

        async fn xml_feeds(&self) -> Result<Vec<FeedDraft>, FetchError> {
            self.bump(4);
            if self.fail_xml_feeds {
                Err(FetchError::Network("feed host unreachable".into()))
            } else {
                Ok(vec![draft("A", "https://x", 2)])
            }
        }

        async fn blog_posts(&self) -> Result<Vec<FeedDraft>, FetchError> {
            self.bump(5);
            Ok(vec![draft("B", "https://y", 3)])
        }

        async fn community_events(&self) -> Result<Vec<CommunityEvent>, FetchError> {
            self.bump(6);
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_locales_share_one_fetch_set() {
        let orchestrator = Orchestrator::new(test_spec(vec![]), StubSources::default());

        let en = orchestrator.generate_payload("en").await.unwrap();
        let es = orchestrator.generate_payload("es").await.unwrap();

        assert_eq!(en.locale, "en");
        assert_eq!(es.locale, "es");
        assert_eq!(en.feed_items, es.feed_items);
        // every source hit exactly once despite two cycles' worth of calls
        assert_eq!(orchestrator.sources.call_counts(), vec![1; 7]);
    }

    #[tokio::test]
    async fn test_failed_source_stays_failed_for_the_process() {
        let sources = StubSources {
            fail_xml_feeds: true,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(test_spec(vec![]), sources);

        let first = orchestrator.generate_payload("en").await.unwrap();
        let second = orchestrator.generate_payload("es").await.unwrap();

        assert_eq!(first.status, CycleStatus::Degraded);
        assert_eq!(second.status, CycleStatus::Degraded);
        // poisoned cell: the failing adapter was not retried
        assert_eq!(orchestrator.sources.call_counts()[4], 1);
    }
}
