use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identity of an external data source. One memo cell, one adapter and one
/// criticality classification exist per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    TotalStaked,
    NodeCount,
    ValueLocked,
    TxCount,
    XmlFeeds,
    BlogPosts,
    CommunityEvents,
}

impl SourceId {
    pub const ALL: [SourceId; 7] = [
        SourceId::TotalStaked,
        SourceId::NodeCount,
        SourceId::ValueLocked,
        SourceId::TxCount,
        SourceId::XmlFeeds,
        SourceId::BlogPosts,
        SourceId::CommunityEvents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::TotalStaked => "total_staked",
            SourceId::NodeCount => "node_count",
            SourceId::ValueLocked => "value_locked",
            SourceId::TxCount => "tx_count",
            SourceId::XmlFeeds => "xml_feeds",
            SourceId::BlogPosts => "blog_posts",
            SourceId::CommunityEvents => "community_events",
        }
    }

    /// Parse the config-file spelling of a source name.
    pub fn parse(name: &str) -> Option<SourceId> {
        SourceId::ALL.into_iter().find(|id| id.as_str() == name)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric values are numeric for every current provider, but the payload
/// schema allows preformatted text so a provider change stays non-breaking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

/// One fetched metric. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    pub value: MetricValue,
    pub fetched_at: DateTime<Utc>,
}

/// Canonical feed entry. `link` is the uniqueness key across all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Pre-normalization feed entry as an adapter saw it. Adapters only rename
/// provider fields into this shape; the merger decides what survives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDraft {
    pub title: Option<String>,
    pub link: Option<String>,
    pub source_name: String,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

/// Upcoming community call or event, always forward-looking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityEvent {
    pub title: String,
    pub date: DateTime<Utc>,
    pub calendar_link: String,
}

/// Terminal state of a regeneration cycle that produced a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Ready,
    Degraded,
}

/// Per-source outcome for one cycle, kept in the payload so consumers can
/// see which slices are authoritative and which are degraded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: SourceId,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The artifact of one regeneration cycle. Immutable after assembly; a new
/// cycle produces a wholly new payload, never a mutation of the old one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedPayload {
    pub locale: String,
    pub metrics: Vec<MetricRecord>,
    pub feed_items: Vec<FeedItem>,
    pub community_events: Vec<CommunityEvent>,
    pub generated_at: DateTime<Utc>,
    /// Seconds after `generated_at` at which this payload is stale.
    #[serde(with = "duration_secs")]
    pub revalidate_after: Duration,
    pub status: CycleStatus,
    pub sources: Vec<SourceReport>,
    pub dropped_feed_entries: usize,
}

impl AggregatedPayload {
    /// Whether the revalidation window has elapsed at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.generated_at);
        age.num_seconds() >= self.revalidate_after.as_secs() as i64
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

/// Complete site configuration (parsed and validated form of homefeed.toml)
#[derive(Debug, Clone)]
pub struct SiteSpec {
    pub site: SiteInfo,
    pub cycle: CycleConfig,
    pub metrics: MetricsConfig,
    pub feeds: Vec<FeedSource>,
    pub blog: BlogSource,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub name: String,
    pub locales: Vec<String>,
}

/// Cycle-level policy: revalidation window, transport timeout, criticality.
#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub revalidate: Duration,
    pub timeout: Duration,
    pub critical: Vec<SourceId>,
    pub feed_limit: Option<usize>,
    pub events_limit: Option<usize>,
}

impl CycleConfig {
    pub fn is_critical(&self, source: SourceId) -> bool {
        self.critical.contains(&source)
    }
}

/// Endpoints for the on-chain metric providers.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub beacon_api: String,
    pub explorer_api: String,
    /// Name of the environment variable holding the explorer API key.
    /// The key itself never appears in config files.
    pub explorer_api_key_env: Option<String>,
    pub tvl_api: String,
}

/// One RSS/Atom feed to pull into the merged news list.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// The bespoke JSON blog API.
#[derive(Debug, Clone)]
pub struct BlogSource {
    pub name: String,
    pub url: String,
}

/// Community-events calendar API.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub api_url: String,
    pub calendar_id: String,
    pub api_key_env: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_source_id_round_trip() {
        for id in SourceId::ALL {
            assert_eq!(SourceId::parse(id.as_str()), Some(id));
        }
        assert_eq!(SourceId::parse("nonsense"), None);
    }

    #[test]
    fn test_payload_staleness() {
        let generated = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let payload = AggregatedPayload {
            locale: "en".into(),
            metrics: vec![],
            feed_items: vec![],
            community_events: vec![],
            generated_at: generated,
            revalidate_after: Duration::from_secs(3600),
            status: CycleStatus::Ready,
            sources: vec![],
            dropped_feed_entries: 0,
        };

        let fresh = generated + chrono::Duration::minutes(59);
        let stale = generated + chrono::Duration::minutes(61);
        assert!(!payload.is_stale(fresh));
        assert!(payload.is_stale(stale));
    }

    #[test]
    fn test_payload_serde_round_trip() {
        let payload = AggregatedPayload {
            locale: "en".into(),
            metrics: vec![MetricRecord {
                name: "node_count".into(),
                value: MetricValue::Number(12_000.0),
                fetched_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            }],
            feed_items: vec![],
            community_events: vec![],
            generated_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            revalidate_after: Duration::from_secs(86_400),
            status: CycleStatus::Degraded,
            sources: vec![],
            dropped_feed_entries: 2,
        };

        let json = serde_json::to_string(&payload).unwrap();
        let back: AggregatedPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.revalidate_after, Duration::from_secs(86_400));
        assert_eq!(back.status, CycleStatus::Degraded);
        assert_eq!(back.metrics[0].value, MetricValue::Number(12_000.0));
    }
}
