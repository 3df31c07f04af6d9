//! Adapters for the four on-chain metric providers.
//!
//! Each adapter performs exactly one HTTP round trip and returns one
//! [`MetricRecord`]. Parsing is split from transport so response-shape
//! handling can be tested against provider fixtures.

use crate::transport::{parse_error, send_text};
use chrono::Utc;
use homefeed_core::{FetchError, MetricRecord, MetricValue, MetricsConfig, SourceId};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Native units represented by one active validator on the beacon chain.
const STAKE_PER_VALIDATOR: f64 = 32.0;

fn record(source: SourceId, value: f64) -> MetricRecord {
    MetricRecord {
        name: source.as_str().to_string(),
        value: MetricValue::Number(value),
        fetched_at: Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Total staked (beacon-chain explorer, latest-epoch endpoint)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BeaconEpochResponse {
    data: BeaconEpochData,
}

#[derive(Debug, Deserialize)]
struct BeaconEpochData {
    validatorscount: u64,
}

pub(crate) async fn fetch_total_staked(
    client: &Client,
    config: &MetricsConfig,
) -> Result<MetricRecord, FetchError> {
    let body = send_text(client.get(&config.beacon_api)).await?;
    Ok(record(SourceId::TotalStaked, parse_beacon_epoch(&body)?))
}

fn parse_beacon_epoch(body: &str) -> Result<f64, FetchError> {
    let response: BeaconEpochResponse = serde_json::from_str(body).map_err(parse_error)?;
    Ok(response.data.validatorscount as f64 * STAKE_PER_VALIDATOR)
}

// ---------------------------------------------------------------------------
// Block-explorer stats API (node count, daily transactions)
// ---------------------------------------------------------------------------

/// Unwrap the explorer's `{status, message, result}` envelope.
///
/// The explorer reports throttling in-band as a `status: "0"` response whose
/// text mentions the rate limit, rather than an HTTP 429.
fn parse_explorer<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(parse_error)?;
    let status = value.get("status").and_then(|v| v.as_str()).unwrap_or("");
    if status != "1" {
        let note = value
            .get("result")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()))
            .unwrap_or("unknown explorer error");
        if note.to_ascii_lowercase().contains("rate limit") {
            return Err(FetchError::RateLimited);
        }
        return Err(FetchError::Parse(format!("explorer error: {}", note)));
    }
    serde_json::from_value(value["result"].clone()).map_err(parse_error)
}

#[derive(Debug, Deserialize)]
struct NodeCountResult {
    #[serde(rename = "TotalNodeCount")]
    total_node_count: String,
}

pub(crate) async fn fetch_node_count(
    client: &Client,
    config: &MetricsConfig,
    api_key: Option<&str>,
) -> Result<MetricRecord, FetchError> {
    let mut request = client
        .get(&config.explorer_api)
        .query(&[("module", "stats"), ("action", "nodecount")]);
    if let Some(key) = api_key {
        request = request.query(&[("apikey", key)]);
    }
    let body = send_text(request).await?;
    Ok(record(SourceId::NodeCount, parse_node_count(&body)?))
}

fn parse_node_count(body: &str) -> Result<f64, FetchError> {
    let result: NodeCountResult = parse_explorer(body)?;
    result
        .total_node_count
        .parse::<f64>()
        .map_err(|_| FetchError::Parse(format!("non-numeric node count '{}'", result.total_node_count)))
}

#[derive(Debug, Deserialize)]
struct DailyTxPoint {
    #[serde(rename = "unixTimeStamp")]
    unix_time_stamp: String,
    #[serde(rename = "transactionCount")]
    transaction_count: u64,
}

pub(crate) async fn fetch_tx_count(
    client: &Client,
    config: &MetricsConfig,
    api_key: Option<&str>,
) -> Result<MetricRecord, FetchError> {
    let mut request = client
        .get(&config.explorer_api)
        .query(&[("module", "stats"), ("action", "dailytx")]);
    if let Some(key) = api_key {
        request = request.query(&[("apikey", key)]);
    }
    let body = send_text(request).await?;
    Ok(record(SourceId::TxCount, parse_daily_tx(&body)?))
}

/// Transactions on the most recent reported day.
fn parse_daily_tx(body: &str) -> Result<f64, FetchError> {
    let points: Vec<DailyTxPoint> = parse_explorer(body)?;
    points
        .iter()
        .max_by_key(|p| p.unix_time_stamp.parse::<i64>().unwrap_or(i64::MIN))
        .map(|p| p.transaction_count as f64)
        .ok_or_else(|| FetchError::Parse("empty daily transaction series".into()))
}

// ---------------------------------------------------------------------------
// Total value locked (TVL chart API)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TvlPoint {
    #[allow(dead_code)]
    date: serde_json::Value,
    #[serde(rename = "totalLiquidityUSD")]
    total_liquidity_usd: f64,
}

pub(crate) async fn fetch_value_locked(
    client: &Client,
    config: &MetricsConfig,
) -> Result<MetricRecord, FetchError> {
    let body = send_text(client.get(&config.tvl_api)).await?;
    Ok(record(SourceId::ValueLocked, parse_tvl_chart(&body)?))
}

/// The chart endpoint returns the full history; the metric is the most
/// recent point.
fn parse_tvl_chart(body: &str) -> Result<f64, FetchError> {
    let points: Vec<TvlPoint> = serde_json::from_str(body).map_err(parse_error)?;
    points
        .last()
        .map(|p| p.total_liquidity_usd)
        .ok_or_else(|| FetchError::Parse("empty TVL series".into()))
}
