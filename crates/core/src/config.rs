use crate::error::{Error, Result};
use crate::types::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_REVALIDATE_HOURS: u64 = 24;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Raw TOML configuration structure
/// This matches the homefeed.toml file structure exactly
#[derive(Debug, Deserialize)]
struct RawConfig {
    site: RawSite,
    #[serde(default)]
    cycle: RawCycle,
    metrics: RawMetrics,
    #[serde(default)]
    feed: Vec<RawFeed>,
    blog: RawBlog,
    calendar: RawCalendar,
}

#[derive(Debug, Deserialize)]
struct RawSite {
    name: String,
    locales: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCycle {
    revalidate_hours: Option<u64>,
    timeout_secs: Option<u64>,
    critical: Option<Vec<String>>,
    feed_limit: Option<usize>,
    events_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawMetrics {
    beacon_api: String,
    explorer_api: String,
    explorer_api_key_env: Option<String>,
    tvl_api: String,
}

#[derive(Debug, Deserialize)]
struct RawFeed {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawBlog {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RawCalendar {
    api_url: String,
    calendar_id: String,
    api_key_env: Option<String>,
}

/// Parse homefeed.toml from a file path
pub fn parse_site_toml<P: AsRef<Path>>(path: P) -> Result<SiteSpec> {
    let content = fs::read_to_string(path)?;
    parse_site_toml_str(&content)
}

/// Parse homefeed.toml from a string (useful for testing)
pub fn parse_site_toml_str(content: &str) -> Result<SiteSpec> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.site.name.trim().is_empty() {
        return Err(Error::ConfigParse("site.name must not be empty".into()));
    }
    if raw.site.locales.is_empty() {
        return Err(Error::ConfigParse(
            "site.locales must list at least one locale".into(),
        ));
    }
    for locale in &raw.site.locales {
        if locale.trim().is_empty() {
            return Err(Error::ConfigParse("site.locales contains an empty locale".into()));
        }
    }

    let revalidate_hours = raw
        .cycle
        .revalidate_hours
        .unwrap_or(DEFAULT_REVALIDATE_HOURS);
    if revalidate_hours == 0 {
        return Err(Error::ConfigParse(
            "cycle.revalidate_hours must be greater than zero".into(),
        ));
    }
    let timeout_secs = raw.cycle.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(Error::ConfigParse(
            "cycle.timeout_secs must be greater than zero".into(),
        ));
    }

    // Only the calendar is critical by default; a metric or feed failure
    // degrades its payload slice instead.
    let critical = match raw.cycle.critical {
        Some(names) => names
            .iter()
            .map(|name| {
                SourceId::parse(name).ok_or_else(|| {
                    Error::ConfigParse(format!(
                        "cycle.critical names unknown source '{}'",
                        name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        None => vec![SourceId::CommunityEvents],
    };

    let cycle = CycleConfig {
        revalidate: Duration::from_secs(revalidate_hours * 3600),
        timeout: Duration::from_secs(timeout_secs),
        critical,
        feed_limit: raw.cycle.feed_limit,
        events_limit: raw.cycle.events_limit,
    };

    let metrics = MetricsConfig {
        beacon_api: validate_url(&raw.metrics.beacon_api, "metrics.beacon_api")?,
        explorer_api: validate_url(&raw.metrics.explorer_api, "metrics.explorer_api")?,
        explorer_api_key_env: raw.metrics.explorer_api_key_env,
        tvl_api: validate_url(&raw.metrics.tvl_api, "metrics.tvl_api")?,
    };

    let feeds: Result<Vec<FeedSource>> = raw
        .feed
        .into_iter()
        .map(|f| {
            if f.name.trim().is_empty() {
                return Err(Error::ConfigParse("feed.name must not be empty".into()));
            }
            Ok(FeedSource {
                url: validate_url(&f.url, "feed.url")?,
                name: f.name,
            })
        })
        .collect();

    if raw.blog.name.trim().is_empty() {
        return Err(Error::ConfigParse("blog.name must not be empty".into()));
    }
    let blog = BlogSource {
        url: validate_url(&raw.blog.url, "blog.url")?,
        name: raw.blog.name,
    };

    if raw.calendar.calendar_id.trim().is_empty() {
        return Err(Error::ConfigParse(
            "calendar.calendar_id must not be empty".into(),
        ));
    }
    let calendar = CalendarConfig {
        api_url: validate_url(&raw.calendar.api_url, "calendar.api_url")?,
        calendar_id: raw.calendar.calendar_id,
        api_key_env: raw.calendar.api_key_env,
    };

    Ok(SiteSpec {
        site: SiteInfo {
            name: raw.site.name,
            locales: raw.site.locales,
        },
        cycle,
        metrics,
        feeds: feeds?,
        blog,
        calendar,
    })
}

/// Validate an endpoint URL from user configuration.
///
/// Only `http://` and `https://` schemes are accepted; everything these URLs
/// feed into is an outbound network client, so file or data URLs in a config
/// file are always a mistake.
fn validate_url(url: &str, field_name: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::ConfigParse(format!("Empty URL in '{}' field", field_name)));
    }
    if !trimmed.starts_with("https://") && !trimmed.starts_with("http://") {
        return Err(Error::ConfigParse(format!(
            "URL in '{}' must be http(s): '{}'",
            field_name, url
        )));
    }
    Ok(trimmed.to_string())
}
