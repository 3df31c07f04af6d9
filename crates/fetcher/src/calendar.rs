//! Community-events calendar adapter.
//!
//! Queries the calendar API for events starting at the fetch time or later,
//! so the slice is always forward-looking.

use crate::transport::{parse_error, send_text};
use chrono::{DateTime, NaiveDate, Utc};
use homefeed_core::{CalendarConfig, CommunityEvent, FetchError};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    summary: Option<String>,
    #[serde(rename = "htmlLink")]
    html_link: Option<String>,
    start: Option<EventStart>,
}

#[derive(Debug, Deserialize)]
struct EventStart {
    /// Timed events
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    /// All-day events
    date: Option<String>,
}

pub(crate) async fn fetch_community_events(
    client: &Client,
    config: &CalendarConfig,
    api_key: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<CommunityEvent>, FetchError> {
    let url = format!(
        "{}/calendars/{}/events",
        config.api_url.trim_end_matches('/'),
        config.calendar_id
    );
    let mut request = client
        .get(&url)
        .query(&[("singleEvents", "true"), ("orderBy", "startTime")])
        .query(&[("timeMin", now.to_rfc3339())]);
    if let Some(key) = api_key {
        request = request.query(&[("key", key)]);
    }
    let body = send_text(request).await?;
    parse_events(&body)
}

fn parse_events(body: &str) -> Result<Vec<CommunityEvent>, FetchError> {
    let response: EventsResponse = serde_json::from_str(body).map_err(parse_error)?;
    let mut events: Vec<CommunityEvent> = response
        .items
        .into_iter()
        .filter_map(|item| {
            let start = item.start?;
            Some(CommunityEvent {
                title: item.summary?,
                date: event_date(&start)?,
                calendar_link: item.html_link?,
            })
        })
        .collect();
    // the API is asked for start-time order, but don't rely on it
    events.sort_by_key(|e| e.date);
    Ok(events)
}

fn event_date(start: &EventStart) -> Option<DateTime<Utc>> {
    if let Some(date_time) = &start.date_time {
        return DateTime::parse_from_rfc3339(date_time)
            .ok()
            .map(|dt| dt.to_utc());
    }
    let date = NaiveDate::parse_from_str(start.date.as_deref()?, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_events_mixed_timed_and_all_day() {
        let body = r#"{"items":[
            {"summary":"Community call","htmlLink":"https://cal.example/e/2","start":{"dateTime":"2024-07-10T16:00:00Z"}},
            {"summary":"Hackathon","htmlLink":"https://cal.example/e/1","start":{"date":"2024-07-01"}},
            {"summary":"No start on this one","htmlLink":"https://cal.example/e/3"}
        ]}"#;
        let events = parse_events(body).unwrap();
        // incomplete item skipped, remainder ordered by start
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].title, "Hackathon");
        assert_eq!(events[1].title, "Community call");
        assert_eq!(events[1].calendar_link, "https://cal.example/e/2");
    }

    #[test]
    fn test_parse_events_empty_calendar() {
        assert!(parse_events(r#"{}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_events_bad_body() {
        assert!(matches!(
            parse_events("not json").unwrap_err(),
            FetchError::Parse(_)
        ));
    }
}
