//! RSS/Atom feed adapter.
//!
//! One logical source with a small fan-out: every configured feed URL is
//! fetched concurrently and the entries are pooled into one draft list. Any
//! feed failing fails the adapter as a whole; the orchestrator decides what
//! that does to the cycle.

use crate::transport::{parse_error, send_bytes};
use feed_rs::parser;
use homefeed_core::{FeedDraft, FeedSource, FetchError};
use reqwest::Client;

pub(crate) async fn fetch_xml_feeds(
    client: &Client,
    feeds: &[FeedSource],
) -> Result<Vec<FeedDraft>, FetchError> {
    let fetches = feeds.iter().map(|feed| fetch_one(client, feed));
    let results = futures::future::join_all(fetches).await;

    let mut drafts = Vec::new();
    for result in results {
        drafts.extend(result?);
    }
    Ok(drafts)
}

async fn fetch_one(client: &Client, feed: &FeedSource) -> Result<Vec<FeedDraft>, FetchError> {
    let bytes = send_bytes(client.get(&feed.url)).await?;
    parse_feed(&bytes, &feed.name)
}

/// Map RSS/Atom entries to drafts. Only field renaming happens here; entries
/// with missing fields survive as partial drafts for the merger to judge.
fn parse_feed(bytes: &[u8], source_name: &str) -> Result<Vec<FeedDraft>, FetchError> {
    let feed = parser::parse(bytes).map_err(parse_error)?;
    Ok(feed
        .entries
        .into_iter()
        .map(|entry| FeedDraft {
            title: entry.title.map(|t| t.content),
            link: entry.links.first().map(|l| l.href.clone()),
            source_name: source_name.to_string(),
            // Atom entries without <published> still carry <updated>
            published_at: entry.published.or(entry.updated),
            image_url: entry
                .media
                .iter()
                .flat_map(|m| &m.thumbnails)
                .next()
                .map(|t| t.image.uri.clone()),
        })
        .collect())
}
