//! Adapter for the bespoke JSON blog API (a flat `posts.json` index).

use crate::transport::{parse_error, send_text};
use chrono::DateTime;
use homefeed_core::{BlogSource, FeedDraft, FetchError};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct BlogIndex {
    posts: Vec<BlogPost>,
}

/// Provider shape. Everything is optional at this layer; the merger drops
/// entries that are unusable.
#[derive(Debug, Deserialize)]
struct BlogPost {
    title: Option<String>,
    url: Option<String>,
    published: Option<String>,
    image: Option<String>,
}

pub(crate) async fn fetch_blog_posts(
    client: &Client,
    blog: &BlogSource,
) -> Result<Vec<FeedDraft>, FetchError> {
    let body = send_text(client.get(&blog.url)).await?;
    parse_blog_index(&body, &blog.name)
}

fn parse_blog_index(body: &str, source_name: &str) -> Result<Vec<FeedDraft>, FetchError> {
    let index: BlogIndex = serde_json::from_str(body).map_err(parse_error)?;
    Ok(index
        .posts
        .into_iter()
        .map(|post| FeedDraft {
            title: post.title,
            link: post.url,
            source_name: source_name.to_string(),
            published_at: post
                .published
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.to_utc()),
            image_url: post.image,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blog_index() {
        let body = r#"{"posts":[
            {"title":"Staking update","url":"https://staking.example/update","published":"2024-01-03T08:30:00Z","image":"https://staking.example/u.png"},
            {"title":"Undated post","url":"https://staking.example/undated","published":"yesterday-ish"}
        ]}"#;
        let drafts = parse_blog_index(body, "Staking Weekly").unwrap();
        assert_eq!(drafts.len(), 2);

        assert_eq!(drafts[0].title.as_deref(), Some("Staking update"));
        assert_eq!(drafts[0].source_name, "Staking Weekly");
        assert!(drafts[0].published_at.is_some());

        // an unparseable date becomes a missing field, not an adapter failure
        assert!(drafts[1].published_at.is_none());
    }

    #[test]
    fn test_parse_blog_index_bad_shape() {
        let err = parse_blog_index(r#"{"articles":[]}"#, "x").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
