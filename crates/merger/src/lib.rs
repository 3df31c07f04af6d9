//! Feed normalization and merging.
//!
//! Takes the draft entries every feed-shaped adapter produced and builds the
//! one list the home page renders: canonical shape, unique links, newest
//! first.

use homefeed_core::{FeedDraft, FeedItem};
use std::collections::HashSet;

/// A merged feed list plus the number of drafts dropped for missing
/// required fields. Drops are expected operational noise (feeds publish
/// partial entries all the time) and must stay observable without failing
/// the merge.
#[derive(Debug, Clone, Default)]
pub struct MergedFeed {
    pub items: Vec<FeedItem>,
    pub dropped: usize,
}

/// Merge draft lists from any number of sources into one canonical list.
///
/// - A draft missing title, link, or publish date is dropped and counted.
/// - Links are unique; when two sources report the same link, the first one
///   seen in the given source order wins.
/// - The result is sorted by publish date, newest first.
/// - `limit` truncates the final list; `None` returns everything.
///
/// A source contributing zero entries is valid and contributes nothing.
pub fn merge_feeds(sources: Vec<Vec<FeedDraft>>, limit: Option<usize>) -> MergedFeed {
    let mut dropped = 0;
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for draft in sources.into_iter().flatten() {
        match normalize(draft) {
            Some(item) => {
                // duplicate links are not malformed entries, so they do not
                // count toward `dropped`
                if seen.insert(item.link.clone()) {
                    items.push(item);
                }
            }
            None => dropped += 1,
        }
    }

    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    if let Some(limit) = limit {
        items.truncate(limit);
    }

    MergedFeed { items, dropped }
}

/// Field renaming/coercion only; `None` when a required field is absent.
fn normalize(draft: FeedDraft) -> Option<FeedItem> {
    Some(FeedItem {
        title: draft.title?,
        link: draft.link?,
        source_name: draft.source_name,
        published_at: draft.published_at?,
        image_url: draft.image_url,
    })
}
