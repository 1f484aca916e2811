// SPDX-License-Identifier: Apache-2.0

//! Multi-source news aggregation.
//!
//! Pulls every configured syndication source, tolerates per-source failure,
//! normalizes entries into [`NewsItem`]s, and caches the merged, sorted
//! result under a [`TtlCache`]. Partial success is success: a source that
//! times out, returns a bad status, or fails to parse is logged and skipped,
//! and zero successful sources yields an empty list rather than an error.

use std::cmp::Reverse;
use std::sync::{Arc, LazyLock};
use std::time::Duration as StdDuration;

use chrono::Duration;
use regex::Regex;

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::config::NewsConfig;
use crate::error::XrayError;
use crate::news::image::{EntryMedia, Enclosure, PLACEHOLDER_IMAGE_URL, absolutize, pick_image};
use crate::news::types::{FeedSource, NewsItem};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag-strip regex"));

/// Freshness-bounded aggregator over a fixed set of syndication sources.
pub struct FeedAggregator {
    http: reqwest::Client,
    sources: Vec<FeedSource>,
    ttl: Duration,
    max_limit: usize,
    cache: TtlCache<Vec<NewsItem>>,
}

impl FeedAggregator {
    /// Create an aggregator from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &NewsConfig, clock: Arc<dyn Clock>) -> Result<Self, XrayError> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.fetch_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            sources: config.sources.clone(),
            ttl: Duration::hours(config.ttl_hours),
            max_limit: config.max_limit.max(1),
            cache: TtlCache::new(clock),
        })
    }

    /// Return up to `limit` newest items, refreshing the cache when stale.
    ///
    /// `limit` is clamped to `[1, max_limit]`. Slicing happens after caching,
    /// so the cache always holds the maximal retrieved set regardless of what
    /// any individual caller requested. An empty cached list counts as stale,
    /// so a total outage is retried on the next request instead of being
    /// served for a full TTL. This never fails: a completely failed refresh
    /// yields an empty or stale list.
    pub async fn get(&self, limit: usize, force_refresh: bool) -> Vec<NewsItem> {
        let limit = limit.clamp(1, self.max_limit);
        let cached_empty = self
            .cache
            .peek()
            .await
            .is_none_or(|entry| entry.value.is_empty());
        let items = self
            .cache
            .get_with(self.ttl, force_refresh || cached_empty, || self.refresh())
            .await;
        items.into_iter().take(limit).collect()
    }

    /// Fetch every source concurrently and merge the survivors.
    async fn refresh(&self) -> anyhow::Result<Vec<NewsItem>> {
        let fetches = self.sources.iter().map(|source| self.fetch_source(source));
        let outcomes = futures::future::join_all(fetches).await;

        let mut items = Vec::new();
        for (source, outcome) in self.sources.iter().zip(outcomes) {
            match outcome {
                Ok(mut batch) => items.append(&mut batch),
                Err(err) => {
                    tracing::warn!(source = %source.name, "feed source skipped: {err:#}");
                }
            }
        }

        // Stable sort: equal (or missing) timestamps keep source-iteration
        // order as the tiebreak.
        items.sort_by_key(|item| {
            Reverse(item.published_at.map_or(0, |ts| ts.timestamp_millis()))
        });
        Ok(items)
    }

    async fn fetch_source(&self, source: &FeedSource) -> anyhow::Result<Vec<NewsItem>> {
        let response = self
            .http
            .get(&source.endpoint)
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        let feed = feed_rs::parser::parse(body.as_ref()).map_err(|e| XrayError::Feed {
            name: source.name.clone(),
            message: e.to_string(),
        })?;

        Ok(feed
            .entries
            .iter()
            .map(|entry| normalize_entry(entry, source))
            .collect())
    }
}

/// Build a [`NewsItem`] from one raw feed entry.
///
/// Absence of any field is normal: the timestamp prefers `published` over
/// `updated`, the summary prefers the short summary text over the full
/// content body, and the image falls back to the placeholder.
fn normalize_entry(entry: &feed_rs::model::Entry, source: &FeedSource) -> NewsItem {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "(no title)".to_string());

    let link = entry.links.first().map(|l| l.href.clone());
    let published_at = entry.published.or(entry.updated);

    let summary = entry
        .summary
        .as_ref()
        .map(|t| strip_html(&t.content))
        .or_else(|| {
            entry
                .content
                .as_ref()
                .and_then(|c| c.body.as_deref())
                .map(strip_html)
        })
        .unwrap_or_default();

    let media = entry_media(entry);
    let base = link.clone().unwrap_or_else(|| source.endpoint.clone());
    let image_url = pick_image(&media)
        .and_then(|candidate| absolutize(&candidate, &base))
        .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string());

    NewsItem {
        title,
        link,
        source: source.name.clone(),
        published_at,
        summary,
        image_url,
    }
}

/// Flatten the media-bearing fields the image heuristic looks at.
fn entry_media(entry: &feed_rs::model::Entry) -> EntryMedia {
    let mut enclosures = Vec::new();
    let mut thumbnails = Vec::new();
    for media in &entry.media {
        for content in &media.content {
            if let Some(url) = &content.url {
                enclosures.push(Enclosure {
                    url: url.to_string(),
                    mime: content.content_type.as_ref().map(ToString::to_string),
                });
            }
        }
        for thumb in &media.thumbnails {
            thumbnails.push(thumb.image.uri.clone());
        }
    }

    // RSS puts rendered HTML in content:encoded or, failing that, in the
    // description, which the parser surfaces as the summary.
    let html = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .or_else(|| entry.summary.as_ref().map(|t| t.content.clone()))
        .unwrap_or_default();

    EntryMedia {
        enclosures,
        thumbnails,
        html,
    }
}

fn strip_html(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
