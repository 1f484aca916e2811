// SPDX-License-Identifier: Apache-2.0

//! News data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured syndication source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    /// Display name, also stamped on every item drawn from this source.
    pub name: String,
    /// Feed URL.
    pub endpoint: String,
}

/// A normalized news item, the common shape across all sources.
///
/// `image_url` is always an absolute http(s) URL or the placeholder; it is
/// never relative and never a non-http scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    /// Headline, `"(no title)"` when the entry carries none.
    pub title: String,
    /// Link to the article, if the entry carries one.
    pub link: Option<String>,
    /// Name of the source the item was drawn from.
    pub source: String,
    /// Publish timestamp; items without one sort as oldest.
    pub published_at: Option<DateTime<Utc>>,
    /// Plain-text summary, empty when the entry carries none.
    pub summary: String,
    /// Resolved display image.
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_item_serializes_camel_case() {
        let item = NewsItem {
            title: "Breach".to_string(),
            link: Some("https://example.test/a".to_string()),
            source: "Example".to_string(),
            published_at: None,
            summary: String::new(),
            image_url: "https://example.test/a.png".to_string(),
        };

        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("publishedAt").is_some());
        assert!(json.get("imageUrl").is_some());
        assert!(json.get("published_at").is_none());
    }
}
