// SPDX-License-Identifier: Apache-2.0

//! Integration tests for `FeedAggregator` against in-process feed servers.
//!
//! Each test spins up a local axum server on an ephemeral port to play the
//! role of one or more syndication endpoints, then drives the aggregator
//! against it over real HTTP.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::Router;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use ufxray_core::{FeedAggregator, FeedSource, NewsConfig, PLACEHOLDER_IMAGE_URL, system_clock};

const JANUARY_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Alpha</title>
<item>
  <title>January advisory</title>
  <link>https://alpha.test/jan</link>
  <pubDate>Mon, 15 Jan 2024 08:00:00 GMT</pubDate>
  <description>Old news</description>
</item>
</channel></rss>"#;

const JUNE_FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Beta</title>
<item>
  <title>June breach</title>
  <link>https://beta.test/jun</link>
  <pubDate>Sat, 01 Jun 2024 12:00:00 GMT</pubDate>
  <description>Fresh news</description>
</item>
<item>
  <title>Undated note</title>
  <link>https://beta.test/undated</link>
  <description>No timestamp</description>
</item>
</channel></rss>"#;

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

fn rss(body: &'static str) -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "application/rss+xml")], body)
}

fn config_for(sources: Vec<FeedSource>) -> NewsConfig {
    NewsConfig {
        sources,
        ..NewsConfig::default()
    }
}

fn source(name: &str, endpoint: String) -> FeedSource {
    FeedSource {
        name: name.to_string(),
        endpoint,
    }
}

#[tokio::test]
async fn test_failed_sources_are_skipped_not_fatal() {
    let router = Router::new()
        .route("/alpha.xml", get(|| async { rss(JANUARY_FEED) }))
        .route("/beta.xml", get(|| async { rss(JUNE_FEED) }))
        .route(
            "/broken.xml",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        )
        .route("/garbage.xml", get(|| async { rss("this is not xml at all") }));
    let base = spawn_server(router).await;

    // Two of four sources fail; the union of the survivors still comes back.
    let config = config_for(vec![
        source("Alpha", format!("{base}/alpha.xml")),
        source("Beta", format!("{base}/beta.xml")),
        source("Broken", format!("{base}/broken.xml")),
        source("Garbage", format!("{base}/garbage.xml")),
    ]);
    let aggregator = FeedAggregator::new(&config, system_clock()).expect("aggregator");

    let items = aggregator.get(50, false).await;
    assert_eq!(items.len(), 3);
    assert!(items.iter().any(|item| item.source == "Alpha"));
    assert!(items.iter().any(|item| item.source == "Beta"));
}

#[tokio::test]
async fn test_all_sources_failing_yields_empty_list() {
    let router = Router::new().route("/feed.xml", get(|| async { StatusCode::BAD_GATEWAY }));
    let base = spawn_server(router).await;

    let config = config_for(vec![source("Down", format!("{base}/feed.xml"))]);
    let aggregator = FeedAggregator::new(&config, system_clock()).expect("aggregator");

    assert!(aggregator.get(12, false).await.is_empty());
}

#[tokio::test]
async fn test_empty_cache_retries_once_sources_recover() {
    let healthy = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&healthy);
    let router = Router::new().route(
        "/feed.xml",
        get(move || {
            let flag = Arc::clone(&flag);
            async move {
                if flag.load(Ordering::SeqCst) {
                    rss(JUNE_FEED).into_response()
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }),
    );
    let base = spawn_server(router).await;

    let config = config_for(vec![source("Flaky", format!("{base}/feed.xml"))]);
    let aggregator = FeedAggregator::new(&config, system_clock()).expect("aggregator");

    // Total outage yields an empty list, which must not stick for the TTL.
    assert!(aggregator.get(12, false).await.is_empty());

    healthy.store(true, Ordering::SeqCst);
    let items = aggregator.get(12, false).await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "June breach");
}

#[tokio::test]
async fn test_merged_items_sort_newest_first_undated_last() {
    let router = Router::new()
        .route("/alpha.xml", get(|| async { rss(JANUARY_FEED) }))
        .route("/beta.xml", get(|| async { rss(JUNE_FEED) }));
    let base = spawn_server(router).await;

    let config = config_for(vec![
        source("Alpha", format!("{base}/alpha.xml")),
        source("Beta", format!("{base}/beta.xml")),
    ]);
    let aggregator = FeedAggregator::new(&config, system_clock()).expect("aggregator");

    let items = aggregator.get(50, false).await;
    let titles: Vec<&str> = items.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["June breach", "January advisory", "Undated note"]
    );
    // Limiting happens after the merge, so the single newest item wins.
    let top = aggregator.get(1, false).await;
    assert_eq!(top[0].title, "June breach");
    assert_eq!(top[0].image_url, PLACEHOLDER_IMAGE_URL);
}

#[tokio::test]
async fn test_cache_serves_repeat_calls_without_refetching() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let router = Router::new().route(
        "/feed.xml",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                rss(JUNE_FEED)
            }
        }),
    );
    let base = spawn_server(router).await;

    let config = config_for(vec![source("Counted", format!("{base}/feed.xml"))]);
    let aggregator = FeedAggregator::new(&config, system_clock()).expect("aggregator");

    aggregator.get(12, false).await;
    aggregator.get(12, false).await;
    aggregator.get(5, false).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // An explicit refresh bypasses the still-fresh entry.
    aggregator.get(12, true).await;
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
