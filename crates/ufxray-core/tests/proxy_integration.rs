// SPDX-License-Identifier: Apache-2.0

//! Integration tests for `ImageProxy` redirect handling against an
//! in-process upstream.

use axum::Router;
use axum::extract::Path;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect};
use axum::routing::get;
use ufxray_core::{ImageProxy, ProxyConfig, ProxyOutcome};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfakepixels";

async fn png() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES)
}

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

fn proxy() -> ImageProxy {
    ImageProxy::new(&ProxyConfig {
        timeout_seconds: 5,
        max_redirects: 5,
    })
    .expect("proxy")
}

#[tokio::test]
async fn test_direct_image_is_relayed_with_body_intact() {
    let base = spawn_server(Router::new().route("/img.png", get(png))).await;

    match proxy().serve(&format!("{base}/img.png")).await {
        ProxyOutcome::Image {
            content_type,
            response,
        } => {
            assert_eq!(content_type, "image/png");
            let body = response.bytes().await.expect("body");
            assert_eq!(body.as_ref(), PNG_BYTES);
        }
        other => panic!("expected image, got {other:?}"),
    }
}

#[tokio::test]
async fn test_redirect_chain_within_budget_is_followed() {
    // Relative Location headers must resolve against the current hop.
    let router = Router::new()
        .route("/a", get(|| async { Redirect::temporary("/b") }))
        .route("/b", get(|| async { Redirect::temporary("/img.png") }))
        .route("/img.png", get(png));
    let base = spawn_server(router).await;

    let outcome = proxy().serve(&format!("{base}/a")).await;
    assert!(matches!(outcome, ProxyOutcome::Image { .. }));
}

#[tokio::test]
async fn test_redirect_loop_is_detected() {
    let router = Router::new()
        .route("/a", get(|| async { Redirect::temporary("/b") }))
        .route("/b", get(|| async { Redirect::temporary("/a") }));
    let base = spawn_server(router).await;

    let outcome = proxy().serve(&format!("{base}/a")).await;
    assert!(matches!(outcome, ProxyOutcome::RedirectLoop));
}

#[tokio::test]
async fn test_redirect_budget_exhaustion_falls_back() {
    // Six distinct hops against a budget of five.
    let router = Router::new()
        .route(
            "/hop/{n}",
            get(|Path(n): Path<usize>| async move {
                Redirect::temporary(&format!("/hop/{}", n + 1)).into_response()
            }),
        )
        .route("/img.png", get(png));
    let base = spawn_server(router).await;

    let outcome = proxy().serve(&format!("{base}/hop/0")).await;
    assert!(matches!(outcome, ProxyOutcome::Fallback));
}

#[tokio::test]
async fn test_non_image_content_type_falls_back() {
    let router = Router::new().route(
        "/page",
        get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<html></html>") }),
    );
    let base = spawn_server(router).await;

    let outcome = proxy().serve(&format!("{base}/page")).await;
    assert!(matches!(outcome, ProxyOutcome::Fallback));
}

#[tokio::test]
async fn test_upstream_error_status_falls_back() {
    let router = Router::new().route("/missing", get(|| async { StatusCode::NOT_FOUND }));
    let base = spawn_server(router).await;

    let outcome = proxy().serve(&format!("{base}/missing")).await;
    assert!(matches!(outcome, ProxyOutcome::Fallback));
}

#[tokio::test]
async fn test_unparseable_and_non_http_urls_fall_back() {
    let proxy = proxy();
    assert!(matches!(proxy.serve("not a url").await, ProxyOutcome::Fallback));
    assert!(matches!(
        proxy.serve("ftp://example.test/a.png").await,
        ProxyOutcome::Fallback
    ));
    assert!(matches!(proxy.serve("").await, ProxyOutcome::Fallback));
}
