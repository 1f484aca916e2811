// SPDX-License-Identifier: Apache-2.0

//! Same-origin image proxy.
//!
//! Relays a caller-supplied absolute image URL through the service so the UI
//! never issues cross-origin or mixed-content requests and never trusts an
//! unvalidated upstream. Redirects are followed manually so every hop is
//! scheme-validated and loop-checked; anything that goes wrong resolves to a
//! deterministic fallback graphic, never an error surfaced to an `<img>` tag.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::header;
use url::Url;

use crate::config::ProxyConfig;
use crate::error::XrayError;

/// Sent upstream so image CDNs treat the proxy like a browser; many reject
/// bare server-side requests.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124 Safari/537.36";

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// Static vector fallback, served in every error branch.
pub const FALLBACK_SVG: &str = concat!(
    "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 800 450'>",
    "<rect width='800' height='450' fill='rgb(15,23,42)'/>",
    "<rect x='340' y='170' rx='12' ry='12' width='120' height='100' ",
    "fill='rgba(96,165,250,0.15)' stroke='rgb(96,165,250)' stroke-width='8'/>",
    "<path d='M360 170 v-20 a40 40 0 0 1 80 0 v20' fill='none' ",
    "stroke='rgb(147,197,253)' stroke-width='8'/>",
    "<text x='400' y='320' font-size='28' fill='rgb(203,213,225)' ",
    "text-anchor='middle' font-family='Segoe UI,Roboto,Arial,sans-serif'>",
    "Cyber Security</text>",
    "</svg>"
);

/// Result of one proxy round trip.
#[derive(Debug)]
pub enum ProxyOutcome {
    /// Upstream produced a valid image; the response body is still
    /// unconsumed and can be streamed to the caller.
    Image {
        /// Upstream `Content-Type`, guaranteed to start with `image/`.
        content_type: String,
        /// The open upstream response.
        response: reqwest::Response,
    },
    /// Anything failed; serve [`FALLBACK_SVG`].
    Fallback,
    /// The redirect chain revisited a URL; surfaced as HTTP 508.
    RedirectLoop,
}

/// Relay for remote image URLs with bounded, validated redirect following.
pub struct ImageProxy {
    http: reqwest::Client,
    max_redirects: usize,
}

impl ImageProxy {
    /// Create a proxy from configuration.
    ///
    /// Redirect following is disabled on the client; every hop is handled
    /// manually in [`Self::serve`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ProxyConfig) -> Result<Self, XrayError> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            max_redirects: config.max_redirects,
        })
    }

    /// Fetch `raw_url`, following up to `max_redirects` validated hops.
    ///
    /// Never returns an error: invalid input, network failures, non-2xx
    /// statuses, and non-image bodies all map to [`ProxyOutcome::Fallback`];
    /// a revisited URL maps to [`ProxyOutcome::RedirectLoop`].
    pub async fn serve(&self, raw_url: &str) -> ProxyOutcome {
        let Some(mut current) = parse_http_url(raw_url) else {
            return ProxyOutcome::Fallback;
        };

        let mut visited = HashSet::new();
        visited.insert(current.to_string());

        // One initial request plus max_redirects follow-ups.
        for _hop in 0..=self.max_redirects {
            let request = self
                .http
                .get(current.clone())
                .header(header::USER_AGENT, BROWSER_USER_AGENT)
                .header(header::ACCEPT, IMAGE_ACCEPT)
                .header(header::REFERER, current.origin().ascii_serialization());

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!(url = %current, "image fetch failed: {err}");
                    return ProxyOutcome::Fallback;
                }
            };

            let status = response.status();
            if status.is_redirection() {
                let Some(next) = redirect_target(&response, &current) else {
                    return ProxyOutcome::Fallback;
                };
                if !visited.insert(next.to_string()) {
                    tracing::debug!(url = %next, "redirect loop detected");
                    return ProxyOutcome::RedirectLoop;
                }
                // Hop body is dropped without buffering.
                current = next;
                continue;
            }

            if status.is_client_error() || status.is_server_error() {
                return ProxyOutcome::Fallback;
            }

            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if !content_type.to_ascii_lowercase().starts_with("image/") {
                // Dropping the response discards the body unbuffered.
                return ProxyOutcome::Fallback;
            }

            return ProxyOutcome::Image {
                content_type,
                response,
            };
        }

        // Redirect budget exhausted.
        ProxyOutcome::Fallback
    }
}

/// Parse an absolute http(s) URL; anything else is rejected before any
/// connection is attempted.
fn parse_http_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Resolve the `Location` header of a 3xx response against the current URL,
/// applying the same http(s)-only validation as the entry point.
fn redirect_target(response: &reqwest::Response, current: &Url) -> Option<Url> {
    let location = response
        .headers()
        .get(header::LOCATION)?
        .to_str()
        .ok()?;
    let next = current.join(location).ok()?;
    matches!(next.scheme(), "http" | "https").then_some(next)
}
