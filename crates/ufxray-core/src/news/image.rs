// SPDX-License-Identifier: Apache-2.0

//! Representative-image extraction for feed entries.
//!
//! Feed formats vary wildly in how they embed media, so the picker is a
//! prioritized strategy chain ordered from most-structured to least:
//! declared enclosures first, then media thumbnails, then increasingly
//! desperate pattern matches over the rendered HTML. Every strategy is a
//! total function returning `Option`; the first hit wins and nothing in the
//! chain can panic or propagate an error.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Served when no strategy produces a usable candidate.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://source.unsplash.com/featured/800x450?cyber,security,hacking,news";

/// A declared media attachment on a feed entry.
#[derive(Debug, Clone, Default)]
pub struct Enclosure {
    /// Attachment URL.
    pub url: String,
    /// Declared MIME type, when the feed carries one.
    pub mime: Option<String>,
}

/// Media-bearing fields of one raw feed entry, already flattened out of the
/// parser's model.
#[derive(Debug, Clone, Default)]
pub struct EntryMedia {
    /// Enclosures and `media:content` attachments, in feed order.
    pub enclosures: Vec<Enclosure>,
    /// `media:thumbnail` URLs, in feed order.
    pub thumbnails: Vec<String>,
    /// Rendered HTML content of the entry.
    pub html: String,
}

static IMAGE_EXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(png|jpe?g|gif|webp|svg)(\?|$)").expect("valid image extension regex")
});

static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"'>]+)["']"#).expect("valid img src regex")
});

static IMG_LAZY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]+data-(?:src|lazy-src|original)=["']([^"'>]+)["']"#)
        .expect("valid lazy attribute regex")
});

static SRCSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<(?:img|source)[^>]+srcset=["']([^"'>]+)["']"#).expect("valid srcset regex")
});

fn has_image_extension(url: &str) -> bool {
    IMAGE_EXT_RE.is_match(url)
}

/// Strategy 1: an enclosure declaring an image MIME type or carrying a
/// recognized image extension.
fn from_enclosures(media: &EntryMedia) -> Option<String> {
    media.enclosures.iter().find_map(|enc| {
        if enc.url.is_empty() {
            return None;
        }
        let declared_image = enc
            .mime
            .as_deref()
            .is_some_and(|m| m.to_ascii_lowercase().starts_with("image"));
        (declared_image || has_image_extension(&enc.url)).then(|| enc.url.clone())
    })
}

/// Strategy 2: a media thumbnail with a recognized image extension.
fn from_thumbnails(media: &EntryMedia) -> Option<String> {
    media
        .thumbnails
        .iter()
        .find(|u| has_image_extension(u))
        .cloned()
}

/// Strategy 3: a plain `<img src>` in the rendered HTML.
fn from_img_src(media: &EntryMedia) -> Option<String> {
    IMG_SRC_RE
        .captures(&media.html)
        .map(|c| c[1].to_string())
        .filter(|u| !u.is_empty())
}

/// Strategy 4: a lazy-loading attribute on an `<img>` tag.
fn from_lazy_attr(media: &EntryMedia) -> Option<String> {
    IMG_LAZY_RE
        .captures(&media.html)
        .map(|c| c[1].to_string())
        .filter(|u| !u.is_empty())
}

/// Strategy 5: the first URL token of a `srcset` on `<img>` or `<source>`.
fn from_srcset(media: &EntryMedia) -> Option<String> {
    let raw = SRCSET_RE.captures(&media.html).map(|c| c[1].to_string())?;
    let first = raw
        .split(',')
        .next()?
        .trim()
        .split_whitespace()
        .next()?
        .to_string();
    (!first.is_empty()).then_some(first)
}

/// Pick a best-effort image candidate for one entry.
///
/// Tries the strategies in priority order; `None` means the caller should
/// fall back to [`PLACEHOLDER_IMAGE_URL`].
#[must_use]
pub fn pick_image(media: &EntryMedia) -> Option<String> {
    from_enclosures(media)
        .or_else(|| from_thumbnails(media))
        .or_else(|| from_img_src(media))
        .or_else(|| from_lazy_attr(media))
        .or_else(|| from_srcset(media))
}

/// Resolve a candidate into an absolute http(s) URL.
///
/// Protocol-relative candidates (`//host/path`) are treated as `https:`.
/// Relative candidates resolve against `base`. Candidates with any other
/// scheme (`javascript:`, `data:` ...) are discarded so the caller falls
/// through to the placeholder.
#[must_use]
pub fn absolutize(candidate: &str, base: &str) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    let prefixed;
    let candidate = if candidate.starts_with("//") {
        prefixed = format!("https:{candidate}");
        prefixed.as_str()
    } else {
        candidate
    };

    let resolved = match Url::parse(candidate) {
        Ok(u) => u,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(candidate).ok()?,
        Err(_) => return None,
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
