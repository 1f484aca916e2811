// SPDX-License-Identifier: Apache-2.0

//! Security-news aggregation: sources, normalization, image heuristics.

pub mod aggregator;
pub mod image;
pub mod types;

pub use aggregator::FeedAggregator;
pub use image::{EntryMedia, Enclosure, PLACEHOLDER_IMAGE_URL, absolutize, pick_image};
pub use types::{FeedSource, NewsItem};
