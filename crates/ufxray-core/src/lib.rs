// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # Ufxray Core
//!
//! Core library for the ufxray gateway - resilient aggregation and caching
//! of external security content.
//!
//! This crate provides reusable components for:
//! - TTL-based in-memory caching with stale-on-error fallback
//! - Security news aggregation from RSS/Atom feeds
//! - Image extraction heuristics and a redirect-following image proxy
//! - The CISA Known Exploited Vulnerabilities catalog
//! - A bounded in-memory findings ledger
//! - Invocation of external analyzer scripts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ufxray_core::{FeedAggregator, load_config, system_clock};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = load_config()?;
//! let clock = system_clock();
//!
//! // Aggregate the configured feeds, serving cached results within the TTL.
//! let aggregator = Arc::new(FeedAggregator::new(&config.news, Arc::clone(&clock))?);
//! let items = aggregator.get(12, false).await;
//! println!("{} stories", items.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`cache`] - TTL cache primitive
//! - [`clock`] - Injectable time source
//! - [`config`] - Configuration loading and paths
//! - [`error`] - Error types
//! - [`kev`] - Known Exploited Vulnerabilities catalog
//! - [`ledger`] - Bounded findings ledger
//! - [`news`] - Feed aggregation and image heuristics
//! - [`proxy`] - Image proxy with manual redirect handling
//! - [`scan`] - Analyzer invocation and verdict interpretation

// ============================================================================
// Error Handling
// ============================================================================

pub use error::XrayError;

/// Convenience Result type for ufxray operations.
///
/// This is equivalent to `std::result::Result<T, XrayError>`.
pub type Result<T> = std::result::Result<T, XrayError>;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    AppConfig, KevConfig, LedgerConfig, NewsConfig, ProxyConfig, ScanConfig, ServerConfig,
    config_dir, config_file_path, load_config,
};

// ============================================================================
// Time and Caching
// ============================================================================

pub use cache::{CacheEntry, TtlCache};
pub use clock::{Clock, SystemClock, system_clock};

// ============================================================================
// News Aggregation
// ============================================================================

pub use news::aggregator::FeedAggregator;
pub use news::image::PLACEHOLDER_IMAGE_URL;
pub use news::types::{FeedSource, NewsItem};

// ============================================================================
// Image Proxy
// ============================================================================

pub use proxy::{FALLBACK_SVG, ImageProxy, ProxyOutcome};

// ============================================================================
// Known Exploited Vulnerabilities
// ============================================================================

pub use kev::{KevCatalog, KevPage, KevVulnerability};

// ============================================================================
// Findings Ledger
// ============================================================================

pub use ledger::{BoundedLedger, FindingDraft, FindingRecord, LedgerSummary, Severity};

// ============================================================================
// Scan Collaborators
// ============================================================================

pub use scan::{ScanRunner, interpret_file_scan, interpret_log_scan, interpret_url_scan};

// ============================================================================
// Modules
// ============================================================================

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod kev;
pub mod ledger;
pub mod news;
pub mod proxy;
pub mod scan;
