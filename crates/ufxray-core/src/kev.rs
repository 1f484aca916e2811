// SPDX-License-Identifier: Apache-2.0

//! Known-exploited-vulnerabilities catalog.
//!
//! Fetches the CISA KEV JSON document, normalizes its records, and caches
//! the result under a [`TtlCache`] with the same refresh-on-expiry pattern
//! as the news aggregator. Upstream shape drift degrades to empty records,
//! and a failed refresh serves the stale catalog.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use reqwest::header;
use serde::{Deserialize, Serialize};

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::config::KevConfig;
use crate::error::XrayError;

/// A normalized known-exploited-vulnerability record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KevVulnerability {
    /// Best-available identifier (CVE id, vendor id, or upstream id).
    pub id: Option<String>,
    /// CVE identifier, when present.
    pub cve: Option<String>,
    /// Affected vendor or project.
    pub vendor: String,
    /// Affected product.
    pub product: String,
    /// Vulnerability name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Date the entry was added to the catalog, as published upstream.
    pub date_added: Option<String>,
    /// Remediation due date, as published upstream.
    pub due_date: Option<String>,
    /// Required remediation action.
    pub required_action: String,
    /// Upstream notes.
    pub notes: String,
    /// Reference URLs.
    pub references: Vec<String>,
    /// Always `HIGH`: presence in the catalog means active exploitation.
    pub severity: String,
    /// Catalog name.
    pub source: String,
}

impl KevVulnerability {
    /// Case-insensitive substring match over the searchable fields.
    /// `query_lower` must already be lowercased.
    fn matches(&self, query_lower: &str) -> bool {
        [
            self.id.as_deref().unwrap_or_default(),
            self.cve.as_deref().unwrap_or_default(),
            self.vendor.as_str(),
            self.product.as_str(),
            self.name.as_str(),
            self.description.as_str(),
        ]
        .join(" ")
        .to_lowercase()
        .contains(query_lower)
    }
}

/// One page of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KevPage {
    /// Filtered records, newest layout preserved from upstream order.
    pub items: Vec<KevVulnerability>,
    /// Filtered total before the limit slice.
    pub total: usize,
    /// Last successful refresh, or the request time if none succeeded yet.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct KevDocument {
    #[serde(default)]
    vulnerabilities: Vec<serde_json::Value>,
}

/// Upstream record shape; every field defaults so drift never faults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawKevRecord {
    #[serde(rename = "cveID")]
    cve_id: Option<String>,
    #[serde(rename = "vulnID")]
    vuln_id: Option<String>,
    id: Option<String>,
    vendor_project: String,
    product: String,
    vulnerability_name: String,
    short_description: String,
    date_added: Option<String>,
    due_date: Option<String>,
    required_action: String,
    notes: String,
    references: Vec<String>,
}

/// TTL-cached view over the upstream KEV feed.
pub struct KevCatalog {
    http: reqwest::Client,
    feed_url: String,
    ttl: Duration,
    max_limit: usize,
    cache: TtlCache<Vec<KevVulnerability>>,
    clock: Arc<dyn Clock>,
}

impl KevCatalog {
    /// Create a catalog from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &KevConfig, clock: Arc<dyn Clock>) -> Result<Self, XrayError> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.fetch_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            feed_url: config.feed_url.clone(),
            ttl: Duration::hours(config.ttl_hours),
            max_limit: config.max_limit.max(1),
            cache: TtlCache::new(clock.clone()),
            clock,
        })
    }

    /// Return a filtered page of the catalog, refreshing when stale.
    ///
    /// A refresh is forced when the cached catalog is empty, so a failed
    /// first fetch is retried on the next request rather than cached for a
    /// full TTL. `query` is a case-insensitive substring filter over id,
    /// CVE, vendor, product, name, and description. `limit` clamps to
    /// `[1, max_limit]`. Never fails: upstream trouble yields the stale or
    /// empty catalog.
    pub async fn get(&self, limit: usize, query: &str, force_refresh: bool) -> KevPage {
        let limit = limit.clamp(1, self.max_limit);
        let cached_empty = self
            .cache
            .peek()
            .await
            .is_none_or(|entry| entry.value.is_empty());

        let items = self
            .cache
            .get_with(self.ttl, force_refresh || cached_empty, || {
                self.fetch_catalog()
            })
            .await;

        let query = query.trim().to_lowercase();
        let filtered: Vec<KevVulnerability> = if query.is_empty() {
            items
        } else {
            items.into_iter().filter(|v| v.matches(&query)).collect()
        };

        let total = filtered.len();
        let updated_at = self
            .cache
            .fetched_at()
            .await
            .unwrap_or_else(|| self.clock.now());

        KevPage {
            items: filtered.into_iter().take(limit).collect(),
            total,
            updated_at,
        }
    }

    async fn fetch_catalog(&self) -> anyhow::Result<Vec<KevVulnerability>> {
        let response = self
            .http
            .get(&self.feed_url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;
        let document: KevDocument = response.json().await.map_err(|e| XrayError::Kev {
            message: e.to_string(),
        })?;

        Ok(document
            .vulnerabilities
            .into_iter()
            .map(normalize_record)
            .collect())
    }
}

/// Normalize one upstream record; malformed records become empty ones
/// rather than failing the whole document.
fn normalize_record(value: serde_json::Value) -> KevVulnerability {
    let raw: RawKevRecord = serde_json::from_value(value).unwrap_or_default();
    KevVulnerability {
        id: raw.cve_id.clone().or(raw.vuln_id).or(raw.id),
        cve: raw.cve_id,
        vendor: raw.vendor_project,
        product: raw.product,
        name: raw.vulnerability_name,
        description: raw.short_description,
        date_added: raw.date_added,
        due_date: raw.due_date,
        required_action: raw.required_action,
        notes: raw.notes,
        references: raw.references,
        severity: "HIGH".to_string(),
        source: "CISA KEV".to_string(),
    }
}
