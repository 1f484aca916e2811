// SPDX-License-Identifier: Apache-2.0

//! Bounded in-memory findings ledger.
//!
//! Records "interesting findings" surfaced by the scan collaborators,
//! newest-first, with a hard capacity. Eviction from the tail is the only
//! removal path; no record is ever mutated after insertion, and a process
//! restart clears the ledger by design.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a finding, normalized to a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Critical finding requiring immediate attention.
    Critical,
    /// High severity finding.
    High,
    /// Medium severity finding.
    Medium,
    /// Low severity or informational finding.
    #[default]
    Low,
}

impl Severity {
    /// Parse a severity label leniently; unrecognized or empty input is
    /// `Low`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Severity::Critical,
            "HIGH" => Severity::High,
            "MEDIUM" => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// Uppercase wire label for this severity.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

/// Caller-supplied fields of a finding, before the ledger assigns identity.
#[derive(Debug, Clone, Default)]
pub struct FindingDraft {
    /// Human-readable title.
    pub title: String,
    /// Finding kind (`url`, `file`, `log`, ...).
    pub kind: String,
    /// Raw severity label, normalized leniently on append.
    pub severity: String,
    /// Which scan surfaced the finding.
    pub source: String,
    /// Stable reference (scanned URL, file hash, ...), if any.
    pub reference: Option<String>,
    /// Opaque structured payload from the collaborator, if any.
    pub details: Option<serde_json::Value>,
}

/// A recorded finding. Created only by [`BoundedLedger::append`]; never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingRecord {
    /// Time-based id with a random suffix, collision-resistant in practice.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Finding kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Normalized severity.
    pub severity: Severity,
    /// Which scan surfaced the finding.
    pub source: String,
    /// Stable reference, if any.
    pub reference: Option<String>,
    /// Opaque structured payload, if any.
    pub details: Option<serde_json::Value>,
    /// When the finding was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Aggregate view over the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    /// Total recorded findings still retained.
    pub total_found: usize,
    /// Count per severity label.
    pub by_severity: BTreeMap<String, usize>,
    /// Timestamp of the newest record, if any.
    pub latest: Option<DateTime<Utc>>,
}

/// Fixed-capacity, insertion-ordered (newest-first) findings store.
pub struct BoundedLedger {
    capacity: usize,
    records: Mutex<VecDeque<FindingRecord>>,
}

impl BoundedLedger {
    /// Create an empty ledger. A zero capacity is bumped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Hard capacity of this ledger.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a finding: assign identity, normalize severity, insert at the
    /// front, evict from the tail past capacity. Returns the stored record.
    pub fn append(&self, draft: FindingDraft) -> FindingRecord {
        let now = Utc::now();
        let record = FindingRecord {
            id: new_finding_id(now),
            title: if draft.title.is_empty() {
                "Detected vulnerability/finding".to_string()
            } else {
                draft.title
            },
            kind: if draft.kind.is_empty() {
                "finding".to_string()
            } else {
                draft.kind
            },
            severity: Severity::parse_lenient(&draft.severity),
            source: if draft.source.is_empty() {
                "unknown".to_string()
            } else {
                draft.source
            },
            reference: draft.reference,
            details: draft.details,
            timestamp: now,
        };

        let mut records = self.records.lock().expect("ledger lock poisoned");
        records.push_front(record.clone());
        records.truncate(self.capacity);
        record
    }

    /// Newest-first slice of at most `limit` records, clamped to
    /// `[1, capacity]`.
    #[must_use]
    pub fn list(&self, limit: usize) -> Vec<FindingRecord> {
        let limit = limit.clamp(1, self.capacity);
        let records = self.records.lock().expect("ledger lock poisoned");
        records.iter().take(limit).cloned().collect()
    }

    /// Total count, severity tally, and newest timestamp.
    #[must_use]
    pub fn summarize(&self) -> LedgerSummary {
        let records = self.records.lock().expect("ledger lock poisoned");
        let mut by_severity = BTreeMap::new();
        for record in records.iter() {
            *by_severity
                .entry(record.severity.as_str().to_string())
                .or_insert(0) += 1;
        }
        LedgerSummary {
            total_found: records.len(),
            by_severity,
            latest: records.front().map(|r| r.timestamp),
        }
    }
}

/// `{epoch_millis}_{6 random alphanumerics}`.
fn new_finding_id(now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let suffix: String = (0..6)
        .map(|_| ALPHABET[fastrand::usize(..ALPHABET.len())] as char)
        .collect();
    format!("{}_{suffix}", now.timestamp_millis())
}
