// SPDX-License-Identifier: Apache-2.0

//! Scan collaborator integration.
//!
//! The analyzers themselves are external scripts (opaque collaborators that
//! accept a path or URL and emit one JSON verdict). This module only invokes
//! them ([`runner`]) and reads the agreed verdict fields to decide whether a
//! finding belongs in the ledger. Interpretation is total: absent or
//! odd-shaped fields never fault, they just mean "nothing to record".

pub mod runner;

pub use runner::ScanRunner;

use serde_json::{Value, json};

use crate::ledger::FindingDraft;

fn threat_level(verdict: &Value) -> String {
    verdict
        .get("threat_level")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase()
}

/// Decide whether a URL-scan verdict warrants a ledger record.
///
/// Any threat level other than `SAFE` (or absent) is recorded, carrying the
/// risk score, liveness check, and the first five resolved IPs as details.
#[must_use]
pub fn interpret_url_scan(verdict: &Value) -> Option<FindingDraft> {
    let level = threat_level(verdict);
    if level.is_empty() || level == "SAFE" {
        return None;
    }

    let url = verdict.get("url").and_then(Value::as_str);
    let resolved_ips: Vec<Value> = verdict
        .get("resolved_ips")
        .and_then(Value::as_array)
        .map(|ips| ips.iter().take(5).cloned().collect())
        .unwrap_or_default();

    Some(FindingDraft {
        title: format!("URL scan: {} ({level})", url.unwrap_or("unknown")),
        kind: "url".to_string(),
        severity: level,
        source: "scan-url".to_string(),
        reference: url.map(str::to_string),
        details: Some(json!({
            "risk_score": verdict.get("risk_score").cloned().unwrap_or(Value::Null),
            "liveness": verdict.get("liveness_check").cloned().unwrap_or(Value::Null),
            "resolved_ips": resolved_ips,
        })),
    })
}

/// Decide whether a file-scan verdict warrants a ledger record.
///
/// Flags on an explicit `malicious` verdict, a HIGH/MEDIUM threat level, any
/// YARA match, or a ClamAV `infected` status.
#[must_use]
pub fn interpret_file_scan(verdict: &Value) -> Option<FindingDraft> {
    let level = threat_level(verdict);
    let malicious = verdict
        .get("malicious")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let yara_count = verdict
        .pointer("/indicators/yara_match_count")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let clam_status = verdict
        .pointer("/clamav/status")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let flagged = malicious
        || level == "HIGH"
        || level == "MEDIUM"
        || yara_count > 0
        || clam_status == "infected";
    if !flagged {
        return None;
    }

    let label = if !level.is_empty() {
        level.clone()
    } else if clam_status == "infected" {
        "INFECTED".to_string()
    } else {
        "SUSPECT".to_string()
    };
    let severity = if !level.is_empty() {
        level
    } else if clam_status == "infected" {
        "HIGH".to_string()
    } else {
        "LOW".to_string()
    };
    let filename = verdict
        .get("filename")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let reference = verdict
        .pointer("/hashes/sha256")
        .or_else(|| verdict.get("sha256"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(FindingDraft {
        title: format!("File scan: {filename} ({label})"),
        kind: "file".to_string(),
        severity,
        source: "scan-file".to_string(),
        reference,
        details: Some(json!({
            "risk_score": verdict.get("risk_score").cloned().unwrap_or(Value::Null),
            "yara_matches": verdict.pointer("/yara/matches").cloned().unwrap_or_else(|| json!([])),
            "clamav": verdict.get("clamav").cloned().unwrap_or_else(|| json!({})),
        })),
    })
}

/// Decide whether a log-scan verdict warrants a ledger record.
///
/// Flags on a non-SAFE threat level or at least one suspicious-pattern hit.
#[must_use]
pub fn interpret_log_scan(verdict: &Value) -> Option<FindingDraft> {
    let level = threat_level(verdict);
    let suspicious_hits = verdict
        .pointer("/detections/suspicious_patterns")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    let flagged = (!level.is_empty() && level != "SAFE") || suspicious_hits > 0;
    if !flagged {
        return None;
    }

    let label = if level.is_empty() {
        "ANALYZED".to_string()
    } else {
        level.clone()
    };
    let severity = if level.is_empty() {
        "LOW".to_string()
    } else {
        level
    };

    Some(FindingDraft {
        title: format!("Log scan: {label} ({suspicious_hits} suspicious hits)"),
        kind: "log".to_string(),
        severity,
        source: "scan-log".to_string(),
        reference: None,
        details: Some(json!({
            "risk_score": verdict.get("risk_score").cloned().unwrap_or(Value::Null),
            "suspicious_count": suspicious_hits,
        })),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_scan_safe_is_ignored() {
        let verdict = json!({"url": "https://example.test", "threat_level": "SAFE"});
        assert!(interpret_url_scan(&verdict).is_none());
    }

    #[test]
    fn test_url_scan_missing_threat_level_is_ignored() {
        let verdict = json!({"url": "https://example.test"});
        assert!(interpret_url_scan(&verdict).is_none());
    }

    #[test]
    fn test_url_scan_high_is_recorded() {
        let verdict = json!({
            "url": "https://evil.test",
            "threat_level": "high",
            "risk_score": 87,
            "resolved_ips": ["1.1.1.1", "2.2.2.2", "3.3.3.3", "4.4.4.4", "5.5.5.5", "6.6.6.6"],
        });

        let draft = interpret_url_scan(&verdict).expect("finding");
        assert_eq!(draft.title, "URL scan: https://evil.test (HIGH)");
        assert_eq!(draft.kind, "url");
        assert_eq!(draft.severity, "HIGH");
        assert_eq!(draft.reference.as_deref(), Some("https://evil.test"));
        let details = draft.details.expect("details");
        assert_eq!(details["risk_score"], 87);
        // Only the first five resolved IPs are retained.
        assert_eq!(details["resolved_ips"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_file_scan_clean_is_ignored() {
        let verdict = json!({
            "filename": "report.pdf",
            "threat_level": "SAFE",
            "malicious": false,
            "indicators": {"yara_match_count": 0},
            "clamav": {"status": "clean"},
        });
        assert!(interpret_file_scan(&verdict).is_none());
    }

    #[test]
    fn test_file_scan_yara_match_is_recorded() {
        let verdict = json!({
            "filename": "dropper.exe",
            "threat_level": "SAFE",
            "indicators": {"yara_match_count": 2},
            "yara": {"matches": ["SusPacker", "Keylogger"]},
        });

        let draft = interpret_file_scan(&verdict).expect("finding");
        assert_eq!(draft.kind, "file");
        assert_eq!(draft.severity, "SAFE");
        assert_eq!(draft.title, "File scan: dropper.exe (SAFE)");
    }

    #[test]
    fn test_file_scan_infected_without_threat_level() {
        let verdict = json!({
            "filename": "worm.bin",
            "clamav": {"status": "infected"},
            "hashes": {"sha256": "deadbeef"},
        });

        let draft = interpret_file_scan(&verdict).expect("finding");
        assert_eq!(draft.title, "File scan: worm.bin (INFECTED)");
        assert_eq!(draft.severity, "HIGH");
        assert_eq!(draft.reference.as_deref(), Some("deadbeef"));
    }

    #[test]
    fn test_file_scan_empty_verdict_is_ignored() {
        assert!(interpret_file_scan(&json!({})).is_none());
    }

    #[test]
    fn test_log_scan_suspicious_hits_without_threat_level() {
        let verdict = json!({
            "detections": {"suspicious_patterns": ["ssh brute force", "sql injection"]},
            "risk_score": 40,
        });

        let draft = interpret_log_scan(&verdict).expect("finding");
        assert_eq!(draft.title, "Log scan: ANALYZED (2 suspicious hits)");
        assert_eq!(draft.severity, "LOW");
        assert_eq!(draft.kind, "log");
        assert_eq!(draft.details.unwrap()["suspicious_count"], 2);
    }

    #[test]
    fn test_log_scan_safe_without_hits_is_ignored() {
        let verdict = json!({"threat_level": "SAFE", "detections": {"suspicious_patterns": []}});
        assert!(interpret_log_scan(&verdict).is_none());
    }
}
