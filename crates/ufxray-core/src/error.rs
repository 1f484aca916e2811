// SPDX-License-Identifier: Apache-2.0

//! Error types for the ufxray core.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! Aggregation paths deliberately swallow most of these (logging them and
//! degrading to stale or empty data); only the gateway surfaces them.

use thiserror::Error;

/// Errors that can occur in the ufxray core.
#[derive(Error, Debug)]
pub enum XrayError {
    /// A single syndication source failed to fetch or parse.
    #[error("feed source '{name}' failed: {message}")]
    Feed {
        /// Configured source name.
        name: String,
        /// Error message.
        message: String,
    },

    /// The KEV feed returned an unusable response.
    #[error("KEV fetch failed: {message}")]
    Kev {
        /// Error message.
        message: String,
    },

    /// Caller-supplied URL is not an absolute http(s) URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
    },

    /// A scan collaborator failed, exited non-zero, or emitted bad JSON.
    #[error("scan collaborator failed: {message}")]
    Scan {
        /// Error message.
        message: String,
    },

    /// A scan collaborator exceeded its time budget.
    #[error("scan collaborator timed out after {seconds}s")]
    ScanTimeout {
        /// Configured budget in seconds.
        seconds: u64,
    },

    /// Configuration file error.
    #[error("configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Network/HTTP error from reqwest.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<config::ConfigError> for XrayError {
    fn from(err: config::ConfigError) -> Self {
        XrayError::Config {
            message: err.to_string(),
        }
    }
}
