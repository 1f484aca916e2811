// SPDX-License-Identifier: Apache-2.0

//! Subprocess invocation of the external analyzer scripts.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;

use crate::config::ScanConfig;
use crate::error::XrayError;

/// Runs the external analyzer scripts and parses their JSON verdicts.
///
/// Each scan is a one-shot subprocess bounded by a wall-clock timeout. The
/// child is killed if the timeout fires.
pub struct ScanRunner {
    python_bin: String,
    scripts_dir: PathBuf,
    timeout: Duration,
}

impl ScanRunner {
    /// Create a runner from the scan section of the application config.
    #[must_use]
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            python_bin: config.python_bin.clone(),
            scripts_dir: PathBuf::from(&config.scripts_dir),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    /// Analyze a URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be spawned, exits non-zero,
    /// exceeds the timeout, or emits an unparseable verdict.
    pub async fn scan_url(&self, url: &str) -> Result<Value, XrayError> {
        self.run("url_scanner_enhanced.py", &[OsStr::new(url)]).await
    }

    /// Analyze an uploaded file stored at `path`, reporting `original_name`
    /// in the verdict.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be spawned, exits non-zero,
    /// exceeds the timeout, or emits an unparseable verdict.
    pub async fn scan_file(&self, path: &Path, original_name: &str) -> Result<Value, XrayError> {
        self.run("scanner.py", &[path.as_os_str(), OsStr::new(original_name)])
            .await
    }

    /// Analyze a log excerpt stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be spawned, exits non-zero,
    /// exceeds the timeout, or emits an unparseable verdict.
    pub async fn scan_log(&self, path: &Path) -> Result<Value, XrayError> {
        self.run("log_analyzer.py", &[path.as_os_str()]).await
    }

    async fn run(&self, script: &str, args: &[&OsStr]) -> Result<Value, XrayError> {
        let script_path = self.scripts_dir.join(script);
        tracing::debug!(script = %script_path.display(), "spawning analyzer");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.python_bin)
                .arg(&script_path)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| XrayError::ScanTimeout {
            seconds: self.timeout.as_secs(),
        })?
        .map_err(|e| XrayError::Scan {
            message: format!("failed to spawn {}: {e}", script_path.display()),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(XrayError::Scan {
                message: format!("{script} exited with {}: {}", output.status, stderr.trim()),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| XrayError::Scan {
            message: format!("unparseable verdict from {script}: {e}"),
        })
    }
}
