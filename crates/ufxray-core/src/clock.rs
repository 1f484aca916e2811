// SPDX-License-Identifier: Apache-2.0

//! Injectable clock abstraction.
//!
//! Cache freshness decisions depend on "now", so the clock is a trait seam
//! rather than a direct `Utc::now()` call. Production code uses
//! [`SystemClock`]; tests drive expiry deterministically with a manual clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time via `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Convenience constructor for the default shared clock.
#[must_use]
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}
