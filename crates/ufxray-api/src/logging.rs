// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the ufxray API gateway.
//!
//! Uses `tracing` with `tracing-subscriber` for structured logging.
//! Log level can be controlled via the `RUST_LOG` environment variable.
//!
//! ```bash
//! # Default: info level for ufxray, warn for dependencies
//! cargo run
//!
//! # Debug output for troubleshooting
//! RUST_LOG=ufxray=debug cargo run
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize the logging subsystem.
///
/// The `RUST_LOG` environment variable overrides the default filter.
pub fn init_logging() {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("ufxray=info,reqwest=warn,hyper=warn"))
        .expect("valid default filter directives");

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
