// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # Ufxray API
//!
//! HTTP gateway over [`ufxray_core`]: aggregated security news, the image
//! proxy, the CISA KEV catalog, the findings ledger, and the scan endpoints,
//! served as a JSON API for the browser UI.

pub mod error;
pub mod logging;
mod server;

pub use server::{AppState, router};

use ufxray_core::load_config;

/// Load configuration, bind the configured address, and serve until shutdown.
///
/// # Errors
///
/// Returns an error if configuration is invalid, a collaborator cannot be
/// constructed, or the listen address cannot be bound.
pub async fn run() -> anyhow::Result<()> {
    let config = load_config()?;
    let state = AppState::from_config(&config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ufxray API listening on {addr}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
