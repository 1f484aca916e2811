// SPDX-License-Identifier: Apache-2.0

//! Binary entry point for the ufxray API gateway.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ufxray_api::logging::init_logging();
    ufxray_api::run().await
}
