//! Dashboard API over Azure DevOps.
//!
//! Each endpoint loads the requesting project's URL templates, calls the
//! upstream REST API through [`azure_client::DevOpsClient`] and reshapes the
//! responses into the payloads the dashboard front end renders.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod context;
pub mod errors;
pub mod fanout;
pub mod metrics_defs;
pub mod project;
pub mod store;
pub mod templates;

#[cfg(test)]
mod testutils;

use crate::api::Dashboard;
use crate::config::Config;
use crate::errors::Result;
use crate::store::FilesystemProjectStore;
use azure_client::DevOpsClient;
use std::sync::Arc;

/// Serve the dashboard API until interrupted.
pub async fn run(config: Config, client: DevOpsClient) -> Result<()> {
    tracing::info!(
        data_dir = %config.data_dir.display(),
        organization = %config.organization,
        "Starting dashboard"
    );

    let store = FilesystemProjectStore::new(&config.data_dir);
    let dashboard = Dashboard::new(Arc::new(store), client, config.upstream());
    api::serve(&config.listener, dashboard).await
}
