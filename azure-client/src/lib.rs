//! Client and response models for the Azure DevOps REST API.

pub mod build_uri;
pub mod client;
pub mod metrics_defs;
pub mod models;

pub use build_uri::BuildId;
pub use client::{ClientError, DevOpsClient, Page};
