//! Aggregations behind each dashboard endpoint.
//!
//! Every function takes the client and the requesting project's context and
//! returns the reshaped payload. Upstream failures on the primary call
//! propagate; failures while enriching individual items drop those items.

pub mod approvals;
pub mod iterations;
pub mod pipelines;
pub mod projects;
pub mod release_notes;
pub mod release_work_items;
pub mod test_plans;
pub mod timelines;
pub mod work_items;
