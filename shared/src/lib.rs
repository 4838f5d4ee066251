pub mod listener;
pub mod metrics_defs;
