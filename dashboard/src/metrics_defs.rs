//! Metrics definitions for the dashboard.

use shared::metrics_defs::{MetricDef, MetricType};

pub const API_ERRORS: MetricDef = MetricDef {
    name: "api.errors",
    metric_type: MetricType::Counter,
    description: "Number of API requests answered with an error, tagged by status code",
};

pub const ITEMS_DROPPED: MetricDef = MetricDef {
    name: "aggregation.items_dropped",
    metric_type: MetricType::Counter,
    description: "Number of items omitted from a response because their enrichment call failed",
};

pub const TEST_PLAN_PAGES: MetricDef = MetricDef {
    name: "aggregation.test_plan_pages",
    metric_type: MetricType::Histogram,
    description: "Number of test plan pages scanned to resolve a sprint's plan",
};

pub const PROJECTS_REGISTERED: MetricDef = MetricDef {
    name: "projects.registered",
    metric_type: MetricType::Gauge,
    description: "Number of projects in the project list",
};

pub const ALL_METRICS: &[MetricDef] = &[
    API_ERRORS,
    ITEMS_DROPPED,
    TEST_PLAN_PAGES,
    PROJECTS_REGISTERED,
];
