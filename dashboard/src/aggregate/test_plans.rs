//! Test results for a sprint.
//!
//! Plans are found by walking the paginated plan list until one's iteration
//! path ends in the sprint name. Totals come from the plan's runs; runs with
//! unanalyzed tests are broken down by their individual result outcomes.

use crate::context::ProjectContext;
use crate::errors::{DashboardError, Result};
use crate::metrics_defs::{ITEMS_DROPPED, TEST_PLAN_PAGES};
use crate::templates::{TEST_PLANS, TEST_RUN_RESULTS, TEST_RUNS};
use azure_client::DevOpsClient;
use azure_client::models::{ListResponse, TestCaseResult, TestPlan, TestRun};
use serde::Serialize;
use shared::{counter, histogram};
use std::collections::BTreeMap;

/// Continuation token sent with the first page request.
pub const INITIAL_CONTINUATION_TOKEN: &str = "0";
/// Upper bound on plan pages scanned for one sprint.
pub const MAX_TEST_PLAN_PAGES: usize = 200;

const PASSED: &str = "Passed";
const NOT_APPLICABLE: &str = "NotApplicable";
const FAILED: &str = "Failed";
const UNSPECIFIED: &str = "Unspecified";

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestTotals {
    pub total_tests: u64,
    pub passed_tests: u64,
    pub unanalyzed_tests: u64,
    pub not_applicable_tests: u64,
    pub incomplete_tests: u64,
}

impl TestTotals {
    pub fn add(&mut self, run: &TestRun) {
        self.total_tests += run.total_tests;
        self.passed_tests += run.passed_tests;
        self.unanalyzed_tests += run.unanalyzed_tests;
        self.not_applicable_tests += run.not_applicable_tests;
        self.incomplete_tests += run.incomplete_tests;
    }

    pub fn success(&self) -> bool {
        self.passed_tests + self.not_applicable_tests == self.total_tests
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub plan_id: u64,
    pub plan_name: String,
    pub sprint: String,
    #[serde(flatten)]
    pub totals: TestTotals,
    pub failed_tests: u64,
    /// Non-passing outcomes of the unanalyzed tests, by outcome name
    pub outcomes: BTreeMap<String, u64>,
    pub success: bool,
}

/// Last `\`-separated segment of an iteration path.
fn iteration_leaf(iteration: &str) -> &str {
    iteration.rsplit('\\').next().unwrap_or(iteration)
}

/// Walk the plan pages until a plan for `sprint` turns up.
pub async fn find_test_plan(
    client: &DevOpsClient,
    ctx: &ProjectContext,
    sprint: &str,
) -> Result<Option<TestPlan>> {
    let url = ctx.url(TEST_PLANS, &[])?;
    let mut token = INITIAL_CONTINUATION_TOKEN.to_string();
    let mut pages = 0;

    let found = loop {
        let page = client
            .get_page::<ListResponse<TestPlan>, _>(
                TEST_PLANS,
                &url,
                &[("continuationToken", token.as_str())],
            )
            .await?;
        pages += 1;

        let plan = page.body.value.into_iter().find(|plan| {
            plan.iteration
                .as_deref()
                .is_some_and(|iteration| iteration_leaf(iteration) == sprint)
        });
        if plan.is_some() {
            break plan;
        }

        match page.continuation_token {
            Some(next) if next != token => token = next,
            _ => break None,
        }
        if pages >= MAX_TEST_PLAN_PAGES {
            tracing::warn!(sprint, pages, "Giving up on test plan lookup");
            break None;
        }
    };

    histogram!(TEST_PLAN_PAGES).record(pages as f64);
    Ok(found)
}

/// Tally the outcomes of one run's results, skipping passing ones.
fn tally_outcomes(results: &[TestCaseResult], outcomes: &mut BTreeMap<String, u64>) {
    for result in results {
        let outcome = result.outcome.as_deref().unwrap_or(UNSPECIFIED);
        if outcome == PASSED || outcome == NOT_APPLICABLE {
            continue;
        }
        *outcomes.entry(outcome.to_string()).or_default() += 1;
    }
}

pub async fn test_summary(
    client: &DevOpsClient,
    ctx: &ProjectContext,
    sprint: &str,
) -> Result<TestSummary> {
    let sprint = sprint.trim();
    let plan = find_test_plan(client, ctx, sprint)
        .await?
        .ok_or_else(|| DashboardError::TestPlanNotFound(sprint.to_string()))?;

    let plan_id = plan.id.to_string();
    let url = ctx.url(TEST_RUNS, &[("planId", &plan_id)])?;
    let runs: ListResponse<TestRun> = client.get_json(TEST_RUNS, &url).await?;

    let mut totals = TestTotals::default();
    for run in &runs.value {
        totals.add(run);
    }

    let mut outcomes = BTreeMap::new();
    let unanalyzed_runs: Vec<&TestRun> = runs
        .value
        .iter()
        .filter(|run| run.unanalyzed_tests > 0)
        .collect();

    let failed_tests = if unanalyzed_runs.is_empty() {
        totals.unanalyzed_tests
    } else {
        for run in unanalyzed_runs {
            let url = ctx.url(TEST_RUN_RESULTS, &[("runId", &run.id.to_string())])?;
            match client
                .get_json::<ListResponse<TestCaseResult>>(TEST_RUN_RESULTS, &url)
                .await
            {
                Ok(results) => tally_outcomes(&results.value, &mut outcomes),
                Err(e) => {
                    tracing::warn!(run_id = run.id, error = %e, "Counting unanalyzed tests as failed");
                    counter!(ITEMS_DROPPED, "aggregation" => "test_results").increment(1);
                    *outcomes.entry(FAILED.to_string()).or_default() += run.unanalyzed_tests;
                }
            }
        }
        outcomes.values().sum()
    };

    Ok(TestSummary {
        plan_id: plan.id,
        plan_name: plan.name,
        sprint: sprint.to_string(),
        success: totals.success(),
        totals,
        failed_tests,
        outcomes,
    })
}
