//! Per-project URL templates.
//!
//! Each project owns a `urls.json` mapping logical endpoint names to upstream
//! URLs. URLs may contain `{placeholder}` tokens that are filled in by literal
//! string replacement when a request is made. Alongside the URLs the file
//! stores the values computed when the project was created.

use crate::config::UpstreamSettings;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ALL_RELEASES: &str = "all-releases";
pub const SINGLE_RELEASE: &str = "single-release";
pub const RELEASE_APPROVALS: &str = "release-approvals";
pub const RELEASE_DEFINITION_LINK: &str = "release-definition-link";
pub const RELEASE_PROGRESS_LINK: &str = "release-progress-link";
pub const ITERATIONS_LIST: &str = "iterations-list";
pub const ITERATION_WORK_ITEMS: &str = "iteration-work-items";
pub const WORK_ITEMS_BATCH: &str = "work-items-batch";
pub const WORK_ITEM: &str = "work-item";
pub const WIQL_URL: &str = "wiql-url";
pub const BUILD_WORK_ITEMS: &str = "build-work-items";
pub const BUILD_TIMELINE: &str = "build-timeline";
pub const WIKI_PAGES: &str = "wiki-pages";
pub const TEST_PLANS: &str = "test-plans";
pub const TEST_RUNS: &str = "test-runs";
pub const TEST_RUN_RESULTS: &str = "test-run-results";
pub const PIPELINE_APPROVALS: &str = "pipeline-approvals";
pub const USER_GROUPS: &str = "user-groups";
pub const YAML_PIPELINES: &str = "yaml-pipelines";

/// Templates every new project starts with. `{organization}` and `{project}`
/// are filled in at creation time; the remaining tokens per request.
pub const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    (
        ALL_RELEASES,
        "https://vsrm.dev.azure.com/{organization}/{project}/_apis/release/releases",
    ),
    (
        SINGLE_RELEASE,
        "https://vsrm.dev.azure.com/{organization}/{project}/_apis/release/releases/{releaseId}?api-version=7.1",
    ),
    (
        RELEASE_APPROVALS,
        "https://vsrm.dev.azure.com/{organization}/{project}/_apis/release/approvals?statusFilter=pending&api-version=7.1",
    ),
    (
        RELEASE_DEFINITION_LINK,
        "https://dev.azure.com/{organization}/{project}/_release?_a=releases&view=mine&definitionId={definitionId}",
    ),
    (
        RELEASE_PROGRESS_LINK,
        "https://dev.azure.com/{organization}/{project}/_releaseProgress?_a=release-pipeline-progress&releaseId={releaseId}",
    ),
    (
        ITERATIONS_LIST,
        "https://dev.azure.com/{organization}/{project}/{teamName}/_apis/work/teamsettings/iterations?api-version=7.1",
    ),
    (
        ITERATION_WORK_ITEMS,
        "https://dev.azure.com/{organization}/{project}/{teamName}/_apis/work/teamsettings/iterations/{iterationId}/workitems?api-version=7.2-preview.1",
    ),
    (
        WORK_ITEMS_BATCH,
        "https://dev.azure.com/{organization}/{project}/_apis/wit/workitemsbatch?api-version=7.1",
    ),
    (
        WORK_ITEM,
        "https://dev.azure.com/{organization}/{project}/_apis/wit/workitems/{workItemId}?$expand=links&api-version=7.1",
    ),
    (
        WIQL_URL,
        "https://dev.azure.com/{organization}/{project}/_apis/wit/wiql/{queryId}?api-version=7.1",
    ),
    (
        BUILD_WORK_ITEMS,
        "https://dev.azure.com/{organization}/{project}/_apis/build/builds/{buildId}/workitems?api-version=7.1",
    ),
    (
        BUILD_TIMELINE,
        "https://dev.azure.com/{organization}/{project}/_apis/build/builds/{buildId}/timeline?api-version=7.1",
    ),
    (
        WIKI_PAGES,
        "https://dev.azure.com/{organization}/{project}/_apis/wiki/wikis/{project}.wiki/pages?path=/Release%20Notes&recursionLevel=full&api-version=7.1",
    ),
    (
        TEST_PLANS,
        "https://dev.azure.com/{organization}/{project}/_apis/testplan/plans?api-version=7.1",
    ),
    (
        TEST_RUNS,
        "https://dev.azure.com/{organization}/{project}/_apis/test/runs?planId={planId}&api-version=7.1",
    ),
    (
        TEST_RUN_RESULTS,
        "https://dev.azure.com/{organization}/{project}/_apis/test/Runs/{runId}/results?api-version=7.1",
    ),
    (
        PIPELINE_APPROVALS,
        "https://dev.azure.com/{organization}/{project}/_apis/pipelines/approvals?state=pending&$expand=steps&api-version=7.1-preview.1",
    ),
    (
        USER_GROUPS,
        "https://vssps.dev.azure.com/{organization}/_apis/graph/users/{user}/groups?api-version=7.1-preview.1",
    ),
    (
        YAML_PIPELINES,
        "https://dev.azure.com/{organization}/{project}/_apis/pipelines?api-version=7.1",
    ),
];

/// Replace every `{name}` token with its value. Unknown tokens are left as-is.
pub fn render(template: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |url, (name, value)| {
            url.replace(&format!("{{{name}}}"), value)
        })
}

/// Contents of a project's `urls.json`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct UrlTemplateSet {
    /// Endpoint name to URL template, in file order. Entries added by hand
    /// that are not strings are kept but never rendered.
    #[serde(flatten)]
    pub urls: IndexMap<String, Value>,
    /// Pipeline URLs supplied when the project was created
    #[serde(default)]
    pub pipelines: Vec<String>,
    /// Release URLs supplied when the project was created
    #[serde(default)]
    pub releases: Vec<String>,
    /// Release definition ids scraped from `pipelines` and `releases`
    #[serde(rename = "definition-ids", default)]
    pub definition_ids: Vec<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl UrlTemplateSet {
    /// The default template set with the organization and project filled in.
    pub fn defaults(upstream: &UpstreamSettings) -> Self {
        let params = [
            ("organization", upstream.organization.as_str()),
            ("project", upstream.project.as_str()),
        ];
        let urls = DEFAULT_TEMPLATES
            .iter()
            .map(|(name, template)| (name.to_string(), Value::String(render(template, &params))))
            .collect();

        UrlTemplateSet {
            urls,
            ..Default::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.urls.get(name).and_then(Value::as_str)
    }

    /// Render the named template, or `None` if the project does not define it.
    pub fn render(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        self.get(name).map(|template| render(template, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream() -> UpstreamSettings {
        UpstreamSettings {
            organization: "PSJH".into(),
            project: "Administrative%20Technology".into(),
        }
    }

    #[test]
    fn test_render() {
        assert_eq!(
            render(
                "https://x/{teamName}/iterations/{iterationId}",
                &[("teamName", "Team A"), ("iterationId", "42")]
            ),
            "https://x/Team A/iterations/42"
        );
        // No validation that every placeholder was filled
        assert_eq!(
            render("https://x/{teamName}/{missing}", &[("teamName", "T")]),
            "https://x/T/{missing}"
        );
        // Repeated tokens are all replaced
        assert_eq!(render("{a}-{a}", &[("a", "1")]), "1-1");
    }

    #[test]
    fn test_defaults_fill_organization_and_project() {
        let set = UrlTemplateSet::defaults(&upstream());
        assert_eq!(set.urls.len(), DEFAULT_TEMPLATES.len());
        assert_eq!(
            set.get(ALL_RELEASES),
            Some("https://vsrm.dev.azure.com/PSJH/Administrative%20Technology/_apis/release/releases")
        );
        assert!(set.get(ITERATIONS_LIST).unwrap().contains("{teamName}"));
        let urls: Vec<&str> = set.urls.values().filter_map(Value::as_str).collect();
        assert_eq!(urls.len(), DEFAULT_TEMPLATES.len());
        assert!(urls.iter().all(|url| !url.contains("{organization}")));
        assert!(urls.iter().all(|url| !url.contains("{project}")));
    }

    #[test]
    fn test_render_named_template() {
        let set = UrlTemplateSet::defaults(&upstream());
        let url = set
            .render(SINGLE_RELEASE, &[("releaseId", "1234")])
            .unwrap();
        assert!(url.ends_with("/_apis/release/releases/1234?api-version=7.1"));
        assert_eq!(set.render("no-such-template", &[]), None);
    }

    #[test]
    fn test_file_format() {
        let json = r#"{
            "all-releases": "https://example.com/releases",
            "iterations-list": "https://example.com/{teamName}/iterations",
            "pipelines": ["https://example.com/_release?definitionId=12"],
            "releases": [],
            "definition-ids": [12],
            "tags": ["web"]
        }"#;

        let set: UrlTemplateSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.urls.len(), 2);
        assert_eq!(set.get(ALL_RELEASES), Some("https://example.com/releases"));
        assert_eq!(set.definition_ids, vec![12]);
        assert_eq!(set.tags, vec!["web"]);

        // Templates keep their file order and computed fields survive a round trip
        let written = serde_json::to_value(&set).unwrap();
        let keys: Vec<&String> = written.as_object().unwrap().keys().collect();
        assert!(keys.contains(&&"definition-ids".to_string()));
        let reread: UrlTemplateSet = serde_json::from_value(written).unwrap();
        assert_eq!(reread, set);
        let names: Vec<&str> = reread.urls.keys().map(String::as_str).collect();
        assert_eq!(names, vec![ALL_RELEASES, ITERATIONS_LIST]);
    }

    #[test]
    fn test_computed_fields_are_optional() {
        let set: UrlTemplateSet =
            serde_json::from_str(r#"{"all-releases": "https://example.com"}"#).unwrap();
        assert!(set.definition_ids.is_empty());
        assert!(set.tags.is_empty());
    }

    #[test]
    fn test_hand_edited_entries_that_are_not_strings() {
        let json = r#"{
            "all-releases": "https://example.com/releases",
            "notes": ["kept", "as-is"],
            "disabled-endpoint": null,
            "retries": 3
        }"#;

        let set: UrlTemplateSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.get(ALL_RELEASES), Some("https://example.com/releases"));
        assert_eq!(set.get("notes"), None);
        assert_eq!(set.render("disabled-endpoint", &[]), None);
        assert_eq!(set.get("retries"), None);

        let written = serde_json::to_value(&set).unwrap();
        assert_eq!(written["notes"], serde_json::json!(["kept", "as-is"]));
        assert_eq!(written["retries"], 3);
    }
}
