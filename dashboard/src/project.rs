use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DEFINITION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"definitionId=(\d+)").expect("valid regex"));

/// One tracked project as stored in `projects.json`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_name: String,
    /// Release folder path, without the leading backslash
    pub path: String,
    pub team_name: String,
    #[serde(
        rename = "yaml-pipelines-path",
        alias = "yamlPipelinesPath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub yaml_pipelines_path: Option<String>,
}

/// Body of `POST /api/create-project`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectCreateRequest {
    pub project_name: String,
    pub pipelines: Vec<String>,
    pub releases: Vec<String>,
    #[serde(rename = "teamName")]
    pub team_name: String,
    pub path: String,
    #[serde(rename = "yamlPipelinesPath", alias = "yaml-pipelines-path")]
    pub yaml_pipelines_path: Option<String>,
    pub tags: Vec<String>,
    /// Saved WIQL query backing the release plan view
    #[serde(rename = "releasePlanQueryId")]
    pub release_plan_query_id: Option<String>,
}

/// Names end up as directory names under the data directory.
pub fn is_valid_project_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
}

/// Release definition ids referenced by `definitionId=<n>` in the given URLs,
/// in first-seen order without duplicates.
pub fn scrape_definition_ids<'a, I>(urls: I) -> Vec<u64>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut ids = Vec::new();
    for url in urls {
        for captures in DEFINITION_ID.captures_iter(url) {
            if let Ok(id) = captures[1].parse::<u64>() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

/// Trimmed, non-empty tags in first-seen order without duplicates.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !normalized.iter().any(|existing| existing == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}
