//! The subset of Azure DevOps response payloads the dashboard reads.
//!
//! Everything not listed here is discarded during deserialization. Most
//! fields are optional because the upstream omits them freely.

use crate::build_uri::BuildId;
use serde::{Deserialize, Serialize};

/// Standard `{ "count": n, "value": [...] }` list envelope.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Link {
    pub href: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct WebLinks {
    pub web: Option<Link>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub unique_name: Option<String>,
}

/// Identity fields on work items are either a full identity object or, in
/// older payloads, a plain "Name <email>" string.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IdentityField {
    Identity(IdentityRef),
    Name(String),
}

impl IdentityField {
    pub fn display_name(&self) -> Option<&str> {
        match self {
            IdentityField::Identity(identity) => identity.display_name.as_deref(),
            IdentityField::Name(name) => Some(name.as_str()),
        }
    }
}

// Iterations

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimeFrame {
    Past,
    Current,
    Future,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationAttributes {
    pub start_date: Option<String>,
    pub finish_date: Option<String>,
    pub time_frame: Option<TimeFrame>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Iteration {
    pub id: String,
    pub name: String,
    pub path: Option<String>,
    #[serde(default)]
    pub attributes: IterationAttributes,
}

// Releases

#[derive(Clone, Debug, Deserialize)]
pub struct ReleaseDefinitionRef {
    pub id: u64,
    pub name: Option<String>,
    pub path: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ArtifactSourceReference {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ArtifactDefinitionReference {
    #[serde(rename = "buildUri")]
    pub build_uri: Option<ArtifactSourceReference>,
    pub version: Option<ArtifactSourceReference>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: Option<String>,
    pub alias: Option<String>,
    pub definition_reference: Option<ArtifactDefinitionReference>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: u64,
    pub name: String,
    pub status: Option<String>,
    pub created_on: Option<String>,
    pub description: Option<String>,
    pub release_definition: Option<ReleaseDefinitionRef>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Release {
    /// Build ids linked through the artifacts' `vstfs:///Build/Build/<id>`
    /// URIs, in artifact order without duplicates.
    pub fn build_ids(&self) -> Vec<BuildId> {
        let mut ids = Vec::new();
        for artifact in &self.artifacts {
            let uri = artifact
                .definition_reference
                .as_ref()
                .and_then(|reference| reference.build_uri.as_ref())
                .and_then(|build_uri| build_uri.id.as_deref());

            if let Some(id) = uri.and_then(BuildId::from_uri) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NamedRef {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReleaseRef {
    pub id: u64,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseApproval {
    pub id: u64,
    pub status: Option<String>,
    pub created_on: Option<String>,
    pub approver: Option<IdentityRef>,
    pub release: Option<ReleaseRef>,
    pub release_environment: Option<NamedRef>,
    pub release_definition: Option<ReleaseDefinitionRef>,
}

// Work items

#[derive(Clone, Debug, Deserialize)]
pub struct WorkItemReference {
    pub id: u64,
    pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiqlResult {
    #[serde(default)]
    pub work_items: Vec<WorkItemReference>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorkItemId {
    pub id: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorkItemRelation {
    pub rel: Option<String>,
    pub source: Option<WorkItemId>,
    pub target: Option<WorkItemId>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationWorkItems {
    #[serde(default)]
    pub work_item_relations: Vec<WorkItemRelation>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorkItemFields {
    #[serde(rename = "System.Title")]
    pub title: Option<String>,
    #[serde(rename = "System.State")]
    pub state: Option<String>,
    #[serde(rename = "System.Reason")]
    pub reason: Option<String>,
    #[serde(rename = "System.AssignedTo")]
    pub assigned_to: Option<IdentityField>,
    #[serde(rename = "System.AreaPath")]
    pub area_path: Option<String>,
    #[serde(rename = "System.IterationPath")]
    pub iteration_path: Option<String>,
    #[serde(rename = "System.WorkItemType")]
    pub work_item_type: Option<String>,
    #[serde(rename = "Custom.ReleaseNotes")]
    pub release_notes: Option<String>,
    #[serde(rename = "Custom.PMApprovaltoProduction")]
    pub pm_approval_to_production: Option<serde_json::Value>,
    #[serde(rename = "Custom.DevApprovaltoStaging")]
    pub dev_approval_to_staging: Option<serde_json::Value>,
    #[serde(rename = "Custom.SEApprovaltoProduction")]
    pub se_approval_to_production: Option<serde_json::Value>,
    #[serde(rename = "Custom.ApprovaltoStaging")]
    pub approval_to_staging: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemLinks {
    pub html: Option<Link>,
    pub work_item_updates: Option<Link>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    #[serde(default)]
    pub fields: WorkItemFields,
    #[serde(rename = "_links")]
    pub links: Option<WorkItemLinks>,
}

/// Body of the `workitemsbatch` POST endpoint.
#[derive(Debug, Serialize)]
pub struct WorkItemsBatchRequest<'a> {
    pub ids: &'a [u64],
    pub fields: &'a [&'a str],
}

// Wiki

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WikiPage {
    pub path: String,
    pub order: Option<i64>,
    pub remote_url: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub sub_pages: Vec<WikiPage>,
}

// Test plans

#[derive(Clone, Debug, Deserialize)]
pub struct TestPlan {
    pub id: u64,
    pub name: String,
    pub iteration: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestRun {
    pub id: u64,
    pub name: Option<String>,
    pub total_tests: u64,
    pub passed_tests: u64,
    pub unanalyzed_tests: u64,
    pub not_applicable_tests: u64,
    pub incomplete_tests: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TestCaseResult {
    pub outcome: Option<String>,
}

// Pipelines, approvals and timelines

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalStep {
    pub assigned_approver: Option<IdentityRef>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApprovalOwner {
    pub id: u64,
    pub name: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: WebLinks,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApprovalPipeline {
    pub name: Option<String>,
    pub owner: Option<ApprovalOwner>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineApproval {
    pub id: String,
    pub status: Option<String>,
    pub created_on: Option<String>,
    pub instructions: Option<String>,
    #[serde(default)]
    pub steps: Vec<ApprovalStep>,
    pub pipeline: Option<ApprovalPipeline>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphGroup {
    pub principal_name: String,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TimelineRecord {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub name: Option<String>,
    pub state: Option<String>,
    pub result: Option<String>,
    pub order: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub records: Vec<TimelineRecord>,
}

impl Timeline {
    /// Stage records sorted by their `order`.
    pub fn stages(&self) -> Vec<&TimelineRecord> {
        let mut stages: Vec<&TimelineRecord> = self
            .records
            .iter()
            .filter(|record| record.record_type.as_deref() == Some("Stage"))
            .collect();
        stages.sort_by_key(|record| record.order.unwrap_or(i64::MAX));
        stages
    }

    /// The lowest-order stage still waiting to run.
    pub fn pending_stage(&self) -> Option<&TimelineRecord> {
        self.stages()
            .into_iter()
            .find(|record| record.state.as_deref() == Some("pending"))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub name: String,
    pub folder: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: WebLinks,
}
