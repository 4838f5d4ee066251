use crate::aggregate::timelines::fetch_timelines;
use crate::context::ProjectContext;
use crate::errors::Result;
use crate::metrics_defs::ITEMS_DROPPED;
use crate::templates::{PIPELINE_APPROVALS, RELEASE_APPROVALS, RELEASE_PROGRESS_LINK, USER_GROUPS};
use azure_client::models::{GraphGroup, ListResponse, PipelineApproval, ReleaseApproval};
use azure_client::{BuildId, DevOpsClient};
use serde::Serialize;
use shared::counter;
use std::collections::HashSet;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YamlApproval {
    pub approval_id: String,
    pub pipeline_name: Option<String>,
    pub build_id: Option<BuildId>,
    pub build_number: Option<String>,
    pub created_on: Option<String>,
    pub instructions: Option<String>,
    /// Name of the first stage still waiting to run
    pub pending_stage: Option<String>,
    pub url: Option<String>,
}

impl From<&PipelineApproval> for YamlApproval {
    fn from(approval: &PipelineApproval) -> Self {
        let pipeline = approval.pipeline.as_ref();
        let owner = pipeline.and_then(|p| p.owner.as_ref());
        YamlApproval {
            approval_id: approval.id.clone(),
            pipeline_name: pipeline.and_then(|p| p.name.clone()),
            build_id: owner.map(|o| BuildId(o.id)),
            build_number: owner.and_then(|o| o.name.clone()),
            created_on: approval.created_on.clone(),
            instructions: approval.instructions.clone(),
            pending_stage: None,
            url: owner.and_then(|o| o.links.web.as_ref()).map(|l| l.href.clone()),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseApprovalSummary {
    pub id: u64,
    pub release_id: Option<u64>,
    pub release_name: Option<String>,
    pub environment: Option<String>,
    pub approver: Option<String>,
    pub created_on: Option<String>,
    pub release_url: Option<String>,
}

/// Principal names of the groups `user` belongs to.
async fn user_groups(client: &DevOpsClient, ctx: &ProjectContext, user: &str) -> Result<Vec<String>> {
    let encoded = urlencoding::encode(user);
    let url = ctx.url(USER_GROUPS, &[("user", &encoded)])?;
    let groups: ListResponse<GraphGroup> = client.get_json(USER_GROUPS, &url).await?;
    Ok(groups.value.into_iter().map(|g| g.principal_name).collect())
}

/// Whether any step of `approval` is assigned to one of `identities`.
/// `identities` must be lowercase.
fn assigned_to_any(approval: &PipelineApproval, identities: &HashSet<String>) -> bool {
    approval.steps.iter().any(|step| {
        step.assigned_approver
            .as_ref()
            .and_then(|approver| approver.unique_name.as_deref())
            .is_some_and(|name| identities.contains(&name.to_lowercase()))
    })
}

/// Pending YAML pipeline approvals that `user` can act on, directly or through
/// one of their groups, each with the stage it is holding up.
pub async fn yaml_approvals(
    client: &DevOpsClient,
    ctx: &ProjectContext,
    user: &str,
) -> Result<Vec<YamlApproval>> {
    let url = ctx.url(PIPELINE_APPROVALS, &[])?;
    let approvals: ListResponse<PipelineApproval> =
        client.get_json(PIPELINE_APPROVALS, &url).await?;

    let mut identities: HashSet<String> = match user_groups(client, ctx, user).await {
        Ok(groups) => groups.iter().map(|g| g.to_lowercase()).collect(),
        Err(e) => {
            tracing::warn!(user, error = %e, "Could not resolve groups, matching the user only");
            counter!(ITEMS_DROPPED, "aggregation" => "user_groups").increment(1);
            HashSet::new()
        }
    };
    identities.insert(user.to_lowercase());

    let mut matching: Vec<YamlApproval> = approvals
        .value
        .iter()
        .filter(|approval| assigned_to_any(approval, &identities))
        .map(YamlApproval::from)
        .collect();

    let build_ids: Vec<BuildId> = matching.iter().filter_map(|a| a.build_id).collect();
    let timelines = fetch_timelines(client, ctx, &build_ids).await?;

    let mut timelines = timelines.into_iter();
    for approval in matching.iter_mut().filter(|a| a.build_id.is_some()) {
        approval.pending_stage = timelines
            .next()
            .flatten()
            .and_then(|timeline| timeline.pending_stage().and_then(|stage| stage.name.clone()));
    }

    Ok(matching)
}

/// Pending classic release approvals, limited to the project's release
/// definitions when it has any.
pub async fn release_approvals(
    client: &DevOpsClient,
    ctx: &ProjectContext,
) -> Result<Vec<ReleaseApprovalSummary>> {
    let url = ctx.url(RELEASE_APPROVALS, &[])?;
    let approvals: ListResponse<ReleaseApproval> =
        client.get_json(RELEASE_APPROVALS, &url).await?;

    let definition_ids = &ctx.templates.definition_ids;
    approvals
        .value
        .into_iter()
        .filter(|approval| {
            definition_ids.is_empty()
                || approval
                    .release_definition
                    .as_ref()
                    .is_some_and(|definition| definition_ids.contains(&definition.id))
        })
        .map(|approval| -> Result<ReleaseApprovalSummary> {
            let release_id = approval.release.as_ref().map(|r| r.id);
            let release_url = match release_id {
                Some(id) => Some(ctx.url(RELEASE_PROGRESS_LINK, &[("releaseId", &id.to_string())])?),
                None => None,
            };
            Ok(ReleaseApprovalSummary {
                id: approval.id,
                release_id,
                release_name: approval.release.and_then(|r| r.name),
                environment: approval.release_environment.and_then(|e| e.name),
                approver: approval.approver.and_then(|a| a.display_name),
                created_on: approval.created_on,
                release_url,
            })
        })
        .collect()
}
