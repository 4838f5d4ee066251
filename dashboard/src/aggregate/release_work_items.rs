use crate::context::ProjectContext;
use crate::errors::Result;
use crate::metrics_defs::ITEMS_DROPPED;
use crate::templates::{BUILD_WORK_ITEMS, SINGLE_RELEASE, WORK_ITEM};
use azure_client::models::{ListResponse, Release, WorkItem, WorkItemReference};
use azure_client::{BuildId, DevOpsClient};
use serde::Serialize;
use shared::counter;
use std::collections::HashSet;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseWorkItem {
    pub id: u64,
    pub title: Option<String>,
    pub state: Option<String>,
    pub reason: Option<String>,
    pub assigned_to: Option<String>,
    pub html_url: Option<String>,
}

impl From<WorkItem> for ReleaseWorkItem {
    fn from(item: WorkItem) -> Self {
        let fields = item.fields;
        ReleaseWorkItem {
            id: item.id,
            assigned_to: fields
                .assigned_to
                .as_ref()
                .and_then(|a| a.display_name())
                .map(String::from),
            title: fields.title,
            state: fields.state,
            reason: fields.reason,
            html_url: item.links.and_then(|links| links.html).map(|link| link.href),
        }
    }
}

/// Work items linked to the builds a release deployed.
///
/// A release whose artifacts reference no builds yields an empty list. A build
/// whose work items cannot be listed, or a work item whose detail cannot be
/// fetched, is skipped.
pub async fn release_work_items(
    client: &DevOpsClient,
    ctx: &ProjectContext,
    release_id: u64,
) -> Result<Vec<ReleaseWorkItem>> {
    let release_id = release_id.to_string();
    let url = ctx.url(SINGLE_RELEASE, &[("releaseId", &release_id)])?;
    let release: Release = client.get_json(SINGLE_RELEASE, &url).await?;

    let build_ids = release.build_ids();
    if build_ids.is_empty() {
        tracing::debug!(release_id = %release_id, "Release has no build artifacts");
        return Ok(Vec::new());
    }

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for build_id in build_ids {
        let references = match build_work_items(client, ctx, build_id).await {
            Ok(references) => references,
            Err(e) => {
                tracing::warn!(%build_id, error = %e, "Skipping build, could not list work items");
                counter!(ITEMS_DROPPED, "aggregation" => "release_work_items").increment(1);
                continue;
            }
        };

        for reference in references {
            if !seen.insert(reference.id) {
                continue;
            }
            match work_item(client, ctx, reference.id).await {
                Ok(item) => items.push(item.into()),
                Err(e) => {
                    tracing::warn!(work_item = reference.id, error = %e, "Skipping work item");
                    counter!(ITEMS_DROPPED, "aggregation" => "release_work_items").increment(1);
                }
            }
        }
    }

    Ok(items)
}

async fn build_work_items(
    client: &DevOpsClient,
    ctx: &ProjectContext,
    build_id: BuildId,
) -> Result<Vec<WorkItemReference>> {
    let url = ctx.url(BUILD_WORK_ITEMS, &[("buildId", &build_id.to_string())])?;
    let response: ListResponse<WorkItemReference> =
        client.get_json(BUILD_WORK_ITEMS, &url).await?;
    Ok(response.value)
}

async fn work_item(client: &DevOpsClient, ctx: &ProjectContext, id: u64) -> Result<WorkItem> {
    let url = ctx.url(WORK_ITEM, &[("workItemId", &id.to_string())])?;
    Ok(client.get_json(WORK_ITEM, &url).await?)
}
