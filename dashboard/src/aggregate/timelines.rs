use crate::context::ProjectContext;
use crate::errors::{DashboardError, Result};
use crate::fanout::join_in_order;
use crate::metrics_defs::ITEMS_DROPPED;
use crate::templates::BUILD_TIMELINE;
use azure_client::models::{Timeline, TimelineRecord};
use azure_client::{BuildId, DevOpsClient};
use serde::Serialize;
use shared::counter;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct StageSummary {
    pub name: Option<String>,
    pub state: Option<String>,
    pub result: Option<String>,
    pub order: Option<i64>,
}

impl From<&TimelineRecord> for StageSummary {
    fn from(record: &TimelineRecord) -> Self {
        StageSummary {
            name: record.name.clone(),
            state: record.state.clone(),
            result: record.result.clone(),
            order: record.order,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildTimeline {
    pub build_id: BuildId,
    pub stages: Vec<StageSummary>,
}

/// Parse a comma separated list of build ids, dropping duplicates.
pub fn parse_build_ids(raw: &str) -> Result<Vec<BuildId>> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id: BuildId = part.parse().map_err(|_| DashboardError::InvalidParameter {
            name: "buildIds",
            reason: format!("'{part}' is not a build id"),
        })?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(DashboardError::MissingParameter("buildIds"));
    }
    Ok(ids)
}

/// Fetch the timelines of `build_ids` concurrently, in input order. `None`
/// marks a build whose timeline could not be fetched.
pub async fn fetch_timelines(
    client: &DevOpsClient,
    ctx: &ProjectContext,
    build_ids: &[BuildId],
) -> Result<Vec<Option<Timeline>>> {
    let requests = build_ids
        .iter()
        .map(|id| Ok((*id, ctx.url(BUILD_TIMELINE, &[("buildId", &id.to_string())])?)))
        .collect::<Result<Vec<_>>>()?;

    let results = join_in_order(requests, |(build_id, url)| {
        let client = client.clone();
        async move {
            match client.get_json::<Timeline>(BUILD_TIMELINE, &url).await {
                Ok(timeline) => Some(timeline),
                Err(e) => {
                    tracing::warn!(%build_id, error = %e, "Could not fetch build timeline");
                    counter!(ITEMS_DROPPED, "aggregation" => "timelines").increment(1);
                    None
                }
            }
        }
    })
    .await;

    Ok(results.into_iter().map(Option::flatten).collect())
}

/// Stages of each build, omitting builds whose timeline could not be fetched.
pub async fn build_timelines(
    client: &DevOpsClient,
    ctx: &ProjectContext,
    build_ids: &[BuildId],
) -> Result<Vec<BuildTimeline>> {
    let timelines = fetch_timelines(client, ctx, build_ids).await?;

    Ok(build_ids
        .iter()
        .zip(timelines)
        .filter_map(|(build_id, timeline)| {
            timeline.map(|timeline| BuildTimeline {
                build_id: *build_id,
                stages: timeline.stages().into_iter().map(StageSummary::from).collect(),
            })
        })
        .collect())
}
