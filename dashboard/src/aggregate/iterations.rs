use crate::aggregate::release_notes::{link_release_notes, release_note_pages};
use crate::context::ProjectContext;
use crate::errors::Result;
use crate::metrics_defs::ITEMS_DROPPED;
use crate::templates::{ITERATIONS_LIST, WIKI_PAGES};
use azure_client::DevOpsClient;
use azure_client::models::{Iteration, ListResponse, TimeFrame, WikiPage};
use serde::Serialize;
use shared::counter;

/// Number of sprints shown on the release-notes view
pub const MAX_SPRINTS: usize = 10;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IterationSummary {
    pub id: String,
    pub name: String,
    pub path: Option<String>,
    pub start_date: Option<String>,
    pub finish_date: Option<String>,
    pub time_frame: Option<TimeFrame>,
}

impl From<Iteration> for IterationSummary {
    fn from(iteration: Iteration) -> Self {
        IterationSummary {
            id: iteration.id,
            name: iteration.name,
            path: iteration.path,
            start_date: iteration.attributes.start_date,
            finish_date: iteration.attributes.finish_date,
            time_frame: iteration.attributes.time_frame,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SprintSummary {
    #[serde(flatten)]
    pub iteration: IterationSummary,
    pub release_notes_url: Option<String>,
}

/// Only iterations that have started: `current` or `past`.
pub fn active_iterations(iterations: Vec<Iteration>) -> Vec<Iteration> {
    iterations
        .into_iter()
        .filter(|iteration| {
            matches!(
                iteration.attributes.time_frame,
                Some(TimeFrame::Current | TimeFrame::Past)
            )
        })
        .collect()
}

/// The last `n` iterations, still in chronological order.
pub fn most_recent(iterations: Vec<Iteration>, n: usize) -> Vec<Iteration> {
    let skip = iterations.len().saturating_sub(n);
    iterations.into_iter().skip(skip).collect()
}

async fn fetch_iterations(client: &DevOpsClient, ctx: &ProjectContext) -> Result<Vec<Iteration>> {
    let url = ctx.url(ITERATIONS_LIST, &[])?;
    let response: ListResponse<Iteration> = client.get_json(ITERATIONS_LIST, &url).await?;
    Ok(response.value)
}

/// Current and past iterations of the project's team.
pub async fn list_releases(
    client: &DevOpsClient,
    ctx: &ProjectContext,
) -> Result<Vec<IterationSummary>> {
    let iterations = fetch_iterations(client, ctx).await?;
    Ok(active_iterations(iterations)
        .into_iter()
        .map(IterationSummary::from)
        .collect())
}

/// The most recent sprints, each linked to its release-notes wiki page.
pub async fn list_sprints(
    client: &DevOpsClient,
    ctx: &ProjectContext,
) -> Result<Vec<SprintSummary>> {
    let iterations = fetch_iterations(client, ctx).await?;
    let sprints = most_recent(active_iterations(iterations), MAX_SPRINTS);

    let pages = match fetch_wiki(client, ctx).await {
        Ok(root) => release_note_pages(root),
        Err(e) => {
            tracing::warn!(
                project = %ctx.project.project_name,
                error = %e,
                "Could not load release notes wiki, returning sprints without links"
            );
            counter!(ITEMS_DROPPED, "aggregation" => "sprints").increment(1);
            Vec::new()
        }
    };

    let names: Vec<&str> = sprints.iter().map(|s| s.name.as_str()).collect();
    let links = link_release_notes(&names, &pages);

    Ok(sprints
        .into_iter()
        .zip(links)
        .map(|(iteration, release_notes_url)| SprintSummary {
            iteration: iteration.into(),
            release_notes_url,
        })
        .collect())
}

async fn fetch_wiki(client: &DevOpsClient, ctx: &ProjectContext) -> Result<WikiPage> {
    let url = ctx.url(WIKI_PAGES, &[])?;
    Ok(client.get_json(WIKI_PAGES, &url).await?)
}
