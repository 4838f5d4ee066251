use crate::context::ProjectContext;
use crate::errors::Result;
use crate::templates::{
    ALL_RELEASES, RELEASE_DEFINITION_LINK, RELEASE_PROGRESS_LINK, YAML_PIPELINES,
};
use azure_client::DevOpsClient;
use azure_client::models::{ListResponse, Pipeline, Release};
use serde::Serialize;

const RELEASES_PAGE_SIZE: &str = "200";
const RELEASES_API_VERSION: &str = "7.1";
const MISSING_DESCRIPTION: &str = "—";

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRelease {
    pub release_id: u64,
    pub definition_id: Option<u64>,
    pub name: String,
    pub status: Option<String>,
    pub created_on: Option<String>,
    pub description: String,
    pub pipeline_url: Option<String>,
    pub release_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YamlPipeline {
    pub id: u64,
    pub name: String,
    pub folder: Option<String>,
    pub url: Option<String>,
}

/// Releases created between `start` and `end` under the project's release
/// folder, limited to the project's release definitions when it has any.
pub async fn list_pipeline_releases(
    client: &DevOpsClient,
    ctx: &ProjectContext,
    start: &str,
    end: &str,
) -> Result<Vec<PipelineRelease>> {
    let url = ctx.url(ALL_RELEASES, &[])?;
    let folder = format!("\\{}", ctx.project.path);

    let mut query = vec![
        ("minCreatedTime", start.to_string()),
        ("maxCreatedTime", end.to_string()),
        ("$top", RELEASES_PAGE_SIZE.to_string()),
        ("$path", folder),
        ("api-version", RELEASES_API_VERSION.to_string()),
    ];
    if !ctx.templates.tags.is_empty() {
        query.push(("tagFilter", ctx.templates.tags.join(",")));
    }

    let response: ListResponse<Release> = client
        .get_json_with_query(ALL_RELEASES, &url, &query)
        .await?;

    let definition_ids = &ctx.templates.definition_ids;
    response
        .value
        .into_iter()
        .filter(|release| {
            definition_ids.is_empty()
                || release
                    .release_definition
                    .as_ref()
                    .is_some_and(|definition| definition_ids.contains(&definition.id))
        })
        .map(|release| to_pipeline_release(ctx, release))
        .collect()
}

fn to_pipeline_release(ctx: &ProjectContext, release: Release) -> Result<PipelineRelease> {
    let definition_id = release.release_definition.as_ref().map(|d| d.id);
    let release_id = release.id.to_string();

    let pipeline_url = match definition_id {
        Some(id) => Some(ctx.url(RELEASE_DEFINITION_LINK, &[("definitionId", &id.to_string())])?),
        None => None,
    };
    let release_url = Some(ctx.url(RELEASE_PROGRESS_LINK, &[("releaseId", &release_id)])?);

    Ok(PipelineRelease {
        release_id: release.id,
        definition_id,
        name: release.name,
        status: release.status,
        created_on: release.created_on,
        description: release
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| MISSING_DESCRIPTION.to_string()),
        pipeline_url,
        release_url,
    })
}

fn normalize_folder(folder: &str) -> String {
    folder.trim().trim_matches('\\').to_lowercase()
}

/// YAML pipelines in the project's pipelines folder, or all of them when the
/// project has no folder configured.
pub async fn list_yaml_pipelines(
    client: &DevOpsClient,
    ctx: &ProjectContext,
) -> Result<Vec<YamlPipeline>> {
    let url = ctx.url(YAML_PIPELINES, &[])?;
    let response: ListResponse<Pipeline> = client.get_json(YAML_PIPELINES, &url).await?;

    let wanted = ctx
        .project
        .yaml_pipelines_path
        .as_deref()
        .map(normalize_folder);

    Ok(response
        .value
        .into_iter()
        .filter(|pipeline| match &wanted {
            None => true,
            Some(wanted) => pipeline
                .folder
                .as_deref()
                .map(normalize_folder)
                .is_some_and(|folder| folder.starts_with(wanted.as_str())),
        })
        .map(|pipeline| YamlPipeline {
            id: pipeline.id,
            name: pipeline.name,
            folder: pipeline.folder,
            url: pipeline.links.web.map(|link| link.href),
        })
        .collect())
}
