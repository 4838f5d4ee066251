use crate::aggregate::{
    approvals, iterations, pipelines, projects, release_work_items, test_plans, timelines,
    work_items,
};
use crate::config::UpstreamSettings;
use crate::context::ProjectContext;
use crate::errors::{DashboardError, Result};
use crate::project::ProjectCreateRequest;
use crate::store::ProjectStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use azure_client::DevOpsClient;
use serde::{Deserialize, Serialize};
use shared::listener::Listener;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state of the API handlers.
#[derive(Clone)]
pub struct Dashboard {
    store: Arc<dyn ProjectStore>,
    client: DevOpsClient,
    upstream: Arc<UpstreamSettings>,
}

impl Dashboard {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        client: DevOpsClient,
        upstream: UpstreamSettings,
    ) -> Self {
        Dashboard {
            store,
            client,
            upstream: Arc::new(upstream),
        }
    }

    async fn context(&self, project: Option<String>) -> Result<ProjectContext> {
        let project = require("project", project)?;
        ProjectContext::load(self.store.as_ref(), &project).await
    }
}

pub fn router(dashboard: Dashboard) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", get(list_projects))
        .route("/api/project-info", get(project_info))
        .route("/api/create-project", post(create_project))
        .route("/api/releases", get(releases))
        .route("/api/sprints", get(sprints))
        .route("/api/pipelines", get(pipeline_releases))
        .route("/api/release-work-items", get(release_work_items))
        .route("/api/iteration-work-items", get(iteration_work_items))
        .route("/api/release-plan-work-items", get(release_plan_work_items))
        .route("/api/test-summary", get(test_summary))
        .route("/api/yaml-approvals", get(yaml_approvals))
        .route("/api/build-timelines", get(build_timelines))
        .route("/api/release-approvals", get(release_approvals))
        .route("/api/yaml-pipelines", get(yaml_pipelines))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(dashboard)
}

pub async fn serve(listener: &Listener, dashboard: Dashboard) -> Result<()> {
    let addr = listener.addr();
    let tcp = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Dashboard API listening");

    axum::serve(tcp, router(dashboard))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

/// Query parameters are all optional at extraction time so that a missing
/// one is reported in the usual `{"detail": ...}` shape.
fn require(name: &'static str, value: Option<String>) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(DashboardError::MissingParameter(name))
}

#[derive(Debug, Deserialize)]
struct ProjectParams {
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectInfoParams {
    project_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PipelineParams {
    project: Option<String>,
    #[serde(rename = "startDate")]
    start_date: Option<String>,
    #[serde(rename = "endDate")]
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseParams {
    project: Option<String>,
    #[serde(rename = "releaseId")]
    release_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IterationParams {
    project: Option<String>,
    iteration_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SprintParams {
    project: Option<String>,
    sprint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserParams {
    project: Option<String>,
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildParams {
    project: Option<String>,
    #[serde(rename = "buildIds")]
    build_ids: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn list_projects(State(dashboard): State<Dashboard>) -> Result<Json<Vec<String>>> {
    Ok(Json(projects::list_projects(dashboard.store.as_ref()).await?))
}

async fn project_info(
    State(dashboard): State<Dashboard>,
    Query(params): Query<ProjectInfoParams>,
) -> Result<Json<projects::ProjectInfo>> {
    let name = require("project_name", params.project_name)?;
    Ok(Json(
        projects::project_info(dashboard.store.as_ref(), &name).await?,
    ))
}

async fn create_project(
    State(dashboard): State<Dashboard>,
    body: std::result::Result<Json<ProjectCreateRequest>, JsonRejection>,
) -> Result<Json<projects::CreateProjectResponse>> {
    let Json(request) = body.map_err(|e| DashboardError::InvalidBody(e.body_text()))?;
    let response =
        projects::create_project(dashboard.store.as_ref(), &dashboard.upstream, request).await?;
    if response.created {
        tracing::info!(project = %response.project.project_name, "Registered project");
    }
    Ok(Json(response))
}

async fn releases(
    State(dashboard): State<Dashboard>,
    Query(params): Query<ProjectParams>,
) -> Result<Json<Vec<iterations::IterationSummary>>> {
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(iterations::list_releases(&dashboard.client, &ctx).await?))
}

async fn sprints(
    State(dashboard): State<Dashboard>,
    Query(params): Query<ProjectParams>,
) -> Result<Json<Vec<iterations::SprintSummary>>> {
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(iterations::list_sprints(&dashboard.client, &ctx).await?))
}

async fn pipeline_releases(
    State(dashboard): State<Dashboard>,
    Query(params): Query<PipelineParams>,
) -> Result<Json<Vec<pipelines::PipelineRelease>>> {
    let start = require("startDate", params.start_date)?;
    let end = require("endDate", params.end_date)?;
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(
        pipelines::list_pipeline_releases(&dashboard.client, &ctx, &start, &end).await?,
    ))
}

async fn release_work_items(
    State(dashboard): State<Dashboard>,
    Query(params): Query<ReleaseParams>,
) -> Result<Json<Vec<release_work_items::ReleaseWorkItem>>> {
    let raw = require("releaseId", params.release_id)?;
    let release_id: u64 = raw.parse().map_err(|_| DashboardError::InvalidParameter {
        name: "releaseId",
        reason: format!("'{raw}' is not a release id"),
    })?;
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(
        release_work_items::release_work_items(&dashboard.client, &ctx, release_id).await?,
    ))
}

async fn iteration_work_items(
    State(dashboard): State<Dashboard>,
    Query(params): Query<IterationParams>,
) -> Result<Json<Vec<work_items::IterationWorkItem>>> {
    let iteration_id = require("iteration_id", params.iteration_id)?;
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(
        work_items::iteration_work_items(&dashboard.client, &ctx, &iteration_id).await?,
    ))
}

async fn release_plan_work_items(
    State(dashboard): State<Dashboard>,
    Query(params): Query<ProjectParams>,
) -> Result<Json<Vec<work_items::ReleasePlanWorkItem>>> {
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(
        work_items::release_plan_work_items(&dashboard.client, &ctx).await?,
    ))
}

async fn test_summary(
    State(dashboard): State<Dashboard>,
    Query(params): Query<SprintParams>,
) -> Result<Json<test_plans::TestSummary>> {
    let sprint = require("sprint", params.sprint)?;
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(
        test_plans::test_summary(&dashboard.client, &ctx, &sprint).await?,
    ))
}

async fn yaml_approvals(
    State(dashboard): State<Dashboard>,
    Query(params): Query<UserParams>,
) -> Result<Json<Vec<approvals::YamlApproval>>> {
    let user = require("user", params.user)?;
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(
        approvals::yaml_approvals(&dashboard.client, &ctx, &user).await?,
    ))
}

async fn build_timelines(
    State(dashboard): State<Dashboard>,
    Query(params): Query<BuildParams>,
) -> Result<Json<Vec<timelines::BuildTimeline>>> {
    let build_ids = timelines::parse_build_ids(&require("buildIds", params.build_ids)?)?;
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(
        timelines::build_timelines(&dashboard.client, &ctx, &build_ids).await?,
    ))
}

async fn release_approvals(
    State(dashboard): State<Dashboard>,
    Query(params): Query<ProjectParams>,
) -> Result<Json<Vec<approvals::ReleaseApprovalSummary>>> {
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(
        approvals::release_approvals(&dashboard.client, &ctx).await?,
    ))
}

async fn yaml_pipelines(
    State(dashboard): State<Dashboard>,
    Query(params): Query<ProjectParams>,
) -> Result<Json<Vec<pipelines::YamlPipeline>>> {
    let ctx = dashboard.context(params.project).await?;
    Ok(Json(
        pipelines::list_yaml_pipelines(&dashboard.client, &ctx).await?,
    ))
}
