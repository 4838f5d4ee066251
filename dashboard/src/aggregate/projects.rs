use crate::config::UpstreamSettings;
use crate::context::ProjectContext;
use crate::errors::{DashboardError, Result};
use crate::metrics_defs::PROJECTS_REGISTERED;
use crate::project::{
    Project, ProjectCreateRequest, is_valid_project_name, normalize_tags, scrape_definition_ids,
};
use crate::store::ProjectStore;
use crate::templates::{UrlTemplateSet, WIQL_URL, render};
use serde::Serialize;
use serde_json::Value;
use shared::gauge;

#[derive(Debug, Serialize)]
pub struct ProjectInfo {
    pub project: Project,
    pub urls: UrlTemplateSet,
}

#[derive(Debug, Serialize)]
pub struct CreateProjectResponse {
    pub success: bool,
    /// False when a project with the same name was already registered
    pub created: bool,
    pub project: Project,
}

pub async fn list_projects(store: &dyn ProjectStore) -> Result<Vec<String>> {
    let projects = store.load_projects().await?;
    gauge!(PROJECTS_REGISTERED).set(projects.len() as f64);

    Ok(projects
        .into_iter()
        .map(|project| project.project_name)
        .collect())
}

pub async fn project_info(store: &dyn ProjectStore, project_name: &str) -> Result<ProjectInfo> {
    let ctx = ProjectContext::load(store, project_name).await?;
    Ok(ProjectInfo {
        project: ctx.project,
        urls: ctx.templates,
    })
}

pub async fn create_project(
    store: &dyn ProjectStore,
    upstream: &UpstreamSettings,
    request: ProjectCreateRequest,
) -> Result<CreateProjectResponse> {
    let project_name = request.project_name.trim();
    if project_name.is_empty() {
        return Err(DashboardError::MissingParameter("project_name"));
    }
    if !is_valid_project_name(project_name) {
        return Err(DashboardError::InvalidParameter {
            name: "project_name",
            reason: "must not contain path separators".into(),
        });
    }
    if request.team_name.trim().is_empty() {
        return Err(DashboardError::MissingParameter("teamName"));
    }
    if request.path.trim().is_empty() {
        return Err(DashboardError::MissingParameter("path"));
    }

    let mut templates = UrlTemplateSet::defaults(upstream);
    if let Some(query_id) = request
        .release_plan_query_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        if let Some(Value::String(url)) = templates.urls.get_mut(WIQL_URL) {
            let rendered = render(url, &[("queryId", query_id)]);
            *url = rendered;
        }
    }
    templates.definition_ids =
        scrape_definition_ids(request.pipelines.iter().chain(request.releases.iter()));
    templates.tags = normalize_tags(&request.tags);
    templates.pipelines = request.pipelines;
    templates.releases = request.releases;

    let project = Project {
        project_name: project_name.to_string(),
        path: request.path.trim().trim_start_matches('\\').to_string(),
        team_name: request.team_name.trim().to_string(),
        yaml_pipelines_path: request
            .yaml_pipelines_path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    };

    let created = store.save_project(&project, &templates).await?;
    Ok(CreateProjectResponse {
        success: true,
        created,
        project,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FilesystemProjectStore;
    use crate::templates::ALL_RELEASES;
    use crate::testutils::upstream;

    fn request(name: &str) -> ProjectCreateRequest {
        ProjectCreateRequest {
            project_name: name.into(),
            pipelines: vec![
                "https://dev.azure.com/org/proj/_release?_a=releases&view=mine&definitionId=12"
                    .into(),
            ],
            releases: vec!["https://dev.azure.com/org/proj/_release?definitionId=31".into()],
            team_name: "Team".into(),
            path: "\\TestProj".into(),
            tags: vec!["web".into(), " web ".into()],
            release_plan_query_id: Some("f15729e0".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_info() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemProjectStore::new(dir.path());

        let response = create_project(&store, &upstream(), request("TestProj"))
            .await
            .unwrap();
        assert!(response.success);
        assert!(response.created);
        assert_eq!(response.project.path, "TestProj");

        let info = project_info(&store, "TestProj").await.unwrap();
        assert_eq!(info.project, response.project);
        assert_eq!(info.urls.definition_ids, vec![12, 31]);
        assert_eq!(info.urls.tags, vec!["web"]);
        assert_eq!(info.urls.pipelines.len(), 1);
        assert_eq!(
            info.urls.get(ALL_RELEASES),
            Some("https://vsrm.dev.azure.com/org/proj/_apis/release/releases")
        );
        assert!(info.urls.get(WIQL_URL).unwrap().contains("/wiql/f15729e0?"));

        assert_eq!(list_projects(&store).await.unwrap(), vec!["TestProj"]);
    }

    #[tokio::test]
    async fn test_create_twice_registers_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemProjectStore::new(dir.path());

        create_project(&store, &upstream(), request("TestProj"))
            .await
            .unwrap();
        let second = create_project(&store, &upstream(), request("TestProj"))
            .await
            .unwrap();
        assert!(second.success);
        assert!(!second.created);
        assert_eq!(list_projects(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_again_keeps_edited_templates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemProjectStore::new(dir.path());

        create_project(&store, &upstream(), request("TestProj"))
            .await
            .unwrap();

        let urls_path = dir.path().join("TestProj").join("urls.json");
        let mut edited: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&urls_path).unwrap()).unwrap();
        edited["custom-endpoint"] = "https://example.com/custom".into();
        std::fs::write(&urls_path, serde_json::to_vec(&edited).unwrap()).unwrap();

        let mut again = request("TestProj");
        again.team_name = "Other".into();
        again.pipelines.clear();
        again.releases.clear();
        again.tags.clear();
        let second = create_project(&store, &upstream(), again).await.unwrap();
        assert!(!second.created);

        let info = project_info(&store, "TestProj").await.unwrap();
        assert_eq!(info.project.team_name, "Team");
        assert_eq!(
            info.urls.get("custom-endpoint"),
            Some("https://example.com/custom")
        );
        assert_eq!(info.urls.definition_ids, vec![12, 31]);
        assert_eq!(info.urls.tags, vec!["web"]);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemProjectStore::new(dir.path());

        let err = create_project(&store, &upstream(), request(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::MissingParameter("project_name")));

        let err = create_project(&store, &upstream(), request("a/b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidParameter { .. }));

        let mut missing_team = request("TestProj");
        missing_team.team_name = "".into();
        let err = create_project(&store, &upstream(), missing_team)
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::MissingParameter("teamName")));

        assert!(list_projects(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_project_info_unknown_project() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemProjectStore::new(dir.path());

        let err = project_info(&store, "Nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Project 'Nope' not found");
    }
}
