use crate::errors::{DashboardError, Result};
use crate::project::Project;
use crate::store::ProjectStore;
use crate::templates::UrlTemplateSet;

/// Configuration for one project, loaded fresh for each request and passed
/// explicitly into the aggregation functions.
#[derive(Clone, Debug)]
pub struct ProjectContext {
    pub project: Project,
    pub templates: UrlTemplateSet,
}

impl ProjectContext {
    pub async fn load(store: &dyn ProjectStore, project_name: &str) -> Result<Self> {
        let project = store
            .find_project(project_name)
            .await?
            .ok_or_else(|| DashboardError::ProjectNotFound(project_name.to_string()))?;

        let templates = store
            .load_templates(project_name)
            .await?
            .ok_or_else(|| DashboardError::TemplatesNotFound(project_name.to_string()))?;

        Ok(ProjectContext { project, templates })
    }

    /// Render a named URL template. The project's `teamName` is always
    /// available as a placeholder.
    pub fn url(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut all_params = Vec::with_capacity(params.len() + 1);
        all_params.extend_from_slice(params);
        all_params.push(("teamName", self.project.team_name.as_str()));

        self.templates
            .render(name, &all_params)
            .ok_or_else(|| DashboardError::MissingTemplate {
                project: self.project.project_name.clone(),
                name: name.to_string(),
            })
    }
}
