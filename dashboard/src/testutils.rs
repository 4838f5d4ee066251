use crate::config::UpstreamSettings;
use crate::context::ProjectContext;
use crate::project::Project;
use crate::templates::UrlTemplateSet;
use azure_client::DevOpsClient;

const UPSTREAM_HOSTS: &[&str] = &[
    "https://vsrm.dev.azure.com",
    "https://vssps.dev.azure.com",
    "https://dev.azure.com",
];

pub fn upstream() -> UpstreamSettings {
    UpstreamSettings {
        organization: "org".into(),
        project: "proj".into(),
    }
}

/// Default templates with every Azure DevOps host pointed at `base_url`, so
/// paths look like `/org/proj/_apis/...`.
pub fn mock_templates(base_url: &str) -> UrlTemplateSet {
    let mut templates = UrlTemplateSet::defaults(&upstream());
    for url in templates.urls.values_mut() {
        let serde_json::Value::String(url) = url else {
            continue;
        };
        for host in UPSTREAM_HOSTS {
            if url.starts_with(host) {
                *url = url.replacen(host, base_url, 1);
                break;
            }
        }
    }
    templates
}

pub fn mock_context(base_url: &str) -> ProjectContext {
    ProjectContext {
        project: Project {
            project_name: "CHMP".into(),
            path: "CHMP".into(),
            team_name: "CHMP-Team".into(),
            yaml_pipelines_path: None,
        },
        templates: mock_templates(base_url),
    }
}

pub fn client() -> DevOpsClient {
    DevOpsClient::new("test-token").unwrap()
}
