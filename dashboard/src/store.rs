//! Project registry and URL template storage.
//!
//! The filesystem layout under the data directory is:
//!
//! ```text
//! projects.json          [{"projectName": ..., "path": ..., "teamName": ...}, ...]
//! <projectName>/urls.json
//! ```
//!
//! Both files are read from disk on every call; nothing is cached.
use crate::project::{Project, is_valid_project_name};
use crate::templates::UrlTemplateSet;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const PROJECTS_FILE: &str = "projects.json";
const URLS_FILE: &str = "urls.json";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid project name: {0:?}")]
    InvalidName(String),
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// All registered projects, empty if the registry does not exist yet.
    async fn load_projects(&self) -> Result<Vec<Project>, StoreError>;

    /// The project's URL templates, `None` if it has no template file.
    async fn load_templates(&self, project_name: &str)
    -> Result<Option<UrlTemplateSet>, StoreError>;

    /// Register the project and write its templates if no project with the
    /// same name exists. An existing project's templates are left untouched.
    /// Returns whether the registry was changed.
    async fn save_project(
        &self,
        project: &Project,
        templates: &UrlTemplateSet,
    ) -> Result<bool, StoreError>;

    async fn find_project(&self, project_name: &str) -> Result<Option<Project>, StoreError> {
        Ok(self
            .load_projects()
            .await?
            .into_iter()
            .find(|p| p.project_name == project_name))
    }
}

pub struct FilesystemProjectStore {
    base_dir: PathBuf,
    // Serializes read-modify-write cycles of projects.json within this process.
    write_lock: Mutex<()>,
}

impl FilesystemProjectStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FilesystemProjectStore {
            base_dir: base_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn projects_path(&self) -> PathBuf {
        self.base_dir.join(PROJECTS_FILE)
    }

    fn urls_path(&self, project_name: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_project_name(project_name) {
            return Err(StoreError::InvalidName(project_name.to_string()));
        }
        Ok(self.base_dir.join(project_name).join(URLS_FILE))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, data)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[async_trait]
impl ProjectStore for FilesystemProjectStore {
    async fn load_projects(&self) -> Result<Vec<Project>, StoreError> {
        Ok(read_json(&self.projects_path()).await?.unwrap_or_default())
    }

    async fn load_templates(
        &self,
        project_name: &str,
    ) -> Result<Option<UrlTemplateSet>, StoreError> {
        read_json(&self.urls_path(project_name)?).await
    }

    async fn save_project(
        &self,
        project: &Project,
        templates: &UrlTemplateSet,
    ) -> Result<bool, StoreError> {
        let urls_path = self.urls_path(&project.project_name)?;
        let _guard = self.write_lock.lock().await;

        let mut projects = self.load_projects().await?;
        if projects
            .iter()
            .any(|p| p.project_name == project.project_name)
        {
            tracing::info!(project = %project.project_name, "Project already registered");
            return Ok(false);
        }

        write_json(&urls_path, templates).await?;
        projects.push(project.clone());
        write_json(&self.projects_path(), &projects).await?;
        tracing::info!(
            project = %project.project_name,
            path = ?self.base_dir,
            "Registered project"
        );
        Ok(true)
    }
}
