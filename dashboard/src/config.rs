use serde::Deserialize;
use shared::listener::{Listener, ListenerError};
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_TOKEN_ENV: &str = "AZURE_PAT";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("invalid listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("data_dir cannot be empty")]
    EmptyDataDir,

    #[error("organization cannot be empty")]
    EmptyOrganization,

    #[error("project cannot be empty")]
    EmptyProject,

    #[error("token_env cannot be empty")]
    EmptyTokenEnv,
}

/// Dashboard service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the dashboard API
    #[serde(default)]
    pub listener: Listener,
    /// Directory holding `projects.json` and one sub-directory per project
    pub data_dir: PathBuf,
    /// Azure DevOps organization, substituted into new projects' URL templates
    pub organization: String,
    /// Azure DevOps project (URL-encoded), substituted into new projects' URL templates
    pub project: String,
    /// Environment variable holding the personal access token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;

        if self.data_dir.as_os_str().is_empty() {
            return Err(ValidationError::EmptyDataDir);
        }
        if self.organization.trim().is_empty() {
            return Err(ValidationError::EmptyOrganization);
        }
        if self.project.trim().is_empty() {
            return Err(ValidationError::EmptyProject);
        }
        if self.token_env.trim().is_empty() {
            return Err(ValidationError::EmptyTokenEnv);
        }
        Ok(())
    }

    pub fn upstream(&self) -> UpstreamSettings {
        UpstreamSettings {
            organization: self.organization.clone(),
            project: self.project.clone(),
        }
    }
}

/// Values substituted into the default URL templates when a project is created.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamSettings {
    pub organization: String,
    pub project: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
listener:
    host: "0.0.0.0"
    port: 8000
data_dir: ./data
organization: PSJH
project: Administrative%20Technology
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.listener.port, 8000);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.token_env, "AZURE_PAT");
        assert_eq!(
            config.upstream(),
            UpstreamSettings {
                organization: "PSJH".into(),
                project: "Administrative%20Technology".into(),
            }
        );
    }

    #[test]
    fn test_listener_defaults() {
        let config: Config =
            serde_yaml::from_str("{data_dir: data, organization: o, project: p}").unwrap();
        assert_eq!(config.listener, Listener::default());
    }

    #[test]
    fn test_validation_errors() {
        let base_config = Config {
            listener: Listener::default(),
            data_dir: PathBuf::from("data"),
            organization: "org".into(),
            project: "proj".into(),
            token_env: "AZURE_PAT".into(),
        };

        let mut config = base_config.clone();
        config.listener.port = 0;
        assert_eq!(
            config.validate(),
            Err(ValidationError::Listener(ListenerError::InvalidPort))
        );

        let mut config = base_config.clone();
        config.data_dir = PathBuf::new();
        assert_eq!(config.validate(), Err(ValidationError::EmptyDataDir));

        let mut config = base_config.clone();
        config.organization = " ".into();
        assert_eq!(config.validate(), Err(ValidationError::EmptyOrganization));

        let mut config = base_config.clone();
        config.project = "".into();
        assert_eq!(config.validate(), Err(ValidationError::EmptyProject));

        let mut config = base_config;
        config.token_env = "".into();
        assert_eq!(config.validate(), Err(ValidationError::EmptyTokenEnv));
    }

    #[test]
    fn test_deserialization_errors() {
        // Missing organization
        assert!(serde_yaml::from_str::<Config>("{data_dir: data, project: p}").is_err());
        // Invalid port type
        assert!(
            serde_yaml::from_str::<Config>(
                "{listener: {host: h, port: x}, data_dir: d, organization: o, project: p}"
            )
            .is_err()
        );
    }
}
