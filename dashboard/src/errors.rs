use crate::metrics_defs::API_ERRORS;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use azure_client::ClientError;
use serde::Serialize;
use shared::counter;
use thiserror::Error;

/// Result type alias for dashboard operations
pub type Result<T, E = DashboardError> = std::result::Result<T, E>;

/// Errors surfaced to API callers as `{"detail": "<message>"}`
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("URL configuration for project '{0}' not found")]
    TemplatesNotFound(String),

    #[error("URL template '{name}' is not configured for project '{project}'")]
    MissingTemplate { project: String, name: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("No test plan found for sprint '{0}'")]
    TestPlanNotFound(String),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] ClientError),

    #[error("Project store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DashboardError::ProjectNotFound(_)
            | DashboardError::TemplatesNotFound(_)
            | DashboardError::TestPlanNotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::MissingParameter(_)
            | DashboardError::InvalidParameter { .. }
            | DashboardError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            DashboardError::MissingTemplate { .. }
            | DashboardError::Upstream(_)
            | DashboardError::Store(_)
            | DashboardError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    detail: String,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        counter!(API_ERRORS, "status" => status.as_u16().to_string()).increment(1);

        let body = Json(ApiErrorResponse {
            detail: self.to_string(),
        });

        (status, body).into_response()
    }
}
