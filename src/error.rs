use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::integrations::Platform;

#[derive(Error, Debug)]
pub enum AcademyError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} is not connected")]
    IntegrationNotConnected(Platform),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AcademyResult<T> = Result<T, AcademyError>;

impl AcademyError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::IntegrationNotConnected(_) => (StatusCode::CONFLICT, "INTEGRATION_NOT_CONNECTED"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<serde_json::Error> for AcademyError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(format!("serialization: {e}"))
    }
}

impl IntoResponse for AcademyError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}
