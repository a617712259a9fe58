use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::ids::{ApplicantId, PipelineId, StepId};
use crate::workflows::store::RepositoryError;

/// Error raised by the admission workflow and pipeline catalog.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("step {step_id} does not belong to pipeline {pipeline_id}")]
    InvalidStep {
        step_id: StepId,
        pipeline_id: PipelineId,
    },
    #[error("required documents missing for the target step: {}", .missing.join(", "))]
    DocumentsIncomplete { missing: Vec<String> },
    #[error("required details missing on the current step: {}", .missing.join(", "))]
    DetailsIncomplete { missing: Vec<String> },
    #[error("applicant {applicant_id} was moved by another request; reload and retry")]
    Conflict { applicant_id: ApplicantId },
    #[error("storage failure: {0}")]
    Storage(#[source] RepositoryError),
}

impl AdmissionError {
    pub(crate) fn not_found(entity: &'static str, id: u64) -> Self {
        AdmissionError::NotFound { entity, id }
    }

    /// Stable machine-readable error code.
    pub const fn kind(&self) -> &'static str {
        match self {
            AdmissionError::Validation(_) => "validation_error",
            AdmissionError::NotFound { .. } => "not_found",
            AdmissionError::InvalidStep { .. } => "invalid_step",
            AdmissionError::DocumentsIncomplete { .. } => "documents_incomplete",
            AdmissionError::DetailsIncomplete { .. } => "details_incomplete",
            AdmissionError::Conflict { .. } => "conflict",
            AdmissionError::Storage(_) => "storage_failure",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            AdmissionError::Validation(_)
            | AdmissionError::InvalidStep { .. }
            | AdmissionError::DocumentsIncomplete { .. }
            | AdmissionError::DetailsIncomplete { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AdmissionError::NotFound { .. } => StatusCode::NOT_FOUND,
            AdmissionError::Conflict { .. } => StatusCode::CONFLICT,
            AdmissionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Keys blocking a move, if the error is a completeness failure.
    pub fn missing(&self) -> Option<&[String]> {
        match self {
            AdmissionError::DocumentsIncomplete { missing }
            | AdmissionError::DetailsIncomplete { missing } => Some(missing),
            _ => None,
        }
    }
}

impl From<RepositoryError> for AdmissionError {
    fn from(err: RepositoryError) -> Self {
        error!(error = %err, "admission storage failure");
        AdmissionError::Storage(err)
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let Some(missing) = self.missing() {
            body["missing"] = json!(missing);
        }
        (self.status_code(), Json(body)).into_response()
    }
}
