use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::domain::{TicketAction, TicketStatus};
use super::settings::BusinessHours;
use crate::ids::ServiceId;
use crate::workflows::store::RepositoryError;

/// Error raised by the ticket lifecycle engine.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("cannot {action} a ticket that is {from}")]
    InvalidTransition {
        action: TicketAction,
        from: TicketStatus,
    },
    #[error("tickets can only be issued between {window}")]
    OutOfHours { window: BusinessHours },
    #[error("service {service_id} is not served by any active queue group")]
    NotRoutable { service_id: ServiceId },
    #[error("storage failure: {0}")]
    Storage(#[source] RepositoryError),
}

impl QueueError {
    /// Stable machine-readable error code.
    pub const fn kind(&self) -> &'static str {
        match self {
            QueueError::Validation(_) => "validation_error",
            QueueError::NotFound { .. } => "not_found",
            QueueError::InvalidTransition { .. } => "invalid_transition",
            QueueError::OutOfHours { .. } => "out_of_hours",
            QueueError::NotRoutable { .. } => "not_routable",
            QueueError::Storage(_) => "storage_failure",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            QueueError::Validation(_)
            | QueueError::OutOfHours { .. }
            | QueueError::NotRoutable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            QueueError::NotFound { .. } => StatusCode::NOT_FOUND,
            QueueError::InvalidTransition { .. } => StatusCode::CONFLICT,
            QueueError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for QueueError {
    fn from(err: RepositoryError) -> Self {
        error!(error = %err, "ticket storage failure");
        QueueError::Storage(err)
    }
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let QueueError::InvalidTransition { from, .. } = &self {
            body["status"] = json!(from);
        }
        (self.status_code(), Json(body)).into_response()
    }
}
