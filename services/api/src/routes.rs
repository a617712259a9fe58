use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use queuedesk::notifications::NotificationSink;
use queuedesk::workflows::admissions::{
    admission_router, AdmissionStore, AdmissionWorkflowEngine, PipelineCatalog,
};
use queuedesk::workflows::queue::{ticket_router, QueueTicketService, TicketRepository};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_workflow_routes<R, S, N>(
    tickets: Arc<QueueTicketService<R, N>>,
    catalog: Arc<PipelineCatalog<S>>,
    admissions: Arc<AdmissionWorkflowEngine<S, N>>,
) -> axum::Router
where
    R: TicketRepository + 'static,
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    ticket_router(tickets)
        .merge(admission_router(catalog, admissions))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
