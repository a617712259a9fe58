use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use super::domain::{
    Applicant, ApplicantDetail, ApplicantDocument, ApplicantHistory, ApplicantProgress, Step,
    StepDynamicDetail, StepRequirement,
};
use super::error::AdmissionError;
use super::pipeline::{
    DetailSpec, NewPipeline, NewStep, PipelineCatalog, PipelineStepGraph, StepSchema, StepUpdate,
};
use super::repository::AdmissionStore;
use super::service::{AdmissionWorkflowEngine, EnrollApplicant, MoveApplicant};
use crate::ids::{ApplicantId, PipelineId, StepId};
use crate::notifications::NotificationSink;

pub(crate) struct AdmissionHandles<S, N> {
    catalog: Arc<PipelineCatalog<S>>,
    engine: Arc<AdmissionWorkflowEngine<S, N>>,
}

impl<S, N> Clone for AdmissionHandles<S, N> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            engine: self.engine.clone(),
        }
    }
}

/// Router builder exposing pipeline administration and applicant progression.
pub fn admission_router<S, N>(
    catalog: Arc<PipelineCatalog<S>>,
    engine: Arc<AdmissionWorkflowEngine<S, N>>,
) -> Router
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route("/api/v1/pipelines", post(create_pipeline_handler::<S, N>))
        .route("/api/v1/pipelines/:pipeline_id", get(pipeline_handler::<S, N>))
        .route(
            "/api/v1/pipelines/:pipeline_id/steps",
            post(add_step_handler::<S, N>),
        )
        .route(
            "/api/v1/pipelines/:pipeline_id/applicants",
            post(enroll_handler::<S, N>),
        )
        .route(
            "/api/v1/steps/:step_id",
            get(step_handler::<S, N>)
                .put(update_step_handler::<S, N>)
                .delete(remove_step_handler::<S, N>),
        )
        .route(
            "/api/v1/steps/:step_id/requirements",
            put(requirements_handler::<S, N>),
        )
        .route(
            "/api/v1/steps/:step_id/details",
            put(details_schema_handler::<S, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id",
            get(progress_handler::<S, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/details/:key",
            put(set_detail_handler::<S, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/documents/:doc_key",
            put(register_document_handler::<S, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/move",
            post(move_handler::<S, N>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/history",
            get(history_handler::<S, N>),
        )
        .with_state(AdmissionHandles { catalog, engine })
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequirementsRequest {
    pub(crate) doc_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailsSchemaRequest {
    pub(crate) details: Vec<DetailSpec>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailValueRequest {
    pub(crate) value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentRequest {
    pub(crate) storage_ref: String,
}

pub(crate) async fn create_pipeline_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Json(request): Json<NewPipeline>,
) -> Response
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    match handles.catalog.create_pipeline(request) {
        Ok(pipeline) => (StatusCode::CREATED, Json(pipeline)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn pipeline_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(pipeline_id): Path<u64>,
) -> Result<Json<PipelineStepGraph>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles.catalog.pipeline(PipelineId(pipeline_id)).map(Json)
}

pub(crate) async fn add_step_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(pipeline_id): Path<u64>,
    Json(request): Json<NewStep>,
) -> Response
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    match handles.catalog.add_step(PipelineId(pipeline_id), request) {
        Ok(step) => (StatusCode::CREATED, Json(step)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn step_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(step_id): Path<u64>,
) -> Result<Json<StepSchema>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles.catalog.step_schema(StepId(step_id)).map(Json)
}

pub(crate) async fn update_step_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(step_id): Path<u64>,
    Json(update): Json<StepUpdate>,
) -> Result<Json<Step>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles.catalog.update_step(StepId(step_id), update).map(Json)
}

pub(crate) async fn remove_step_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(step_id): Path<u64>,
) -> Result<StatusCode, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles.catalog.remove_step(StepId(step_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn requirements_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(step_id): Path<u64>,
    Json(request): Json<RequirementsRequest>,
) -> Result<Json<Vec<StepRequirement>>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles
        .catalog
        .set_requirements(StepId(step_id), request.doc_keys)
        .map(Json)
}

pub(crate) async fn details_schema_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(step_id): Path<u64>,
    Json(request): Json<DetailsSchemaRequest>,
) -> Result<Json<Vec<StepDynamicDetail>>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles
        .catalog
        .set_dynamic_details(StepId(step_id), request.details)
        .map(Json)
}

pub(crate) async fn enroll_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(pipeline_id): Path<u64>,
    Json(request): Json<EnrollApplicant>,
) -> Response
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    match handles.engine.enroll(PipelineId(pipeline_id), request) {
        Ok(applicant) => (StatusCode::CREATED, Json(applicant)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn progress_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(applicant_id): Path<u64>,
) -> Result<Json<ApplicantProgress>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles.engine.progress(ApplicantId(applicant_id)).map(Json)
}

pub(crate) async fn set_detail_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path((applicant_id, key)): Path<(u64, String)>,
    Json(request): Json<DetailValueRequest>,
) -> Result<Json<ApplicantDetail>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles
        .engine
        .set_detail(ApplicantId(applicant_id), &key, request.value)
        .map(Json)
}

pub(crate) async fn register_document_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path((applicant_id, doc_key)): Path<(u64, String)>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<ApplicantDocument>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles
        .engine
        .register_document(ApplicantId(applicant_id), &doc_key, request.storage_ref)
        .map(Json)
}

pub(crate) async fn move_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(applicant_id): Path<u64>,
    Json(request): Json<MoveApplicant>,
) -> Result<Json<Applicant>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles
        .engine
        .move_applicant(ApplicantId(applicant_id), request)
        .map(Json)
}

pub(crate) async fn history_handler<S, N>(
    State(handles): State<AdmissionHandles<S, N>>,
    Path(applicant_id): Path<u64>,
) -> Result<Json<Vec<ApplicantHistory>>, AdmissionError>
where
    S: AdmissionStore + 'static,
    N: NotificationSink + 'static,
{
    handles.engine.history(ApplicantId(applicant_id)).map(Json)
}
