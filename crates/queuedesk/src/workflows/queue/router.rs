use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::domain::{QueueEntry, TicketStatus, TicketView};
use super::error::QueueError;
use super::repository::TicketRepository;
use super::service::{CreateTicket, QueueFilter, QueueTicketService};
use crate::ids::{CounterId, ServiceId, StaffId, TicketId};
use crate::notifications::NotificationSink;

/// Router builder exposing ticket issuance, transitions, and the queue board.
pub fn ticket_router<R, N>(service: Arc<QueueTicketService<R, N>>) -> Router
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/services/:service_id/tickets",
            post(create_handler::<R, N>),
        )
        .route(
            "/api/v1/services/:service_id/queue",
            get(queue_handler::<R, N>),
        )
        .route("/api/v1/tickets/:ticket_id", get(ticket_handler::<R, N>))
        .route(
            "/api/v1/tickets/:ticket_id/claim",
            post(claim_handler::<R, N>),
        )
        .route(
            "/api/v1/tickets/:ticket_id/start",
            post(start_handler::<R, N>),
        )
        .route(
            "/api/v1/tickets/:ticket_id/resolve",
            post(resolve_handler::<R, N>),
        )
        .route(
            "/api/v1/tickets/:ticket_id/requeue",
            post(requeue_handler::<R, N>),
        )
        .route(
            "/api/v1/tickets/:ticket_id/no-show",
            post(no_show_handler::<R, N>),
        )
        .route(
            "/api/v1/tickets/:ticket_id/cancel",
            post(cancel_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClaimRequest {
    pub(crate) claimed_by: StaffId,
    #[serde(default)]
    pub(crate) customer_service_id: Option<CounterId>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NotesRequest {
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueueQuery {
    /// Comma separated statuses, e.g. `WAITING,CALLED`.
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) day: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

impl QueueQuery {
    fn into_filter(self) -> Result<QueueFilter, QueueError> {
        let statuses = match self.status {
            Some(raw) => Some(
                raw.split(',')
                    .filter(|part| !part.trim().is_empty())
                    .map(|part| part.parse::<TicketStatus>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|err| QueueError::Validation(err.to_string()))?,
            ),
            None => None,
        };
        Ok(QueueFilter {
            statuses,
            day: self.day,
            limit: self.limit,
        })
    }
}

fn notes(body: Option<Json<NotesRequest>>) -> Option<String> {
    body.and_then(|Json(request)| request.notes)
}

pub(crate) async fn create_handler<R, N>(
    State(service): State<Arc<QueueTicketService<R, N>>>,
    Path(service_id): Path<u64>,
    Json(request): Json<CreateTicket>,
) -> Response
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    match service.create(ServiceId(service_id), request) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn queue_handler<R, N>(
    State(service): State<Arc<QueueTicketService<R, N>>>,
    Path(service_id): Path<u64>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Vec<QueueEntry>>, QueueError>
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    let filter = query.into_filter()?;
    service.queue(ServiceId(service_id), filter).map(Json)
}

pub(crate) async fn ticket_handler<R, N>(
    State(service): State<Arc<QueueTicketService<R, N>>>,
    Path(ticket_id): Path<u64>,
) -> Result<Json<TicketView>, QueueError>
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    service.get(TicketId(ticket_id)).map(Json)
}

pub(crate) async fn claim_handler<R, N>(
    State(service): State<Arc<QueueTicketService<R, N>>>,
    Path(ticket_id): Path<u64>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<TicketView>, QueueError>
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    service
        .claim(
            TicketId(ticket_id),
            request.claimed_by,
            request.customer_service_id,
        )
        .map(Json)
}

pub(crate) async fn start_handler<R, N>(
    State(service): State<Arc<QueueTicketService<R, N>>>,
    Path(ticket_id): Path<u64>,
) -> Result<Json<TicketView>, QueueError>
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    service.start(TicketId(ticket_id)).map(Json)
}

pub(crate) async fn resolve_handler<R, N>(
    State(service): State<Arc<QueueTicketService<R, N>>>,
    Path(ticket_id): Path<u64>,
    body: Option<Json<NotesRequest>>,
) -> Result<Json<TicketView>, QueueError>
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    service.resolve(TicketId(ticket_id), notes(body)).map(Json)
}

pub(crate) async fn requeue_handler<R, N>(
    State(service): State<Arc<QueueTicketService<R, N>>>,
    Path(ticket_id): Path<u64>,
    body: Option<Json<NotesRequest>>,
) -> Result<Json<TicketView>, QueueError>
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    service.requeue(TicketId(ticket_id), notes(body)).map(Json)
}

pub(crate) async fn no_show_handler<R, N>(
    State(service): State<Arc<QueueTicketService<R, N>>>,
    Path(ticket_id): Path<u64>,
) -> Result<Json<TicketView>, QueueError>
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    service.no_show(TicketId(ticket_id)).map(Json)
}

pub(crate) async fn cancel_handler<R, N>(
    State(service): State<Arc<QueueTicketService<R, N>>>,
    Path(ticket_id): Path<u64>,
    body: Option<Json<NotesRequest>>,
) -> Result<Json<TicketView>, QueueError>
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    service.cancel(TicketId(ticket_id), notes(body)).map(Json)
}
