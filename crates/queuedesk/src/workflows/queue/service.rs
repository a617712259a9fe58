use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use super::directory::{Service, ServiceDirectory};
use super::domain::{
    normalize_notes, CustomerRef, NewTicket, QueueEntry, QueueTicket, TicketAction,
    TicketCommand, TicketStatus, TicketView,
};
use super::error::QueueError;
use super::numbering::TicketNumberGenerator;
use super::repository::TicketRepository;
use super::settings::SettingsStore;
use crate::clock::Clock;
use crate::ids::{CounterId, CustomerId, QueueCustomerId, ServiceId, StaffId, TicketId};
use crate::notifications::{Notification, NotificationSink};
use crate::workflows::store::Guarded;

/// Ticket creation payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTicket {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub queue_customer_id: Option<QueueCustomerId>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateTicket {
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Self::default()
        }
    }

    pub fn for_queue_customer(queue_customer_id: QueueCustomerId) -> Self {
        Self {
            queue_customer_id: Some(queue_customer_id),
            ..Self::default()
        }
    }

    fn customer_ref(&self) -> Result<CustomerRef, QueueError> {
        match (self.customer_id, self.queue_customer_id) {
            (Some(id), None) => Ok(CustomerRef::Customer(id)),
            (None, Some(id)) => Ok(CustomerRef::QueueCustomer(id)),
            (Some(_), Some(_)) => Err(QueueError::Validation(
                "provide either customer_id or queue_customer_id, not both".to_string(),
            )),
            (None, None) => Err(QueueError::Validation(
                "one of customer_id or queue_customer_id is required".to_string(),
            )),
        }
    }
}

/// Board filter for [`QueueTicketService::queue`].
#[derive(Debug, Clone, Default)]
pub struct QueueFilter {
    /// Defaults to WAITING, CALLED and IN_SERVICE.
    pub statuses: Option<Vec<TicketStatus>>,
    /// Defaults to today (UTC).
    pub day: Option<NaiveDate>,
    pub limit: Option<usize>,
}

/// Issues tickets and governs every status transition.
pub struct QueueTicketService<R, N> {
    directory: Arc<dyn ServiceDirectory>,
    numbers: TicketNumberGenerator<R>,
    tickets: Arc<R>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<R, N> QueueTicketService<R, N>
where
    R: TicketRepository + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        directory: Arc<dyn ServiceDirectory>,
        settings: Arc<dyn SettingsStore>,
        tickets: Arc<R>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let numbers = TicketNumberGenerator::new(directory.clone(), settings, tickets.clone());
        Self {
            directory,
            numbers,
            tickets,
            notifier,
            clock,
        }
    }

    /// Issue a WAITING ticket for the service.
    pub fn create(
        &self,
        service_id: ServiceId,
        request: CreateTicket,
    ) -> Result<TicketView, QueueError> {
        let customer = request.customer_ref()?;
        let service = self.active_service(service_id)?;

        let now = self.clock.now();
        let issued = self.numbers.issue(&service, now)?;

        let ticket = self.tickets.insert(NewTicket {
            service_id,
            number: issued.number,
            sequence: issued.sequence,
            building_code: issued.building_code,
            queuegroup_code: issued.queuegroup_code,
            customer,
            created_at: now,
            notes: normalize_notes(request.notes),
        })?;

        info!(
            ticket_id = %ticket.id,
            service_id = %service_id,
            number = %ticket.number,
            "ticket issued"
        );
        self.publish_service_event(&ticket, "ticket.created");
        self.view(ticket)
    }

    pub fn claim(
        &self,
        id: TicketId,
        by: StaffId,
        desk: Option<CounterId>,
    ) -> Result<TicketView, QueueError> {
        self.transition(id, TicketCommand::Claim { by, desk })
    }

    pub fn start(&self, id: TicketId) -> Result<TicketView, QueueError> {
        self.transition(id, TicketCommand::Start)
    }

    pub fn resolve(&self, id: TicketId, notes: Option<String>) -> Result<TicketView, QueueError> {
        self.transition(id, TicketCommand::Resolve { notes })
    }

    pub fn no_show(&self, id: TicketId) -> Result<TicketView, QueueError> {
        self.transition(id, TicketCommand::NoShow)
    }

    pub fn requeue(&self, id: TicketId, notes: Option<String>) -> Result<TicketView, QueueError> {
        self.transition(id, TicketCommand::Requeue { notes })
    }

    pub fn cancel(&self, id: TicketId, notes: Option<String>) -> Result<TicketView, QueueError> {
        self.transition(id, TicketCommand::Cancel { notes })
    }

    /// Fetch a ticket with its current queue position.
    pub fn get(&self, id: TicketId) -> Result<TicketView, QueueError> {
        let ticket = self
            .tickets
            .fetch(id)?
            .ok_or(QueueError::NotFound {
                entity: "ticket",
                id: id.0,
            })?;
        self.view(ticket)
    }

    /// Tickets of a service for one day, oldest first.
    pub fn queue(
        &self,
        service_id: ServiceId,
        filter: QueueFilter,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        let service = self
            .directory
            .service(service_id)?
            .ok_or(QueueError::NotFound {
                entity: "service",
                id: service_id.0,
            })?;

        let now = self.clock.now();
        let day = filter.day.unwrap_or_else(|| now.date_naive());
        let statuses = filter
            .statuses
            .filter(|statuses| !statuses.is_empty())
            .unwrap_or_else(|| TicketStatus::active().to_vec());

        let mut tickets = self.tickets.list(service_id, day, &statuses)?;
        if let Some(limit) = filter.limit {
            tickets.truncate(limit);
        }

        tickets
            .into_iter()
            .map(|ticket| {
                let waited_minutes = (now - ticket.created_at).num_minutes().max(0);
                let sla_breached = ticket.status == TicketStatus::Waiting
                    && service.sla_warn_minutes > 0
                    && waited_minutes > i64::from(service.sla_warn_minutes);
                Ok(QueueEntry {
                    view: self.view(ticket)?,
                    waited_minutes,
                    sla_breached,
                })
            })
            .collect()
    }

    fn transition(&self, id: TicketId, command: TicketCommand) -> Result<TicketView, QueueError> {
        let action = command.action();
        let patch = command.patch(self.clock.now());

        match self.tickets.update_if_status(id, action.sources(), patch)? {
            Guarded::Applied(ticket) => {
                info!(
                    ticket_id = %ticket.id,
                    number = %ticket.number,
                    %action,
                    status = %ticket.status,
                    "ticket transitioned"
                );
                self.publish_service_event(&ticket, action.event());
                if action == TicketAction::Claim {
                    self.publish_ticket_event(&ticket, action.event());
                }
                self.view(ticket)
            }
            Guarded::Rejected(from) => {
                debug!(ticket_id = %id, %action, %from, "transition rejected");
                Err(QueueError::InvalidTransition { action, from })
            }
            Guarded::Missing => Err(QueueError::NotFound {
                entity: "ticket",
                id: id.0,
            }),
        }
    }

    fn active_service(&self, service_id: ServiceId) -> Result<Service, QueueError> {
        let service = self
            .directory
            .service(service_id)?
            .ok_or(QueueError::NotFound {
                entity: "service",
                id: service_id.0,
            })?;
        if !service.active {
            return Err(QueueError::NotRoutable { service_id });
        }
        Ok(service)
    }

    fn view(&self, ticket: QueueTicket) -> Result<TicketView, QueueError> {
        let position = if ticket.status == TicketStatus::Waiting {
            let ahead =
                self.tickets
                    .waiting_ahead(ticket.service_id, ticket.created_at, ticket.id)?;
            Some(ahead + 1)
        } else {
            None
        };
        Ok(TicketView { ticket, position })
    }

    fn publish_service_event(&self, ticket: &QueueTicket, event: &str) {
        self.notifier.emit(Notification::new(
            format!("service.{}", ticket.service_id),
            event,
            json!({
                "ticket_id": ticket.id,
                "number": ticket.number,
                "status": ticket.status,
            }),
            self.clock.now(),
        ));
    }

    fn publish_ticket_event(&self, ticket: &QueueTicket, event: &str) {
        self.notifier.emit(Notification::new(
            format!("ticket.{}", ticket.id),
            event,
            json!({
                "ticket_id": ticket.id,
                "number": ticket.number,
                "status": ticket.status,
                "claimed_by": ticket.claimed_by,
                "customer_service_id": ticket.customer_service_id,
            }),
            self.clock.now(),
        ));
    }
}
