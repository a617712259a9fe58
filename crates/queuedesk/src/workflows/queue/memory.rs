use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::domain::{NewTicket, QueueTicket, TicketPatch, TicketStatus};
use super::repository::TicketRepository;
use crate::ids::{ServiceId, TicketId};
use crate::workflows::store::{lock, Guarded, RepositoryError};

#[derive(Debug, Default)]
struct TicketState {
    last_id: u64,
    tickets: BTreeMap<TicketId, QueueTicket>,
    sequences: HashMap<(ServiceId, NaiveDate), u32>,
}

/// Ticket store holding every record behind one lock, so each trait call is atomic.
#[derive(Debug, Default)]
pub struct MemoryTicketStore {
    state: Mutex<TicketState>,
}

impl TicketRepository for MemoryTicketStore {
    fn allocate_sequence(
        &self,
        service_id: ServiceId,
        day: NaiveDate,
    ) -> Result<u32, RepositoryError> {
        let mut state = lock(&self.state, "ticket store")?;
        let counter = state.sequences.entry((service_id, day)).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    fn insert(&self, ticket: NewTicket) -> Result<QueueTicket, RepositoryError> {
        let mut state = lock(&self.state, "ticket store")?;
        let duplicate = state.tickets.values().any(|existing| {
            existing.service_id == ticket.service_id
                && existing.sequence == ticket.sequence
                && existing.created_at.date_naive() == ticket.created_at.date_naive()
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "ticket number {} already issued today",
                ticket.number
            )));
        }

        state.last_id += 1;
        let id = TicketId(state.last_id);
        let stored = ticket.into_ticket(id);
        state.tickets.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch(&self, id: TicketId) -> Result<Option<QueueTicket>, RepositoryError> {
        let state = lock(&self.state, "ticket store")?;
        Ok(state.tickets.get(&id).cloned())
    }

    fn update_if_status(
        &self,
        id: TicketId,
        expected: &[TicketStatus],
        patch: TicketPatch,
    ) -> Result<Guarded<QueueTicket, TicketStatus>, RepositoryError> {
        let mut state = lock(&self.state, "ticket store")?;
        let Some(ticket) = state.tickets.get_mut(&id) else {
            return Ok(Guarded::Missing);
        };
        if !expected.contains(&ticket.status) {
            return Ok(Guarded::Rejected(ticket.status));
        }
        patch.apply(ticket);
        Ok(Guarded::Applied(ticket.clone()))
    }

    fn waiting_ahead(
        &self,
        service_id: ServiceId,
        created_at: DateTime<Utc>,
        id: TicketId,
    ) -> Result<usize, RepositoryError> {
        let state = lock(&self.state, "ticket store")?;
        Ok(state
            .tickets
            .values()
            .filter(|ticket| {
                ticket.id != id
                    && ticket.service_id == service_id
                    && ticket.status == TicketStatus::Waiting
                    && ticket.created_at < created_at
            })
            .count())
    }

    fn list(
        &self,
        service_id: ServiceId,
        day: NaiveDate,
        statuses: &[TicketStatus],
    ) -> Result<Vec<QueueTicket>, RepositoryError> {
        let state = lock(&self.state, "ticket store")?;
        let mut tickets: Vec<QueueTicket> = state
            .tickets
            .values()
            .filter(|ticket| {
                ticket.service_id == service_id
                    && ticket.created_at.date_naive() == day
                    && statuses.contains(&ticket.status)
            })
            .cloned()
            .collect();
        tickets.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(tickets)
    }
}
