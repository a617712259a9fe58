use chrono::{DateTime, NaiveDate, Utc};

use super::domain::{NewTicket, QueueTicket, TicketPatch, TicketStatus};
use crate::ids::{ServiceId, TicketId};
use crate::workflows::store::{Guarded, RepositoryError};

/// Storage abstraction for queue tickets.
///
/// Every write that depends on prior state is a single guarded operation so concurrent
/// requests cannot interleave a read with another request's write.
pub trait TicketRepository: Send + Sync {
    /// Next value of the per-(service, day) counter, starting at 1. Each call returns a
    /// value no other call for the same key has returned.
    fn allocate_sequence(&self, service_id: ServiceId, day: NaiveDate)
        -> Result<u32, RepositoryError>;

    fn insert(&self, ticket: NewTicket) -> Result<QueueTicket, RepositoryError>;

    fn fetch(&self, id: TicketId) -> Result<Option<QueueTicket>, RepositoryError>;

    /// Apply `patch` only while the ticket's status is one of `expected`.
    fn update_if_status(
        &self,
        id: TicketId,
        expected: &[TicketStatus],
        patch: TicketPatch,
    ) -> Result<Guarded<QueueTicket, TicketStatus>, RepositoryError>;

    /// WAITING tickets of the service created strictly before `created_at`, excluding `id`.
    fn waiting_ahead(
        &self,
        service_id: ServiceId,
        created_at: DateTime<Utc>,
        id: TicketId,
    ) -> Result<usize, RepositoryError>;

    /// Tickets of the service created on `day` with one of `statuses`, oldest first.
    fn list(
        &self,
        service_id: ServiceId,
        day: NaiveDate,
        statuses: &[TicketStatus],
    ) -> Result<Vec<QueueTicket>, RepositoryError>;
}
