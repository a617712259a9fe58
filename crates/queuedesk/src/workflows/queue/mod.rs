//! Queue ticket lifecycle: routing, numbering, status transitions, and the queue board.

pub mod directory;
pub mod domain;
pub mod error;
pub mod memory;
pub mod numbering;
pub mod repository;
pub mod router;
pub mod service;
pub mod settings;

#[cfg(test)]
mod tests;

pub use directory::{
    Building, ConnectionType, MemoryDirectory, QueueGroup, Service, ServiceDirectory,
    ServiceRoute,
};
pub use domain::{
    CustomerRef, QueueEntry, QueueTicket, TicketAction, TicketCommand, TicketStatus, TicketView,
};
pub use error::QueueError;
pub use memory::MemoryTicketStore;
pub use numbering::{IssuedNumber, TicketNumberGenerator};
pub use repository::TicketRepository;
pub use router::ticket_router;
pub use service::{CreateTicket, QueueFilter, QueueTicketService};
pub use settings::{BusinessHours, MemorySettings, SettingsStore, TicketingSettings};
