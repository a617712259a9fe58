use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::ids::{BuildingId, CustomerId, QueueGroupId, ServiceId, TicketId};
use crate::notifications::{Notification, NotificationSink};
use crate::workflows::queue::directory::{
    Building, ConnectionType, MemoryDirectory, QueueGroup, Service,
};
use crate::workflows::queue::domain::{
    NewTicket, QueueTicket, TicketPatch, TicketStatus, TicketView,
};
use crate::workflows::queue::memory::MemoryTicketStore;
use crate::workflows::queue::repository::TicketRepository;
use crate::workflows::queue::service::{CreateTicket, QueueTicketService};
use crate::workflows::queue::settings::MemorySettings;
use crate::workflows::store::{Guarded, RepositoryError};

pub(super) const VIP: ServiceId = ServiceId(1);
pub(super) const UNROUTED: ServiceId = ServiceId(2);
pub(super) const RETIRED: ServiceId = ServiceId(3);
pub(super) const GENERAL: ServiceId = ServiceId(4);

pub(super) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 4, hour, minute, 0).unwrap()
}

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 4).expect("valid date")
}

fn service(id: ServiceId, name: &str, prefix: &str, active: bool, sla: u32) -> Service {
    Service {
        id,
        name: name.to_string(),
        code_prefix: prefix.to_string(),
        active,
        sla_warn_minutes: sla,
        connection_type: ConnectionType::Ticket,
    }
}

pub(super) fn directory() -> MemoryDirectory {
    let directory = MemoryDirectory::default();
    directory
        .upsert_building(Building {
            id: BuildingId(1),
            code: "MAIN".to_string(),
            name: "Main hall".to_string(),
            active: true,
        })
        .expect("seed building");
    directory
        .upsert_queue_group(QueueGroup {
            id: QueueGroupId(1),
            code: "MEMBER".to_string(),
            building_id: BuildingId(1),
            allowed_services: BTreeSet::from([VIP, RETIRED, GENERAL]),
            active: true,
        })
        .expect("seed queue group");
    for seeded in [
        service(VIP, "VIP", "V", true, 15),
        service(UNROUTED, "Unrouted", "U", true, 0),
        service(RETIRED, "Retired", "R", false, 0),
        service(GENERAL, "General", "G", true, 0),
    ] {
        directory.upsert_service(seeded).expect("seed service");
    }
    directory
}

#[derive(Default)]
pub(super) struct MemorySink {
    events: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("sink mutex poisoned").clone()
    }
}

impl NotificationSink for MemorySink {
    fn emit(&self, notification: Notification) {
        self.events
            .lock()
            .expect("sink mutex poisoned")
            .push(notification);
    }
}

pub(super) struct Harness {
    pub(super) service: QueueTicketService<MemoryTicketStore, MemorySink>,
    pub(super) store: Arc<MemoryTicketStore>,
    pub(super) sink: Arc<MemorySink>,
    pub(super) clock: Arc<FixedClock>,
    pub(super) settings: Arc<MemorySettings>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(MemoryTicketStore::default());
    let sink = Arc::new(MemorySink::default());
    let clock = Arc::new(FixedClock::new(at(10, 0)));
    let settings = Arc::new(MemorySettings::default());
    let service = QueueTicketService::new(
        Arc::new(directory()),
        settings.clone(),
        store.clone(),
        sink.clone(),
        clock.clone(),
    );
    Harness {
        service,
        store,
        sink,
        clock,
        settings,
    }
}

pub(super) fn customer(id: u64) -> CreateTicket {
    CreateTicket::for_customer(CustomerId(id))
}

pub(super) fn issue(harness: &Harness, service_id: ServiceId) -> TicketView {
    harness
        .service
        .create(service_id, customer(1))
        .expect("ticket issued")
}

pub(super) struct UnavailableTickets;

impl TicketRepository for UnavailableTickets {
    fn allocate_sequence(
        &self,
        _service_id: ServiceId,
        _day: NaiveDate,
    ) -> Result<u32, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _ticket: NewTicket) -> Result<QueueTicket, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: TicketId) -> Result<Option<QueueTicket>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_if_status(
        &self,
        _id: TicketId,
        _expected: &[TicketStatus],
        _patch: TicketPatch,
    ) -> Result<Guarded<QueueTicket, TicketStatus>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn waiting_ahead(
        &self,
        _service_id: ServiceId,
        _created_at: DateTime<Utc>,
        _id: TicketId,
    ) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(
        &self,
        _service_id: ServiceId,
        _day: NaiveDate,
        _statuses: &[TicketStatus],
    ) -> Result<Vec<QueueTicket>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
