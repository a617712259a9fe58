use chrono::NaiveTime;
use metrics_exporter_prometheus::PrometheusHandle;
use queuedesk::config::QueueConfig;
use queuedesk::error::AppError;
use queuedesk::ids::{BuildingId, QueueGroupId, ServiceId};
use queuedesk::workflows::queue::settings::{
    parse_clock_time, BUSINESS_HOURS_END, BUSINESS_HOURS_START, TICKET_NUMBER_FORMAT,
};
use queuedesk::workflows::queue::{
    Building, ConnectionType, MemoryDirectory, MemorySettings, QueueError, QueueGroup, Service,
};
use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) const VIP_SERVICE: ServiceId = ServiceId(1);
pub(crate) const GENERAL_SERVICE: ServiceId = ServiceId(2);

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Settings store holding the configured ticketing values.
pub(crate) fn seed_settings(config: &QueueConfig) -> MemorySettings {
    MemorySettings::from_pairs([
        (BUSINESS_HOURS_START, config.business_hours_start.as_str()),
        (BUSINESS_HOURS_END, config.business_hours_end.as_str()),
        (TICKET_NUMBER_FORMAT, config.ticket_number_format.as_str()),
    ])
}

/// Main hall with one member desk group serving the VIP and general services.
pub(crate) fn seed_directory() -> Result<MemoryDirectory, AppError> {
    let directory = MemoryDirectory::default();
    directory
        .upsert_building(Building {
            id: BuildingId(1),
            code: "MAIN".to_string(),
            name: "Main hall".to_string(),
            active: true,
        })
        .map_err(QueueError::from)?;
    directory
        .upsert_queue_group(QueueGroup {
            id: QueueGroupId(1),
            code: "MEMBER".to_string(),
            building_id: BuildingId(1),
            allowed_services: BTreeSet::from([VIP_SERVICE, GENERAL_SERVICE]),
            active: true,
        })
        .map_err(QueueError::from)?;

    for service in [
        Service {
            id: VIP_SERVICE,
            name: "VIP".to_string(),
            code_prefix: "V".to_string(),
            active: true,
            sla_warn_minutes: 10,
            connection_type: ConnectionType::Ticket,
        },
        Service {
            id: GENERAL_SERVICE,
            name: "General enquiries".to_string(),
            code_prefix: "G".to_string(),
            active: true,
            sla_warn_minutes: 30,
            connection_type: ConnectionType::Ticket,
        },
    ] {
        directory.upsert_service(service).map_err(QueueError::from)?;
    }
    Ok(directory)
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    parse_clock_time(raw).ok_or_else(|| format!("failed to parse '{raw}' as HH:MM"))
}
