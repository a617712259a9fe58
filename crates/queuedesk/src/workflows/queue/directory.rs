use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use crate::ids::{BuildingId, QueueGroupId, ServiceId};
use crate::workflows::store::RepositoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    None,
    Admission,
    Ticket,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub code_prefix: String,
    pub active: bool,
    /// Minutes a ticket may wait before the board flags it; 0 disables the flag.
    pub sla_warn_minutes: u32,
    pub connection_type: ConnectionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub code: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueGroup {
    pub id: QueueGroupId,
    pub code: String,
    pub building_id: BuildingId,
    pub allowed_services: BTreeSet<ServiceId>,
    pub active: bool,
}

impl QueueGroup {
    pub fn serves(&self, service_id: ServiceId) -> bool {
        self.active && self.allowed_services.contains(&service_id)
    }
}

/// Building and queue-group a service is issued under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRoute {
    pub building: Building,
    pub queue_group: QueueGroup,
}

/// Resolves services and the queue-group permitted to serve them.
pub trait ServiceDirectory: Send + Sync {
    fn service(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError>;

    /// First active queue-group (lowest id) that serves the service, paired with its
    /// active building.
    fn route(&self, service_id: ServiceId) -> Result<Option<ServiceRoute>, RepositoryError>;
}

#[derive(Debug, Default)]
struct DirectoryState {
    services: BTreeMap<ServiceId, Service>,
    buildings: BTreeMap<BuildingId, Building>,
    queue_groups: BTreeMap<QueueGroupId, QueueGroup>,
}

/// Directory seeded at startup from configuration or fixtures.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl MemoryDirectory {
    pub fn upsert_service(&self, service: Service) -> Result<(), RepositoryError> {
        self.write()?.services.insert(service.id, service);
        Ok(())
    }

    pub fn upsert_building(&self, building: Building) -> Result<(), RepositoryError> {
        self.write()?.buildings.insert(building.id, building);
        Ok(())
    }

    pub fn upsert_queue_group(&self, group: QueueGroup) -> Result<(), RepositoryError> {
        self.write()?.queue_groups.insert(group.id, group);
        Ok(())
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, DirectoryState>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::Unavailable("directory lock poisoned".to_string()))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, DirectoryState>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::Unavailable("directory lock poisoned".to_string()))
    }
}

impl ServiceDirectory for MemoryDirectory {
    fn service(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError> {
        Ok(self.read()?.services.get(&id).cloned())
    }

    fn route(&self, service_id: ServiceId) -> Result<Option<ServiceRoute>, RepositoryError> {
        let state = self.read()?;
        let route = state
            .queue_groups
            .values()
            .find(|group| group.serves(service_id))
            .and_then(|group| {
                state
                    .buildings
                    .get(&group.building_id)
                    .filter(|building| building.active)
                    .map(|building| ServiceRoute {
                        building: building.clone(),
                        queue_group: group.clone(),
                    })
            });
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> MemoryDirectory {
        let directory = MemoryDirectory::default();
        directory
            .upsert_building(Building {
                id: BuildingId(1),
                code: "MAIN".to_string(),
                name: "Main hall".to_string(),
                active: true,
            })
            .unwrap();
        directory
            .upsert_building(Building {
                id: BuildingId(2),
                code: "ANNEX".to_string(),
                name: "Annex".to_string(),
                active: false,
            })
            .unwrap();
        directory
    }

    fn group(id: u64, code: &str, building: u64, services: &[u64], active: bool) -> QueueGroup {
        QueueGroup {
            id: QueueGroupId(id),
            code: code.to_string(),
            building_id: BuildingId(building),
            allowed_services: services.iter().copied().map(ServiceId).collect(),
            active,
        }
    }

    #[test]
    fn membership_is_a_set_lookup() {
        let group = group(1, "MEMBER", 1, &[12, 3], true);
        assert!(group.serves(ServiceId(3)));
        assert!(!group.serves(ServiceId(1)), "no substring matching");
        assert!(!group.serves(ServiceId(2)));
    }

    #[test]
    fn route_skips_inactive_groups_and_buildings() {
        let directory = directory();
        directory
            .upsert_queue_group(group(1, "OLD", 1, &[7], false))
            .unwrap();
        directory
            .upsert_queue_group(group(2, "CLOSED", 2, &[8], true))
            .unwrap();
        directory
            .upsert_queue_group(group(3, "MEMBER", 1, &[7], true))
            .unwrap();

        let route = directory.route(ServiceId(7)).unwrap().expect("routable");
        assert_eq!(route.queue_group.code, "MEMBER");
        assert_eq!(route.building.code, "MAIN");
        assert!(directory.route(ServiceId(8)).unwrap().is_none());
        assert!(directory.route(ServiceId(9)).unwrap().is_none());
    }

    #[test]
    fn first_active_group_wins_when_several_match() {
        let directory = directory();
        directory
            .upsert_queue_group(group(5, "SECOND", 1, &[7], true))
            .unwrap();
        directory
            .upsert_queue_group(group(4, "FIRST", 1, &[7], true))
            .unwrap();

        let route = directory.route(ServiceId(7)).unwrap().expect("routable");
        assert_eq!(route.queue_group.code, "FIRST");
    }
}
