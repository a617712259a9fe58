use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::directory::{Service, ServiceDirectory, ServiceRoute};
use super::error::QueueError;
use super::repository::TicketRepository;
use super::settings::{SettingsStore, TicketingSettings};

/// Rendered ticket number and the values it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedNumber {
    pub number: String,
    pub sequence: u32,
    pub building_code: String,
    pub queuegroup_code: String,
}

/// Computes the next ticket number for a service-day.
pub struct TicketNumberGenerator<R> {
    directory: Arc<dyn ServiceDirectory>,
    settings: Arc<dyn SettingsStore>,
    tickets: Arc<R>,
}

impl<R> TicketNumberGenerator<R>
where
    R: TicketRepository,
{
    pub fn new(
        directory: Arc<dyn ServiceDirectory>,
        settings: Arc<dyn SettingsStore>,
        tickets: Arc<R>,
    ) -> Self {
        Self {
            directory,
            settings,
            tickets,
        }
    }

    /// Route the service, check the issuance window, then draw the next sequence value.
    ///
    /// The sequence is only drawn once every check has passed, so rejected requests never
    /// consume a number.
    pub fn issue(&self, service: &Service, now: DateTime<Utc>) -> Result<IssuedNumber, QueueError> {
        let route = self.directory.route(service.id)?.ok_or_else(|| {
            warn!(service_id = %service.id, "no active queue group routes service");
            QueueError::NotRoutable {
                service_id: service.id,
            }
        })?;

        let settings = TicketingSettings::load(self.settings.as_ref())?;
        if !settings.hours.contains(now) {
            debug!(service_id = %service.id, %now, window = %settings.hours, "outside business hours");
            return Err(QueueError::OutOfHours {
                window: settings.hours,
            });
        }

        let sequence = self.tickets.allocate_sequence(service.id, now.date_naive())?;
        let number = render_number(&settings.number_format, &route, &service.code_prefix, sequence);

        Ok(IssuedNumber {
            number,
            sequence,
            building_code: route.building.code,
            queuegroup_code: route.queue_group.code,
        })
    }
}

/// Substitute the known tokens into `template` in one pass; unknown tokens are left as
/// written and substituted values are never rescanned.
pub fn render_number(
    template: &str,
    route: &ServiceRoute,
    service_code: &str,
    sequence: u32,
) -> String {
    let number = format!("{sequence:03}");
    let mut rendered = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        rendered.push_str(&rest[..open]);
        let candidate = &rest[open..];
        let Some(close) = candidate.find('}') else {
            rest = candidate;
            break;
        };
        let value = match &candidate[1..close] {
            "building_code" => Some(route.building.code.as_str()),
            "queuegroup_code" => Some(route.queue_group.code.as_str()),
            "service_code" => Some(service_code),
            "number" => Some(number.as_str()),
            _ => None,
        };
        match value {
            Some(value) => {
                rendered.push_str(value);
                rest = &candidate[close + 1..];
            }
            None => {
                rendered.push('{');
                rest = &candidate[1..];
            }
        }
    }
    rendered.push_str(rest);
    rendered
}
