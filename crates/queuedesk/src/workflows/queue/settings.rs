use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tracing::warn;

use crate::workflows::store::RepositoryError;

pub const BUSINESS_HOURS_START: &str = "business_hours_start";
pub const BUSINESS_HOURS_END: &str = "business_hours_end";
pub const TICKET_NUMBER_FORMAT: &str = "ticket_number_format";

pub const DEFAULT_BUSINESS_HOURS_START: &str = "09:00";
pub const DEFAULT_BUSINESS_HOURS_END: &str = "17:00";
pub const DEFAULT_NUMBER_FORMAT: &str = "{building_code}/{queuegroup_code}/{service_code}/{number}";

/// Key/value settings lookup.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        self.values
            .write()
            .map_err(|_| RepositoryError::Unavailable("settings lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let guard = self
            .values
            .read()
            .map_err(|_| RepositoryError::Unavailable("settings lock poisoned".to_string()))?;
        Ok(guard.get(key).cloned())
    }
}

/// Daily window (UTC) during which tickets may be issued. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusinessHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl BusinessHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let minute = minutes_since_midnight(at.time());
        let start = minutes_since_midnight(self.start);
        let end = minutes_since_midnight(self.end);
        if start <= end {
            (start..=end).contains(&minute)
        } else {
            // window wraps past midnight
            minute >= start || minute <= end
        }
    }
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

impl fmt::Display for BusinessHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} and {} UTC",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Ticketing values resolved from the settings store at issuance time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketingSettings {
    pub hours: BusinessHours,
    pub number_format: String,
}

impl TicketingSettings {
    pub fn load(store: &dyn SettingsStore) -> Result<Self, RepositoryError> {
        let defaults = BusinessHours::default();
        let start = parse_time_setting(store, BUSINESS_HOURS_START, defaults.start)?;
        let end = parse_time_setting(store, BUSINESS_HOURS_END, defaults.end)?;

        let number_format = store
            .get(TICKET_NUMBER_FORMAT)?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_NUMBER_FORMAT.to_string());

        Ok(Self {
            hours: BusinessHours::new(start, end),
            number_format,
        })
    }
}

fn parse_time_setting(
    store: &dyn SettingsStore,
    key: &str,
    fallback: NaiveTime,
) -> Result<NaiveTime, RepositoryError> {
    let Some(raw) = store.get(key)? else {
        return Ok(fallback);
    };

    match parse_clock_time(&raw) {
        Some(time) => Ok(time),
        None => {
            warn!(key, value = %raw, "unparsable business hours setting; using default");
            Ok(fallback)
        }
    }
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}
