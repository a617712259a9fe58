use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{CounterId, CustomerId, QueueCustomerId, ServiceId, StaffId, TicketId};

/// Lifecycle status of a queue ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Waiting,
    Called,
    InService,
    Done,
    NoShow,
    Canceled,
}

impl TicketStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Called => "CALLED",
            Self::InService => "IN_SERVICE",
            Self::Done => "DONE",
            Self::NoShow => "NO_SHOW",
            Self::Canceled => "CANCELED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::NoShow | Self::Canceled)
    }

    /// Statuses shown on a live queue board.
    pub const fn active() -> [Self; 3] {
        [Self::Waiting, Self::Called, Self::InService]
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown ticket status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "WAITING" => Ok(Self::Waiting),
            "CALLED" => Ok(Self::Called),
            "IN_SERVICE" => Ok(Self::InService),
            "DONE" => Ok(Self::Done),
            "NO_SHOW" => Ok(Self::NoShow),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            _ => Err(UnknownStatus(raw.to_string())),
        }
    }
}

/// Operations that move a ticket between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketAction {
    Claim,
    Start,
    Resolve,
    NoShow,
    Requeue,
    Cancel,
}

impl TicketAction {
    /// Statuses from which the action is legal.
    pub const fn sources(self) -> &'static [TicketStatus] {
        use TicketStatus::*;
        match self {
            Self::Claim => &[Waiting],
            Self::Start => &[Called],
            Self::Resolve => &[Called, InService],
            Self::NoShow => &[Called],
            Self::Requeue => &[Called, InService],
            Self::Cancel => &[Waiting, Called, InService],
        }
    }

    pub const fn target(self) -> TicketStatus {
        match self {
            Self::Claim => TicketStatus::Called,
            Self::Start => TicketStatus::InService,
            Self::Resolve => TicketStatus::Done,
            Self::NoShow => TicketStatus::NoShow,
            Self::Requeue => TicketStatus::Waiting,
            Self::Cancel => TicketStatus::Canceled,
        }
    }

    pub fn allowed_from(self, status: TicketStatus) -> bool {
        self.sources().contains(&status)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Start => "start",
            Self::Resolve => "resolve",
            Self::NoShow => "no_show",
            Self::Requeue => "requeue",
            Self::Cancel => "cancel",
        }
    }

    /// Event name published after the action commits.
    pub const fn event(self) -> &'static str {
        match self {
            Self::Claim => "ticket.claimed",
            Self::Start => "ticket.started",
            Self::Resolve => "ticket.resolved",
            Self::NoShow => "ticket.no_show",
            Self::Requeue => "ticket.requeued",
            Self::Cancel => "ticket.canceled",
        }
    }
}

impl fmt::Display for TicketAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The customer a ticket was issued for; a ticket carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerRef {
    #[serde(rename = "customer_id")]
    Customer(CustomerId),
    #[serde(rename = "queue_customer_id")]
    QueueCustomer(QueueCustomerId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTicket {
    pub id: TicketId,
    pub service_id: ServiceId,
    pub number: String,
    pub sequence: u32,
    pub building_code: String,
    pub queuegroup_code: String,
    #[serde(flatten)]
    pub customer: CustomerRef,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub no_show_at: Option<DateTime<Utc>>,
    pub timer_start: Option<DateTime<Utc>>,
    pub timer_end: Option<DateTime<Utc>>,
    pub claimed_by: Option<StaffId>,
    pub customer_service_id: Option<CounterId>,
    pub notes: Option<String>,
}

/// Ticket fields fixed at issuance; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub service_id: ServiceId,
    pub number: String,
    pub sequence: u32,
    pub building_code: String,
    pub queuegroup_code: String,
    pub customer: CustomerRef,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl NewTicket {
    pub fn into_ticket(self, id: TicketId) -> QueueTicket {
        QueueTicket {
            id,
            service_id: self.service_id,
            number: self.number,
            sequence: self.sequence,
            building_code: self.building_code,
            queuegroup_code: self.queuegroup_code,
            customer: self.customer,
            status: TicketStatus::Waiting,
            created_at: self.created_at,
            called_at: None,
            started_at: None,
            finished_at: None,
            no_show_at: None,
            timer_start: None,
            timer_end: None,
            claimed_by: None,
            customer_service_id: None,
            notes: self.notes,
        }
    }
}

/// Column-level change carried by a [`TicketPatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> Change<T> {
    fn apply(self, slot: &mut Option<T>) {
        match self {
            Change::Keep => {}
            Change::Set(value) => *slot = Some(value),
            Change::Clear => *slot = None,
        }
    }
}

/// Field updates written together with a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketPatch {
    pub status: TicketStatus,
    pub claimed_by: Change<StaffId>,
    pub customer_service_id: Change<CounterId>,
    pub called_at: Change<DateTime<Utc>>,
    pub started_at: Change<DateTime<Utc>>,
    pub finished_at: Change<DateTime<Utc>>,
    pub no_show_at: Change<DateTime<Utc>>,
    pub timer_start: Change<DateTime<Utc>>,
    pub timer_end: Change<DateTime<Utc>>,
    pub notes: Change<String>,
}

impl TicketPatch {
    pub fn to(status: TicketStatus) -> Self {
        Self {
            status,
            claimed_by: Change::Keep,
            customer_service_id: Change::Keep,
            called_at: Change::Keep,
            started_at: Change::Keep,
            finished_at: Change::Keep,
            no_show_at: Change::Keep,
            timer_start: Change::Keep,
            timer_end: Change::Keep,
            notes: Change::Keep,
        }
    }

    pub fn apply(self, ticket: &mut QueueTicket) {
        ticket.status = self.status;
        self.claimed_by.apply(&mut ticket.claimed_by);
        self.customer_service_id
            .apply(&mut ticket.customer_service_id);
        self.called_at.apply(&mut ticket.called_at);
        self.started_at.apply(&mut ticket.started_at);
        self.finished_at.apply(&mut ticket.finished_at);
        self.no_show_at.apply(&mut ticket.no_show_at);
        self.timer_start.apply(&mut ticket.timer_start);
        self.timer_end.apply(&mut ticket.timer_end);
        self.notes.apply(&mut ticket.notes);
    }
}

/// A requested transition together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketCommand {
    Claim {
        by: StaffId,
        desk: Option<CounterId>,
    },
    Start,
    Resolve {
        notes: Option<String>,
    },
    NoShow,
    Requeue {
        notes: Option<String>,
    },
    Cancel {
        notes: Option<String>,
    },
}

impl TicketCommand {
    pub fn action(&self) -> TicketAction {
        match self {
            Self::Claim { .. } => TicketAction::Claim,
            Self::Start => TicketAction::Start,
            Self::Resolve { .. } => TicketAction::Resolve,
            Self::NoShow => TicketAction::NoShow,
            Self::Requeue { .. } => TicketAction::Requeue,
            Self::Cancel { .. } => TicketAction::Cancel,
        }
    }

    /// Field updates the action writes when it commits at `now`.
    pub fn patch(&self, now: DateTime<Utc>) -> TicketPatch {
        let mut patch = TicketPatch::to(self.action().target());
        match self {
            Self::Claim { by, desk } => {
                patch.claimed_by = Change::Set(*by);
                patch.customer_service_id = match desk {
                    Some(desk) => Change::Set(*desk),
                    None => Change::Clear,
                };
                patch.called_at = Change::Set(now);
                patch.timer_start = Change::Set(now);
            }
            Self::Start => {
                patch.started_at = Change::Set(now);
            }
            Self::Resolve { notes } => {
                patch.finished_at = Change::Set(now);
                patch.timer_end = Change::Set(now);
                patch.notes = notes_change(notes);
            }
            Self::NoShow => {
                patch.no_show_at = Change::Set(now);
                patch.timer_end = Change::Set(now);
            }
            Self::Requeue { notes } => {
                patch.claimed_by = Change::Clear;
                patch.customer_service_id = Change::Clear;
                patch.called_at = Change::Clear;
                patch.started_at = Change::Clear;
                patch.timer_start = Change::Clear;
                patch.timer_end = Change::Clear;
                patch.notes = notes_change(notes);
            }
            Self::Cancel { notes } => {
                patch.notes = notes_change(notes);
            }
        }
        patch
    }
}

fn notes_change(notes: &Option<String>) -> Change<String> {
    match normalize_notes(notes.clone()) {
        Some(notes) => Change::Set(notes),
        None => Change::Keep,
    }
}

/// Trim free-text notes; blank input counts as absent.
pub fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Ticket plus its live FIFO position (WAITING tickets only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: QueueTicket,
    pub position: Option<usize>,
}

/// Queue board entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    #[serde(flatten)]
    pub view: TicketView,
    pub waited_minutes: i64,
    pub sla_breached: bool,
}
