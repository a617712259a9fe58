//! Identifier newtypes shared by the queue and admissions workflows.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Counter service customers queue for.
    ServiceId
);
id_type!(QueueGroupId);
id_type!(BuildingId);
id_type!(
    /// Issued queue ticket.
    TicketId
);
id_type!(
    /// Registered customer account.
    CustomerId
);
id_type!(
    /// Walk-in customer captured at the kiosk without an account.
    QueueCustomerId
);
id_type!(
    /// Desk or counter the claiming staff member serves from.
    CounterId
);
id_type!(
    /// Staff member or admin acting on a ticket or applicant.
    StaffId
);
id_type!(PipelineId);
id_type!(StepId);
id_type!(ApplicantId);
