//! Opaque identifier newtypes
//!
//! Every id the engine handles is an opaque string minted by the
//! surrounding platform. Newtypes keep a campaign id from ever being
//! passed where a prize id belongs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side timestamp. Never client-supplied.
pub type Timestamp = DateTime<Utc>;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Campaign identifier.
    CampaignId
);
string_id!(
    /// Prize identifier, unique within a campaign.
    PrizeId
);
string_id!(
    /// Calendar time-slot identifier, unique within a prize.
    SlotId
);
string_id!(
    /// Participation identifier; doubles as the idempotency key.
    ParticipationId
);
string_id!(
    /// Request trace identifier, carried into the audit record.
    TraceId
);
