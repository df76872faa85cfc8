//! Shipment Request FSM
//!
//! ```text
//! Draft ──► Open ──► OfferAccepted ──► InProgress ──► Completed
//!   │        │  │          │
//!   │        │  └► Expired └────────► Cancelled
//!   └────────┴──────────────────────► Cancelled
//! ```
//!
//! State IDs are stored as SMALLINT.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum RequestStatus {
    Draft = 0,
    /// Visible to carriers, accepting offers
    Open = 10,
    /// Exactly one offer accepted, shipment created
    OfferAccepted = 20,
    /// Trip started
    InProgress = 30,
    /// Terminal
    Completed = 40,
    /// Terminal
    Cancelled = -10,
    /// Terminal: delivery date passed without an accepted offer
    Expired = -20,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 7] = [
        RequestStatus::Draft,
        RequestStatus::Open,
        RequestStatus::OfferAccepted,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
        RequestStatus::Expired,
    ];

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Cancelled | RequestStatus::Expired
        )
    }

    /// Merchant cancellation is only allowed before an offer is taken
    #[inline]
    pub fn is_cancellable(&self) -> bool {
        matches!(self, RequestStatus::Draft | RequestStatus::Open)
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "DRAFT",
            RequestStatus::Open => "OPEN",
            RequestStatus::OfferAccepted => "OFFER_ACCEPTED",
            RequestStatus::InProgress => "IN_PROGRESS",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Cancelled => "CANCELLED",
            RequestStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == needle || st.as_str().replace('_', "") == needle)
            .ok_or_else(|| format!("unknown request status: {}", s.trim()))
    }
}
