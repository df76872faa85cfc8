//! Offer records and read models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state::OfferStatus;
use crate::core_types::{CarrierId, OfferId, RequestId};
use crate::shipment::Shipment;

/// A carrier's priced bid on a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentOffer {
    pub id: OfferId,
    pub request_id: RequestId,
    pub carrier_id: CarrierId,
    pub price: Decimal,
    pub notes: Option<String>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ShipmentOffer {
    /// Expiry instant reached
    #[inline]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OfferSubmission {
    pub request_id: RequestId,
    pub price: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to created + the configured offer lifetime
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Offer plus carrier details for merchant-facing lists
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferView {
    #[serde(flatten)]
    pub offer: ShipmentOffer,
    pub carrier_name: String,
    pub carrier_verified: bool,
    pub active_truck_count: u64,
}

/// Outcome of a successful accept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedOffer {
    pub offer: ShipmentOffer,
    pub shipment: Shipment,
    /// Sibling offers moved to Rejected
    pub rejected_count: u64,
}

/// What one expiry pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub offers_expired: u64,
    pub requests_expired: u64,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.offers_expired == 0 && self.requests_expired == 0
    }
}
