//! Shipment and invitation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::ShipmentStatus;
use crate::core_types::{DriverId, InvitationId, OfferId, RequestId, ShipmentId, TruckId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Execution record created by accepting an offer (at most one per request)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub request_id: RequestId,
    pub accepted_offer_id: OfferId,
    pub truck_id: TruckId,
    pub driver_id: Option<DriverId>,
    pub status: ShipmentStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub current_location: Option<GeoPoint>,
    pub location_updated_at: Option<DateTime<Utc>>,
}

/// Single-use token binding a new driver to a shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverInvitation {
    pub id: InvitationId,
    pub shipment_id: ShipmentId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl DriverInvitation {
    /// Unused and not yet expired
    #[inline]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && self.expires_at > now
    }

    pub fn url(&self) -> String {
        super::invitation::invitation_url(&self.token)
    }
}

/// Registration fields of the driver redeeming an invitation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewDriver {
    pub full_name: String,
    pub phone_number: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_invitation_activity() {
        let now = Utc::now();
        let mut inv = DriverInvitation {
            id: InvitationId::new(),
            shipment_id: ShipmentId::new(),
            token: "tok".into(),
            expires_at: now + Duration::hours(1),
            is_used: false,
            created_at: now,
        };
        assert!(inv.is_active(now));
        assert!(!inv.is_active(now + Duration::hours(1)));
        inv.is_used = true;
        assert!(!inv.is_active(now));
        assert_eq!(inv.url(), "invite/tok");
    }
}
