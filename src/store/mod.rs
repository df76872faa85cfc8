//! Persistence seam.
//!
//! [`FreightStore`] exposes single-record reads and writes plus the handful of
//! multi-record operations that must be atomic (offer acceptance, request
//! cancellation, invitation redemption, guarded shipment transitions).
//! Implementations:
//! - [`MemoryStore`]: one mutex over all tables; default for dev and tests
//! - [`PgStore`]: PostgreSQL, row locks and compare-and-set updates

mod memory;
mod postgres;
pub mod schema;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::core_types::{
    CarrierId, DriverId, MerchantId, NotificationId, OfferId, Page, PageRequest, RequestId,
    ShipmentId, TruckId, UserId,
};
use crate::error::FreightResult;
use crate::fleet::Truck;
use crate::notify::Notification;
use crate::offer::ShipmentOffer;
use crate::profile::{DriverProfile, MerchantProfile, RoleProfile, TruckAccount, User};
use crate::request::{RequestQuery, RequestStatus, ShipmentRequest};
use crate::shipment::{DriverInvitation, GeoPoint, Shipment, ShipmentStatus};

/// Everything `accept_offer` needs to commit in one step
#[derive(Debug, Clone)]
pub struct OfferAcceptance {
    pub request_id: RequestId,
    pub offer_id: OfferId,
    /// New shipment, status `AwaitingDriver`
    pub shipment: Shipment,
}

/// Request status move applied together with a shipment transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSync {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

/// Guarded shipment update.
///
/// Applied only while the shipment is still in `expected`; otherwise the
/// store reports `Conflict`. `None` fields are left untouched.
#[derive(Debug, Clone)]
pub struct ShipmentTransition {
    pub shipment_id: ShipmentId,
    pub expected: ShipmentStatus,
    pub status: ShipmentStatus,
    pub driver_id: Option<DriverId>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub location: Option<(GeoPoint, DateTime<Utc>)>,
    pub request_sync: Option<RequestSync>,
}

impl ShipmentTransition {
    pub fn new(shipment_id: ShipmentId, expected: ShipmentStatus, status: ShipmentStatus) -> Self {
        Self {
            shipment_id,
            expected,
            status,
            driver_id: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            location: None,
            request_sync: None,
        }
    }

    /// Apply to an in-memory copy
    pub fn apply_to(&self, s: &mut Shipment) {
        s.status = self.status;
        if let Some(d) = self.driver_id {
            s.driver_id = Some(d);
        }
        if let Some(t) = self.started_at {
            s.started_at = Some(t);
        }
        if let Some(t) = self.completed_at {
            s.completed_at = Some(t);
        }
        if let Some(t) = self.cancelled_at {
            s.cancelled_at = Some(t);
        }
        if let Some((point, at)) = self.location {
            s.current_location = Some(point);
            s.location_updated_at = Some(at);
        }
    }
}

/// New driver identity created by invitation redemption
#[derive(Debug, Clone)]
pub struct Redemption {
    pub token: String,
    pub user: User,
    pub driver: DriverProfile,
    pub now: DateTime<Utc>,
}

#[async_trait]
pub trait FreightStore: Send + Sync {
    // === Actors ===

    /// Insert a user and its role profile atomically.
    /// `Conflict` when the phone number is taken.
    async fn register(&self, user: &User, profile: &RoleProfile) -> FreightResult<()>;
    async fn get_user(&self, id: UserId) -> FreightResult<Option<User>>;
    async fn update_user(&self, user: &User) -> FreightResult<()>;

    async fn merchant_by_user(&self, user_id: UserId) -> FreightResult<Option<MerchantProfile>>;
    async fn carrier_by_user(&self, user_id: UserId) -> FreightResult<Option<TruckAccount>>;
    async fn driver_by_user(&self, user_id: UserId) -> FreightResult<Option<DriverProfile>>;
    async fn get_merchant(&self, id: MerchantId) -> FreightResult<Option<MerchantProfile>>;
    async fn get_carrier(&self, id: CarrierId) -> FreightResult<Option<TruckAccount>>;
    async fn get_driver(&self, id: DriverId) -> FreightResult<Option<DriverProfile>>;

    async fn update_merchant(&self, profile: &MerchantProfile) -> FreightResult<()>;
    async fn update_carrier(&self, account: &TruckAccount) -> FreightResult<()>;
    async fn update_driver(&self, profile: &DriverProfile) -> FreightResult<()>;

    /// Driver profile for an existing user. `Conflict` if one exists.
    async fn insert_driver_profile(&self, profile: &DriverProfile) -> FreightResult<()>;

    /// Carriers owning at least one active truck
    async fn carriers_with_active_trucks(&self) -> FreightResult<Vec<TruckAccount>>;

    // === Fleet ===

    /// `Conflict` on a duplicate plate number
    async fn insert_truck(&self, truck: &Truck) -> FreightResult<()>;
    async fn get_truck(&self, id: TruckId) -> FreightResult<Option<Truck>>;
    /// Oldest first
    async fn list_trucks(&self, carrier_id: CarrierId) -> FreightResult<Vec<Truck>>;
    async fn set_truck_active(&self, id: TruckId, active: bool) -> FreightResult<bool>;

    // === Requests ===

    async fn request_number_exists(&self, number: &str) -> FreightResult<bool>;
    /// `Conflict` on a duplicate request number
    async fn insert_request(&self, request: &ShipmentRequest) -> FreightResult<()>;
    async fn get_request(&self, id: RequestId) -> FreightResult<Option<ShipmentRequest>>;
    /// Newest first
    async fn list_requests(
        &self,
        query: &RequestQuery,
        page: PageRequest,
    ) -> FreightResult<Page<ShipmentRequest>>;
    /// Offers of any status per request; absent ids count zero
    async fn offer_counts(&self, ids: &[RequestId]) -> FreightResult<HashMap<RequestId, u64>>;
    /// Cancel a Draft/Open request and reject its pending offers.
    /// Returns the number of offers rejected.
    async fn cancel_request(&self, id: RequestId) -> FreightResult<u64>;

    // === Offers ===

    /// `Conflict` when the carrier already bid on the request
    async fn insert_offer(&self, offer: &ShipmentOffer) -> FreightResult<()>;
    async fn get_offer(&self, id: OfferId) -> FreightResult<Option<ShipmentOffer>>;
    async fn find_offer(
        &self,
        request_id: RequestId,
        carrier_id: CarrierId,
    ) -> FreightResult<Option<ShipmentOffer>>;
    /// Oldest first
    async fn list_offers_for_request(
        &self,
        request_id: RequestId,
        page: PageRequest,
    ) -> FreightResult<Page<ShipmentOffer>>;
    /// Newest first
    async fn list_offers_by_carrier(
        &self,
        carrier_id: CarrierId,
        page: PageRequest,
    ) -> FreightResult<Page<ShipmentOffer>>;

    /// Atomically: request Open→OfferAccepted, offer Pending→Accepted,
    /// pending siblings →Rejected, shipment inserted. `Conflict` if the
    /// request or offer changed underneath, or if the shipment's truck is no
    /// longer an active truck of the offering carrier. Returns rejected
    /// sibling count.
    async fn accept_offer(&self, acceptance: &OfferAcceptance) -> FreightResult<u64>;
    /// Pending→Expired for one offer; false if it was no longer pending
    async fn expire_offer(&self, id: OfferId) -> FreightResult<bool>;
    /// Pending offers with `expires_at <= now` → Expired
    async fn expire_overdue_offers(&self, now: DateTime<Utc>) -> FreightResult<u64>;
    /// Open requests with delivery date before `today` → Expired (their
    /// pending offers too)
    async fn expire_stale_requests(&self, today: NaiveDate) -> FreightResult<u64>;

    // === Shipments ===

    async fn get_shipment(&self, id: ShipmentId) -> FreightResult<Option<Shipment>>;
    async fn shipment_for_request(&self, request_id: RequestId) -> FreightResult<Option<Shipment>>;
    /// Shipments born from the carrier's accepted offers, newest first
    async fn list_shipments_for_carrier(
        &self,
        carrier_id: CarrierId,
        page: PageRequest,
    ) -> FreightResult<Page<Shipment>>;
    async fn list_shipments_for_driver(
        &self,
        driver_id: DriverId,
        page: PageRequest,
    ) -> FreightResult<Page<Shipment>>;
    async fn apply_transition(&self, transition: &ShipmentTransition) -> FreightResult<Shipment>;

    // === Invitations ===

    /// `Conflict` when the shipment already has an active invitation
    async fn insert_invitation(
        &self,
        invitation: &DriverInvitation,
        now: DateTime<Utc>,
    ) -> FreightResult<()>;
    async fn invitation_by_token(&self, token: &str) -> FreightResult<Option<DriverInvitation>>;
    /// Atomically: invitation marked used, driver user+profile created,
    /// shipment bound to the driver and moved to Ready. `InvalidState` unless
    /// the shipment is still AwaitingDriver with no driver.
    async fn redeem_invitation(&self, redemption: &Redemption) -> FreightResult<Shipment>;

    // === Notifications ===

    async fn insert_notification(&self, notification: &Notification) -> FreightResult<()>;
    /// Newest first
    async fn list_notifications(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> FreightResult<Page<Notification>>;
    async fn unseen_count(&self, user_id: UserId) -> FreightResult<u64>;
    async fn mark_seen(
        &self,
        user_id: UserId,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> FreightResult<bool>;
    async fn mark_all_seen(&self, user_id: UserId, now: DateTime<Utc>) -> FreightResult<u64>;
}
