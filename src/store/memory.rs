//! In-memory [`FreightStore`].
//!
//! All tables live behind one mutex, so every trait method is atomic. The
//! lock is never held across an await point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{FreightStore, OfferAcceptance, Redemption, ShipmentTransition};
use crate::core_types::{
    CarrierId, DriverId, InvitationId, MerchantId, NotificationId, OfferId, Page, PageRequest,
    RequestId, ShipmentId, TruckId, UserId,
};
use crate::error::{FreightError, FreightResult};
use crate::fleet::Truck;
use crate::notify::Notification;
use crate::offer::{OfferStatus, ShipmentOffer};
use crate::profile::{DriverProfile, MerchantProfile, RoleProfile, TruckAccount, User};
use crate::request::{RequestQuery, RequestStatus, ShipmentRequest};
use crate::shipment::{DriverInvitation, Shipment, ShipmentStatus};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    merchants: HashMap<MerchantId, MerchantProfile>,
    carriers: HashMap<CarrierId, TruckAccount>,
    drivers: HashMap<DriverId, DriverProfile>,
    trucks: HashMap<TruckId, Truck>,
    requests: HashMap<RequestId, ShipmentRequest>,
    offers: HashMap<OfferId, ShipmentOffer>,
    shipments: HashMap<ShipmentId, Shipment>,
    invitations: HashMap<InvitationId, DriverInvitation>,
    notifications: HashMap<NotificationId, Notification>,
}

impl Tables {
    fn phone_taken(&self, phone: &str) -> bool {
        self.users.values().any(|u| u.phone_number == phone)
    }

    fn reject_pending(&mut self, request_id: RequestId, except: Option<OfferId>, to: OfferStatus) -> u64 {
        let mut n = 0;
        for o in self.offers.values_mut() {
            if o.request_id == request_id && o.status == OfferStatus::Pending && Some(o.id) != except {
                o.status = to;
                n += 1;
            }
        }
        n
    }

    fn offer_carrier(&self, offer_id: OfferId) -> Option<CarrierId> {
        self.offers.get(&offer_id).map(|o| o.carrier_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn newest_first<T>(mut rows: Vec<T>, key: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

#[async_trait]
impl FreightStore for MemoryStore {
    async fn register(&self, user: &User, profile: &RoleProfile) -> FreightResult<()> {
        let mut t = self.lock();
        if t.users.contains_key(&user.id) {
            return Err(FreightError::conflict("user already exists"));
        }
        if t.phone_taken(&user.phone_number) {
            return Err(FreightError::conflict("phone number already registered"));
        }
        match profile {
            RoleProfile::Merchant(p) => {
                t.merchants.insert(p.id, p.clone());
            }
            RoleProfile::Carrier(p) => {
                t.carriers.insert(p.id, p.clone());
            }
            RoleProfile::Driver(p) => {
                t.drivers.insert(p.id, p.clone());
            }
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> FreightResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn update_user(&self, user: &User) -> FreightResult<()> {
        let mut t = self.lock();
        if t
            .users
            .values()
            .any(|u| u.id != user.id && u.phone_number == user.phone_number)
        {
            return Err(FreightError::conflict("phone number already registered"));
        }
        match t.users.get_mut(&user.id) {
            Some(u) => {
                *u = user.clone();
                Ok(())
            }
            None => Err(FreightError::not_found("user")),
        }
    }

    async fn merchant_by_user(&self, user_id: UserId) -> FreightResult<Option<MerchantProfile>> {
        Ok(self
            .lock()
            .merchants
            .values()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn carrier_by_user(&self, user_id: UserId) -> FreightResult<Option<TruckAccount>> {
        Ok(self
            .lock()
            .carriers
            .values()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn driver_by_user(&self, user_id: UserId) -> FreightResult<Option<DriverProfile>> {
        Ok(self
            .lock()
            .drivers
            .values()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn get_merchant(&self, id: MerchantId) -> FreightResult<Option<MerchantProfile>> {
        Ok(self.lock().merchants.get(&id).cloned())
    }

    async fn get_carrier(&self, id: CarrierId) -> FreightResult<Option<TruckAccount>> {
        Ok(self.lock().carriers.get(&id).cloned())
    }

    async fn get_driver(&self, id: DriverId) -> FreightResult<Option<DriverProfile>> {
        Ok(self.lock().drivers.get(&id).cloned())
    }

    async fn update_merchant(&self, profile: &MerchantProfile) -> FreightResult<()> {
        let mut t = self.lock();
        let slot = t
            .merchants
            .get_mut(&profile.id)
            .ok_or_else(|| FreightError::not_found("merchant profile"))?;
        *slot = profile.clone();
        Ok(())
    }

    async fn update_carrier(&self, account: &TruckAccount) -> FreightResult<()> {
        let mut t = self.lock();
        let slot = t
            .carriers
            .get_mut(&account.id)
            .ok_or_else(|| FreightError::not_found("truck account"))?;
        *slot = account.clone();
        Ok(())
    }

    async fn update_driver(&self, profile: &DriverProfile) -> FreightResult<()> {
        let mut t = self.lock();
        let slot = t
            .drivers
            .get_mut(&profile.id)
            .ok_or_else(|| FreightError::not_found("driver profile"))?;
        *slot = profile.clone();
        Ok(())
    }

    async fn insert_driver_profile(&self, profile: &DriverProfile) -> FreightResult<()> {
        let mut t = self.lock();
        if t.drivers.values().any(|d| d.user_id == profile.user_id) {
            return Err(FreightError::conflict("driver profile already exists"));
        }
        t.drivers.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn carriers_with_active_trucks(&self) -> FreightResult<Vec<TruckAccount>> {
        let t = self.lock();
        Ok(t
            .carriers
            .values()
            .filter(|c| t.trucks.values().any(|k| k.carrier_id == c.id && k.is_active))
            .cloned()
            .collect())
    }

    async fn insert_truck(&self, truck: &Truck) -> FreightResult<()> {
        let mut t = self.lock();
        if t
            .trucks
            .values()
            .any(|k| k.plate_number.eq_ignore_ascii_case(&truck.plate_number))
        {
            return Err(FreightError::conflict(format!(
                "plate number {} already registered",
                truck.plate_number
            )));
        }
        t.trucks.insert(truck.id, truck.clone());
        Ok(())
    }

    async fn get_truck(&self, id: TruckId) -> FreightResult<Option<Truck>> {
        Ok(self.lock().trucks.get(&id).cloned())
    }

    async fn list_trucks(&self, carrier_id: CarrierId) -> FreightResult<Vec<Truck>> {
        let mut trucks: Vec<Truck> = self
            .lock()
            .trucks
            .values()
            .filter(|k| k.carrier_id == carrier_id)
            .cloned()
            .collect();
        trucks.sort_by_key(|k| (k.created_at, k.id));
        Ok(trucks)
    }

    async fn set_truck_active(&self, id: TruckId, active: bool) -> FreightResult<bool> {
        Ok(match self.lock().trucks.get_mut(&id) {
            Some(k) => {
                k.is_active = active;
                true
            }
            None => false,
        })
    }

    async fn request_number_exists(&self, number: &str) -> FreightResult<bool> {
        Ok(self
            .lock()
            .requests
            .values()
            .any(|r| r.request_number == number))
    }

    async fn insert_request(&self, request: &ShipmentRequest) -> FreightResult<()> {
        let mut t = self.lock();
        if t
            .requests
            .values()
            .any(|r| r.request_number == request.request_number)
        {
            return Err(FreightError::conflict(format!(
                "request number {} already in use",
                request.request_number
            )));
        }
        t.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_request(&self, id: RequestId) -> FreightResult<Option<ShipmentRequest>> {
        Ok(self.lock().requests.get(&id).cloned())
    }

    async fn list_requests(
        &self,
        query: &RequestQuery,
        page: PageRequest,
    ) -> FreightResult<Page<ShipmentRequest>> {
        let rows: Vec<ShipmentRequest> = self
            .lock()
            .requests
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        Ok(Page::slice(newest_first(rows, |r| r.created_at), page))
    }

    async fn offer_counts(&self, ids: &[RequestId]) -> FreightResult<HashMap<RequestId, u64>> {
        let t = self.lock();
        let mut counts: HashMap<RequestId, u64> = ids.iter().map(|id| (*id, 0)).collect();
        for o in t.offers.values() {
            if let Some(c) = counts.get_mut(&o.request_id) {
                *c += 1;
            }
        }
        Ok(counts)
    }

    async fn cancel_request(&self, id: RequestId) -> FreightResult<u64> {
        let mut t = self.lock();
        let request = t
            .requests
            .get_mut(&id)
            .ok_or_else(|| FreightError::not_found("shipment request"))?;
        if !request.status.is_cancellable() {
            return Err(FreightError::invalid_state(format!(
                "cannot cancel a request in status {}",
                request.status
            )));
        }
        request.status = RequestStatus::Cancelled;
        Ok(t.reject_pending(id, None, OfferStatus::Rejected))
    }

    async fn insert_offer(&self, offer: &ShipmentOffer) -> FreightResult<()> {
        let mut t = self.lock();
        if t
            .offers
            .values()
            .any(|o| o.request_id == offer.request_id && o.carrier_id == offer.carrier_id)
        {
            return Err(FreightError::conflict(
                "carrier already submitted an offer for this request",
            ));
        }
        t.offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn get_offer(&self, id: OfferId) -> FreightResult<Option<ShipmentOffer>> {
        Ok(self.lock().offers.get(&id).cloned())
    }

    async fn find_offer(
        &self,
        request_id: RequestId,
        carrier_id: CarrierId,
    ) -> FreightResult<Option<ShipmentOffer>> {
        Ok(self
            .lock()
            .offers
            .values()
            .find(|o| o.request_id == request_id && o.carrier_id == carrier_id)
            .cloned())
    }

    async fn list_offers_for_request(
        &self,
        request_id: RequestId,
        page: PageRequest,
    ) -> FreightResult<Page<ShipmentOffer>> {
        let mut rows: Vec<ShipmentOffer> = self
            .lock()
            .offers
            .values()
            .filter(|o| o.request_id == request_id)
            .cloned()
            .collect();
        rows.sort_by_key(|o| (o.created_at, o.id));
        Ok(Page::slice(rows, page))
    }

    async fn list_offers_by_carrier(
        &self,
        carrier_id: CarrierId,
        page: PageRequest,
    ) -> FreightResult<Page<ShipmentOffer>> {
        let rows: Vec<ShipmentOffer> = self
            .lock()
            .offers
            .values()
            .filter(|o| o.carrier_id == carrier_id)
            .cloned()
            .collect();
        Ok(Page::slice(newest_first(rows, |o| o.created_at), page))
    }

    async fn accept_offer(&self, acceptance: &OfferAcceptance) -> FreightResult<u64> {
        let mut t = self.lock();

        let request_status = t
            .requests
            .get(&acceptance.request_id)
            .map(|r| r.status)
            .ok_or_else(|| FreightError::not_found("shipment request"))?;
        if request_status != RequestStatus::Open {
            return Err(FreightError::conflict("request is no longer open"));
        }
        let (offer_status, carrier_id) = t
            .offers
            .get(&acceptance.offer_id)
            .map(|o| (o.status, o.carrier_id))
            .ok_or_else(|| FreightError::not_found("offer"))?;
        if offer_status != OfferStatus::Pending {
            return Err(FreightError::conflict("offer is no longer pending"));
        }
        if t
            .shipments
            .values()
            .any(|s| s.request_id == acceptance.request_id)
        {
            return Err(FreightError::conflict("request already has a shipment"));
        }
        match t.trucks.get(&acceptance.shipment.truck_id) {
            Some(truck) if truck.carrier_id == carrier_id && truck.is_active => {}
            _ => return Err(FreightError::conflict("truck is no longer available")),
        }

        if let Some(o) = t.offers.get_mut(&acceptance.offer_id) {
            o.status = OfferStatus::Accepted;
        }
        let rejected = t.reject_pending(
            acceptance.request_id,
            Some(acceptance.offer_id),
            OfferStatus::Rejected,
        );
        if let Some(r) = t.requests.get_mut(&acceptance.request_id) {
            r.status = RequestStatus::OfferAccepted;
        }
        t.shipments
            .insert(acceptance.shipment.id, acceptance.shipment.clone());
        Ok(rejected)
    }

    async fn expire_offer(&self, id: OfferId) -> FreightResult<bool> {
        Ok(match self.lock().offers.get_mut(&id) {
            Some(o) if o.status == OfferStatus::Pending => {
                o.status = OfferStatus::Expired;
                true
            }
            _ => false,
        })
    }

    async fn expire_overdue_offers(&self, now: DateTime<Utc>) -> FreightResult<u64> {
        let mut n = 0;
        for o in self.lock().offers.values_mut() {
            if o.status == OfferStatus::Pending && o.is_overdue(now) {
                o.status = OfferStatus::Expired;
                n += 1;
            }
        }
        Ok(n)
    }

    async fn expire_stale_requests(&self, today: NaiveDate) -> FreightResult<u64> {
        let mut t = self.lock();
        let stale: Vec<RequestId> = t
            .requests
            .values()
            .filter(|r| r.status == RequestStatus::Open && r.delivery.date < today)
            .map(|r| r.id)
            .collect();
        for id in &stale {
            if let Some(r) = t.requests.get_mut(id) {
                r.status = RequestStatus::Expired;
            }
            t.reject_pending(*id, None, OfferStatus::Expired);
        }
        Ok(stale.len() as u64)
    }

    async fn get_shipment(&self, id: ShipmentId) -> FreightResult<Option<Shipment>> {
        Ok(self.lock().shipments.get(&id).cloned())
    }

    async fn shipment_for_request(&self, request_id: RequestId) -> FreightResult<Option<Shipment>> {
        Ok(self
            .lock()
            .shipments
            .values()
            .find(|s| s.request_id == request_id)
            .cloned())
    }

    async fn list_shipments_for_carrier(
        &self,
        carrier_id: CarrierId,
        page: PageRequest,
    ) -> FreightResult<Page<Shipment>> {
        let t = self.lock();
        let rows: Vec<Shipment> = t
            .shipments
            .values()
            .filter(|s| t.offer_carrier(s.accepted_offer_id) == Some(carrier_id))
            .cloned()
            .collect();
        Ok(Page::slice(newest_first(rows, |s| s.created_at), page))
    }

    async fn list_shipments_for_driver(
        &self,
        driver_id: DriverId,
        page: PageRequest,
    ) -> FreightResult<Page<Shipment>> {
        let rows: Vec<Shipment> = self
            .lock()
            .shipments
            .values()
            .filter(|s| s.driver_id == Some(driver_id))
            .cloned()
            .collect();
        Ok(Page::slice(newest_first(rows, |s| s.created_at), page))
    }

    async fn apply_transition(&self, tr: &ShipmentTransition) -> FreightResult<Shipment> {
        let mut t = self.lock();
        let (current, request_id) = t
            .shipments
            .get(&tr.shipment_id)
            .map(|s| (s.status, s.request_id))
            .ok_or_else(|| FreightError::not_found("shipment"))?;
        if current != tr.expected {
            return Err(FreightError::conflict(format!(
                "shipment moved to {current} concurrently"
            )));
        }
        if let Some(sync) = tr.request_sync {
            let request = t
                .requests
                .get_mut(&request_id)
                .ok_or_else(|| FreightError::not_found("shipment request"))?;
            if request.status != sync.from {
                return Err(FreightError::conflict(format!(
                    "request is {} (expected {})",
                    request.status, sync.from
                )));
            }
            request.status = sync.to;
        }
        let shipment = t
            .shipments
            .get_mut(&tr.shipment_id)
            .ok_or_else(|| FreightError::not_found("shipment"))?;
        tr.apply_to(shipment);
        Ok(shipment.clone())
    }

    async fn insert_invitation(
        &self,
        invitation: &DriverInvitation,
        now: DateTime<Utc>,
    ) -> FreightResult<()> {
        let mut t = self.lock();
        if t
            .invitations
            .values()
            .any(|i| i.shipment_id == invitation.shipment_id && i.is_active(now))
        {
            return Err(FreightError::conflict(
                "shipment already has an active invitation",
            ));
        }
        t.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn invitation_by_token(&self, token: &str) -> FreightResult<Option<DriverInvitation>> {
        Ok(self
            .lock()
            .invitations
            .values()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn redeem_invitation(&self, r: &Redemption) -> FreightResult<Shipment> {
        let mut t = self.lock();

        let invitation = t
            .invitations
            .values()
            .find(|i| i.token == r.token)
            .cloned()
            .ok_or_else(|| FreightError::not_found("invitation"))?;
        if invitation.is_used {
            return Err(FreightError::conflict("invitation already used"));
        }
        if invitation.expires_at <= r.now {
            return Err(FreightError::not_found("invitation expired"));
        }
        let (status, bound) = t
            .shipments
            .get(&invitation.shipment_id)
            .map(|s| (s.status, s.driver_id.is_some()))
            .ok_or_else(|| FreightError::not_found("shipment"))?;
        if status != ShipmentStatus::AwaitingDriver || bound {
            return Err(FreightError::invalid_state(format!(
                "cannot assign a driver to a shipment in status {status}"
            )));
        }
        if t.phone_taken(&r.user.phone_number) {
            return Err(FreightError::conflict("phone number already registered"));
        }

        t.users.insert(r.user.id, r.user.clone());
        t.drivers.insert(r.driver.id, r.driver.clone());
        if let Some(i) = t.invitations.get_mut(&invitation.id) {
            i.is_used = true;
        }
        let shipment = t
            .shipments
            .get_mut(&invitation.shipment_id)
            .ok_or_else(|| FreightError::not_found("shipment"))?;
        shipment.driver_id = Some(r.driver.id);
        shipment.status = ShipmentStatus::Ready;
        Ok(shipment.clone())
    }

    async fn insert_notification(&self, notification: &Notification) -> FreightResult<()> {
        self.lock()
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> FreightResult<Page<Notification>> {
        let rows: Vec<Notification> = self
            .lock()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        Ok(Page::slice(newest_first(rows, |n| n.created_at), page))
    }

    async fn unseen_count(&self, user_id: UserId) -> FreightResult<u64> {
        Ok(self
            .lock()
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && !n.is_seen())
            .count() as u64)
    }

    async fn mark_seen(
        &self,
        user_id: UserId,
        id: NotificationId,
        now: DateTime<Utc>,
    ) -> FreightResult<bool> {
        Ok(match self.lock().notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                if n.seen_at.is_none() {
                    n.seen_at = Some(now);
                }
                true
            }
            _ => false,
        })
    }

    async fn mark_all_seen(&self, user_id: UserId, now: DateTime<Utc>) -> FreightResult<u64> {
        let mut n = 0;
        for item in self.lock().notifications.values_mut() {
            if item.user_id == user_id && item.seen_at.is_none() {
                item.seen_at = Some(now);
                n += 1;
            }
        }
        Ok(n)
    }
}
