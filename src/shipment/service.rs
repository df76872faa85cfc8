//! Shipment Lifecycle
//!
//! Driver assignment and the trip state machine. Every status change is a
//! guarded store transition: it only lands while the shipment still holds
//! the status it was read in, and request status moves with it in the same
//! step where the two are linked.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::invitation::generate_token;
use super::state::ShipmentAction;
use super::types::{DriverInvitation, GeoPoint, NewDriver, Shipment};
use super::views::{
    CarrierShipmentItem, DriverShipmentDetails, DriverTracking, QrPayload, ShipmentDetails,
    TrackingSnapshot, qr_payload, to_carrier_item, to_driver_details, to_driver_tracking,
    to_shipment_details, to_tracking,
};
use crate::context::FreightContext;
use crate::core_types::{
    CarrierId, DriverId, InvitationId, MerchantId, Page, PageRequest, ShipmentId, TruckId, UserId,
};
use crate::error::{FreightError, FreightResult};
use crate::fleet::Truck;
use crate::logging::AUDIT_TARGET;
use crate::notify::Message;
use crate::offer::ShipmentOffer;
use crate::profile::{DriverProfile, ProfileService, Role, User, new_driver_profile};
use crate::request::validation::check_coordinates;
use crate::request::{RequestStatus, ShipmentRequest};
use crate::store::{Redemption, RequestSync, ShipmentTransition};

#[derive(Clone)]
pub struct ShipmentLifecycle {
    ctx: Arc<FreightContext>,
    profiles: ProfileService,
}

impl ShipmentLifecycle {
    pub fn new(ctx: Arc<FreightContext>) -> Self {
        Self {
            profiles: ProfileService::new(ctx.clone()),
            ctx,
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    async fn shipment(&self, id: ShipmentId) -> FreightResult<Shipment> {
        self.ctx
            .store
            .get_shipment(id)
            .await?
            .ok_or_else(|| FreightError::not_found("shipment"))
    }

    async fn request_of(&self, s: &Shipment) -> FreightResult<ShipmentRequest> {
        self.ctx
            .store
            .get_request(s.request_id)
            .await?
            .ok_or_else(|| FreightError::not_found("shipment request"))
    }

    async fn offer_of(&self, s: &Shipment) -> FreightResult<ShipmentOffer> {
        self.ctx
            .store
            .get_offer(s.accepted_offer_id)
            .await?
            .ok_or_else(|| FreightError::not_found("offer"))
    }

    async fn truck_of(&self, s: &Shipment) -> FreightResult<Truck> {
        self.ctx
            .store
            .get_truck(s.truck_id)
            .await?
            .ok_or_else(|| FreightError::not_found("truck"))
    }

    async fn driver_of(&self, s: &Shipment) -> FreightResult<Option<DriverProfile>> {
        match s.driver_id {
            Some(id) => self.ctx.store.get_driver(id).await,
            None => Ok(None),
        }
    }

    /// Shipment born from the carrier's accepted offer; anyone else's is `NotFound`
    async fn carrier_shipment(
        &self,
        carrier_id: CarrierId,
        id: ShipmentId,
    ) -> FreightResult<(Shipment, ShipmentOffer)> {
        let shipment = self.shipment(id).await?;
        let offer = self.offer_of(&shipment).await?;
        if offer.carrier_id != carrier_id {
            return Err(FreightError::not_found("shipment"));
        }
        Ok((shipment, offer))
    }

    /// Shipment assigned to the calling user's driver profile
    async fn driver_shipment(&self, user_id: UserId, id: ShipmentId) -> FreightResult<Shipment> {
        let shipment = self.shipment(id).await?;
        let driver = self
            .ctx
            .store
            .driver_by_user(user_id)
            .await?
            .ok_or_else(|| FreightError::unauthorized("caller has no driver profile"))?;
        if shipment.driver_id != Some(driver.id) {
            return Err(FreightError::unauthorized(
                "shipment is not assigned to this driver",
            ));
        }
        Ok(shipment)
    }

    async fn commit(
        &self,
        action: ShipmentAction,
        transition: ShipmentTransition,
    ) -> FreightResult<Shipment> {
        let from = transition.expected;
        let shipment = self.ctx.store.apply_transition(&transition).await?;
        info!(
            shipment_id = %shipment.id,
            from = %from,
            to = %shipment.status,
            action = action.as_str(),
            "shipment transition"
        );
        info!(target: AUDIT_TARGET, shipment_id = %shipment.id, from = %from, to = %shipment.status, "shipment transition");
        if let Some(sync) = transition.request_sync {
            info!(target: AUDIT_TARGET, request_id = %shipment.request_id, from = %sync.from, to = %sync.to, "request follows shipment");
        }
        Ok(shipment)
    }

    async fn notify_merchant(&self, request: &ShipmentRequest, message: Message) {
        match self.ctx.store.get_merchant(request.merchant_id).await {
            Ok(Some(m)) => self.ctx.notifier.dispatch(m.user_id, &message).await,
            Ok(None) => warn!(merchant_id = %request.merchant_id, "request owner has no merchant profile"),
            Err(e) => warn!(request_id = %request.id, error = %e, "could not resolve merchant to notify"),
        }
    }

    // ------------------------------------------------------------------
    // Driver assignment
    // ------------------------------------------------------------------

    /// The carrier drives the shipment itself with its bound truck
    pub async fn assign_self(
        &self,
        carrier_id: CarrierId,
        shipment_id: ShipmentId,
        truck_id: TruckId,
    ) -> FreightResult<Shipment> {
        let (shipment, _) = self.carrier_shipment(carrier_id, shipment_id).await?;
        match self.ctx.store.get_truck(truck_id).await? {
            Some(t) if t.carrier_id == carrier_id => {}
            _ => return Err(FreightError::not_found("truck")),
        }
        if shipment.truck_id != truck_id {
            return Err(FreightError::validation(
                "truck does not match the one bound to the shipment",
            ));
        }
        let next = ShipmentAction::AssignDriver.apply(shipment.status)?;

        let carrier = self
            .ctx
            .store
            .get_carrier(carrier_id)
            .await?
            .ok_or_else(|| FreightError::not_found("truck account"))?;
        let driver = self.profiles.ensure_driver_profile(carrier.user_id).await?;

        let mut tr = ShipmentTransition::new(shipment.id, shipment.status, next);
        tr.driver_id = Some(driver.id);
        self.commit(ShipmentAction::AssignDriver, tr).await
    }

    /// Single-use token letting an outside driver register for this shipment
    pub async fn generate_invitation(
        &self,
        carrier_id: CarrierId,
        shipment_id: ShipmentId,
    ) -> FreightResult<DriverInvitation> {
        let (shipment, _) = self.carrier_shipment(carrier_id, shipment_id).await?;
        ShipmentAction::AssignDriver.apply(shipment.status)?;

        let now = self.ctx.clock.now();
        let invitation = DriverInvitation {
            id: InvitationId::new(),
            shipment_id,
            token: generate_token(self.ctx.entropy.as_ref()),
            expires_at: now + self.ctx.policy.invitation_ttl,
            is_used: false,
            created_at: now,
        };
        self.ctx.store.insert_invitation(&invitation, now).await?;
        info!(shipment_id = %shipment_id, invitation_id = %invitation.id, expires_at = %invitation.expires_at, "driver invitation issued");
        Ok(invitation)
    }

    /// Consume a token: new driver user and profile, bound to the shipment
    pub async fn redeem_invitation(
        &self,
        token: &str,
        input: NewDriver,
    ) -> FreightResult<(User, DriverProfile, Shipment)> {
        let full_name = input.full_name.trim();
        let phone_number = input.phone_number.trim();
        if full_name.is_empty() {
            return Err(FreightError::validation("full name is required"));
        }
        if phone_number.is_empty() {
            return Err(FreightError::validation("phone number is required"));
        }

        let now = self.ctx.clock.now();
        let user = User {
            id: UserId::new(),
            full_name: full_name.to_string(),
            phone_number: phone_number.to_string(),
            email: input
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            role: Role::Driver,
            created_at: now,
        };
        let driver = new_driver_profile(DriverId::new(), &user, now);
        let shipment = self
            .ctx
            .store
            .redeem_invitation(&Redemption {
                token: token.to_string(),
                user: user.clone(),
                driver: driver.clone(),
                now,
            })
            .await?;

        info!(shipment_id = %shipment.id, driver_id = %driver.id, "invitation redeemed");
        info!(target: AUDIT_TARGET, shipment_id = %shipment.id, to = %shipment.status, "driver assigned by invitation");
        Ok((user, driver, shipment))
    }

    // ------------------------------------------------------------------
    // Trip
    // ------------------------------------------------------------------

    pub async fn start(&self, driver_user: UserId, id: ShipmentId) -> FreightResult<Shipment> {
        let s = self.driver_shipment(driver_user, id).await?;
        let next = ShipmentAction::Start.apply(s.status)?;
        let mut tr = ShipmentTransition::new(s.id, s.status, next);
        tr.started_at = Some(self.ctx.clock.now());
        tr.request_sync = Some(RequestSync {
            from: RequestStatus::OfferAccepted,
            to: RequestStatus::InProgress,
        });
        self.commit(ShipmentAction::Start, tr).await
    }

    pub async fn arrive(&self, driver_user: UserId, id: ShipmentId) -> FreightResult<Shipment> {
        self.simple(driver_user, id, ShipmentAction::Arrive).await
    }

    pub async fn pause(&self, driver_user: UserId, id: ShipmentId) -> FreightResult<Shipment> {
        self.simple(driver_user, id, ShipmentAction::Pause).await
    }

    pub async fn resume(&self, driver_user: UserId, id: ShipmentId) -> FreightResult<Shipment> {
        self.simple(driver_user, id, ShipmentAction::Resume).await
    }

    async fn simple(
        &self,
        driver_user: UserId,
        id: ShipmentId,
        action: ShipmentAction,
    ) -> FreightResult<Shipment> {
        let s = self.driver_shipment(driver_user, id).await?;
        let next = action.apply(s.status)?;
        self.commit(action, ShipmentTransition::new(s.id, s.status, next))
            .await
    }

    /// Delivery confirmed. The merchant notification is best-effort.
    pub async fn complete(&self, driver_user: UserId, id: ShipmentId) -> FreightResult<Shipment> {
        let s = self.driver_shipment(driver_user, id).await?;
        let next = ShipmentAction::Complete.apply(s.status)?;
        let mut tr = ShipmentTransition::new(s.id, s.status, next);
        tr.completed_at = Some(self.ctx.clock.now());
        tr.request_sync = Some(RequestSync {
            from: RequestStatus::InProgress,
            to: RequestStatus::Completed,
        });
        let shipment = self.commit(ShipmentAction::Complete, tr).await?;

        match self.request_of(&shipment).await {
            Ok(request) => {
                self.notify_merchant(&request, Message::shipment_delivered(&request, &shipment))
                    .await
            }
            Err(e) => warn!(shipment_id = %shipment.id, error = %e, "delivered notification skipped"),
        }
        Ok(shipment)
    }

    /// Overwrite the current position
    pub async fn update_location(
        &self,
        driver_user: UserId,
        id: ShipmentId,
        lat: f64,
        lng: f64,
    ) -> FreightResult<Shipment> {
        check_coordinates(lat, lng)?;
        let s = self.driver_shipment(driver_user, id).await?;
        let status = ShipmentAction::ReportLocation.apply(s.status)?;
        let mut tr = ShipmentTransition::new(s.id, s.status, status);
        tr.location = Some((GeoPoint { lat, lng }, self.ctx.clock.now()));
        let shipment = self.ctx.store.apply_transition(&tr).await?;
        debug!(shipment_id = %shipment.id, lat, lng, "location updated");
        Ok(shipment)
    }

    /// Carrier backs out before the trip starts; the request is cancelled too
    pub async fn cancel(
        &self,
        carrier_id: CarrierId,
        id: ShipmentId,
        reason: Option<String>,
    ) -> FreightResult<Shipment> {
        let (s, _) = self.carrier_shipment(carrier_id, id).await?;
        let next = ShipmentAction::Cancel.apply(s.status)?;
        let mut tr = ShipmentTransition::new(s.id, s.status, next);
        tr.cancelled_at = Some(self.ctx.clock.now());
        tr.request_sync = Some(RequestSync {
            from: RequestStatus::OfferAccepted,
            to: RequestStatus::Cancelled,
        });
        let shipment = self.commit(ShipmentAction::Cancel, tr).await?;
        info!(shipment_id = %shipment.id, reason = reason.as_deref().unwrap_or("-"), "shipment cancelled by carrier");

        let request = self.request_of(&shipment).await?;
        self.notify_merchant(&request, Message::shipment_cancelled(&request, &shipment))
            .await;
        Ok(shipment)
    }

    // ------------------------------------------------------------------
    // Read models
    // ------------------------------------------------------------------

    pub async fn list_for_carrier(
        &self,
        carrier_id: CarrierId,
        page: PageRequest,
    ) -> FreightResult<Page<CarrierShipmentItem>> {
        let shipments = self
            .ctx
            .store
            .list_shipments_for_carrier(carrier_id, page)
            .await?;
        let mut items = Vec::with_capacity(shipments.items.len());
        for s in &shipments.items {
            let request = self.request_of(s).await?;
            let offer = self.offer_of(s).await?;
            let truck = self.truck_of(s).await?;
            let driver = self.driver_of(s).await?;
            items.push(to_carrier_item(s, &request, &offer, &truck, driver.as_ref()));
        }
        Ok(Page {
            items,
            page_number: shipments.page_number,
            page_size: shipments.page_size,
            total_count: shipments.total_count,
        })
    }

    pub async fn details_for_carrier(
        &self,
        carrier_id: CarrierId,
        id: ShipmentId,
    ) -> FreightResult<ShipmentDetails> {
        let (s, offer) = self.carrier_shipment(carrier_id, id).await?;
        let request = self.request_of(&s).await?;
        let truck = self.truck_of(&s).await?;
        let driver = self.driver_of(&s).await?;
        Ok(to_shipment_details(s, &request, &offer, &truck, driver.as_ref()))
    }

    pub async fn qr_for_carrier(&self, carrier_id: CarrierId, id: ShipmentId) -> FreightResult<QrPayload> {
        let (s, _) = self.carrier_shipment(carrier_id, id).await?;
        Ok(qr_payload(&s, &self.ctx.policy.tracking_base_url))
    }

    async fn driver_view(&self, s: &Shipment) -> FreightResult<DriverShipmentDetails> {
        let request = self.request_of(s).await?;
        let merchant = self
            .ctx
            .store
            .get_merchant(request.merchant_id)
            .await?
            .ok_or_else(|| FreightError::not_found("merchant profile"))?;
        let user = self
            .ctx
            .store
            .get_user(merchant.user_id)
            .await?
            .ok_or_else(|| FreightError::not_found("user"))?;
        Ok(to_driver_details(s, &request, &user))
    }

    pub async fn list_for_driver(
        &self,
        driver_user: UserId,
        page: PageRequest,
    ) -> FreightResult<Page<DriverShipmentDetails>> {
        let driver = self
            .ctx
            .store
            .driver_by_user(driver_user)
            .await?
            .ok_or_else(|| FreightError::unauthorized("caller has no driver profile"))?;
        let shipments = self
            .ctx
            .store
            .list_shipments_for_driver(driver.id, page)
            .await?;
        let mut items = Vec::with_capacity(shipments.items.len());
        for s in &shipments.items {
            items.push(self.driver_view(s).await?);
        }
        Ok(Page {
            items,
            page_number: shipments.page_number,
            page_size: shipments.page_size,
            total_count: shipments.total_count,
        })
    }

    pub async fn details_for_driver(
        &self,
        driver_user: UserId,
        id: ShipmentId,
    ) -> FreightResult<DriverShipmentDetails> {
        let s = self.driver_shipment(driver_user, id).await?;
        self.driver_view(&s).await
    }

    pub async fn tracking_for_driver(
        &self,
        driver_user: UserId,
        id: ShipmentId,
    ) -> FreightResult<DriverTracking> {
        let s = self.driver_shipment(driver_user, id).await?;
        let request = self.request_of(&s).await?;
        Ok(to_driver_tracking(&s, &request))
    }

    /// Merchant view of a shipment on one of its own requests
    pub async fn tracking_for_merchant(
        &self,
        merchant_id: MerchantId,
        id: ShipmentId,
    ) -> FreightResult<TrackingSnapshot> {
        let s = self.shipment(id).await?;
        let request = self.request_of(&s).await?;
        if request.merchant_id != merchant_id {
            return Err(FreightError::not_found("shipment"));
        }
        let driver = self.driver_of(&s).await?;
        let truck = self.ctx.store.get_truck(s.truck_id).await?;
        Ok(to_tracking(&s, &request, driver.as_ref(), truck.as_ref()))
    }
}
