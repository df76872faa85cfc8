//! Offer Engine
//!
//! Bidding on open requests and the accept transaction. Acceptance is one
//! store call: the winning offer, its rejected siblings, the request and
//! the new shipment commit together or not at all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::state::OfferStatus;
use super::types::{AcceptedOffer, OfferSubmission, OfferView, ShipmentOffer, SweepReport};
use crate::context::FreightContext;
use crate::core_types::{CarrierId, MerchantId, OfferId, Page, PageRequest, RequestId, ShipmentId};
use crate::error::{FreightError, FreightResult};
use crate::fleet::FleetService;
use crate::logging::AUDIT_TARGET;
use crate::notify::Message;
use crate::request::{RequestStatus, ShipmentRequest};
use crate::shipment::{Shipment, ShipmentStatus};
use crate::store::OfferAcceptance;

#[derive(Clone)]
pub struct OfferEngine {
    ctx: Arc<FreightContext>,
    fleet: FleetService,
}

impl OfferEngine {
    pub fn new(ctx: Arc<FreightContext>) -> Self {
        Self {
            fleet: FleetService::new(ctx.clone()),
            ctx,
        }
    }

    /// Place a Pending bid on an open request
    pub async fn submit(
        &self,
        carrier_id: CarrierId,
        submission: OfferSubmission,
    ) -> FreightResult<ShipmentOffer> {
        let now = self.ctx.clock.now();
        if submission.price <= Decimal::ZERO {
            return Err(FreightError::validation("price must be greater than zero"));
        }
        if submission.expires_at.is_some_and(|at| at <= now) {
            return Err(FreightError::validation("expiration must be in the future"));
        }

        if self.fleet.active_truck_count(carrier_id).await? == 0 {
            return Err(FreightError::invalid_state(
                "an active truck is required before bidding",
            ));
        }

        let request = self.open_request(submission.request_id).await?;
        if self
            .ctx
            .store
            .find_offer(request.id, carrier_id)
            .await?
            .is_some()
        {
            return Err(FreightError::conflict("offer already submitted for this request"));
        }

        let offer = ShipmentOffer {
            id: OfferId::new(),
            request_id: request.id,
            carrier_id,
            price: submission.price,
            notes: submission
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            status: OfferStatus::Pending,
            created_at: now,
            expires_at: submission
                .expires_at
                .unwrap_or(now + self.ctx.policy.offer_ttl),
        };
        self.ctx.store.insert_offer(&offer).await?;

        info!(
            offer_id = %offer.id,
            request_id = %request.id,
            carrier_id = %carrier_id,
            price = %offer.price,
            "offer submitted"
        );
        info!(target: AUDIT_TARGET, offer_id = %offer.id, to = %offer.status, "offer placed");

        if let Some(merchant) = self.ctx.store.get_merchant(request.merchant_id).await? {
            self.ctx
                .notifier
                .dispatch(merchant.user_id, &Message::offer_received(&request, &offer))
                .await;
        }
        Ok(offer)
    }

    async fn open_request(&self, id: RequestId) -> FreightResult<ShipmentRequest> {
        let request = self
            .ctx
            .store
            .get_request(id)
            .await?
            .ok_or_else(|| FreightError::not_found("shipment request"))?;
        if request.status != RequestStatus::Open {
            return Err(FreightError::invalid_state(format!(
                "request is {}, not open for offers",
                request.status
            )));
        }
        Ok(request)
    }

    async fn owned_request(
        &self,
        merchant_id: MerchantId,
        id: RequestId,
    ) -> FreightResult<ShipmentRequest> {
        match self.ctx.store.get_request(id).await? {
            Some(r) if r.merchant_id == merchant_id => Ok(r),
            _ => Err(FreightError::not_found("shipment request")),
        }
    }

    /// Accept one offer.
    ///
    /// Pre-checks give `InvalidState`; losing a race to a concurrent
    /// acceptance surfaces the store's `Conflict`.
    pub async fn accept(
        &self,
        merchant_id: MerchantId,
        request_id: RequestId,
        offer_id: OfferId,
    ) -> FreightResult<AcceptedOffer> {
        let now = self.ctx.clock.now();
        let mut request = self.owned_request(merchant_id, request_id).await?;
        let mut offer = match self.ctx.store.get_offer(offer_id).await? {
            Some(o) if o.request_id == request_id => o,
            _ => return Err(FreightError::not_found("offer")),
        };

        if request.status != RequestStatus::Open {
            return Err(FreightError::invalid_state(format!(
                "cannot accept an offer on a request in status {}",
                request.status
            )));
        }
        if offer.status != OfferStatus::Pending {
            return Err(FreightError::invalid_state(format!(
                "cannot accept an offer in status {}",
                offer.status
            )));
        }
        if offer.is_overdue(now) {
            if self.ctx.store.expire_offer(offer.id).await? {
                info!(target: AUDIT_TARGET, offer_id = %offer.id, from = %offer.status, to = %OfferStatus::Expired, "offer expired");
            }
            return Err(FreightError::invalid_state("offer has expired"));
        }

        let truck = self
            .fleet
            .first_active_truck(offer.carrier_id, request.required_truck_type)
            .await?
            .ok_or_else(|| FreightError::invalid_state("carrier has no active truck"))?;

        let shipment = Shipment {
            id: ShipmentId::new(),
            request_id,
            accepted_offer_id: offer.id,
            truck_id: truck.id,
            driver_id: None,
            status: ShipmentStatus::AwaitingDriver,
            created_at: now,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            current_location: None,
            location_updated_at: None,
        };
        let rejected_count = self
            .ctx
            .store
            .accept_offer(&OfferAcceptance {
                request_id,
                offer_id,
                shipment: shipment.clone(),
            })
            .await?;

        offer.status = OfferStatus::Accepted;
        request.status = RequestStatus::OfferAccepted;
        info!(
            request_id = %request_id,
            offer_id = %offer_id,
            shipment_id = %shipment.id,
            truck_id = %shipment.truck_id,
            rejected_count,
            "offer accepted"
        );
        info!(target: AUDIT_TARGET, request_id = %request_id, from = %RequestStatus::Open, to = %request.status, "request offer accepted");
        info!(target: AUDIT_TARGET, shipment_id = %shipment.id, to = %shipment.status, "shipment created");

        match self.ctx.store.get_carrier(offer.carrier_id).await {
            Ok(Some(carrier)) => {
                self.ctx
                    .notifier
                    .dispatch(carrier.user_id, &Message::offer_accepted(&request, &shipment))
                    .await;
            }
            Ok(None) => warn!(carrier_id = %offer.carrier_id, "winning carrier has no account"),
            Err(e) => warn!(carrier_id = %offer.carrier_id, error = %e, "could not resolve winning carrier"),
        }

        Ok(AcceptedOffer {
            offer,
            shipment,
            rejected_count,
        })
    }

    /// Offers on the merchant's request, oldest first, with carrier details
    pub async fn list_for_request(
        &self,
        merchant_id: MerchantId,
        request_id: RequestId,
        page: PageRequest,
    ) -> FreightResult<Page<OfferView>> {
        self.owned_request(merchant_id, request_id).await?;
        let offers = self
            .ctx
            .store
            .list_offers_for_request(request_id, page)
            .await?;

        let mut items = Vec::with_capacity(offers.items.len());
        for offer in &offers.items {
            let carrier = self.ctx.store.get_carrier(offer.carrier_id).await?;
            let active_truck_count = self.fleet.active_truck_count(offer.carrier_id).await?;
            items.push(OfferView {
                offer: offer.clone(),
                carrier_name: carrier
                    .as_ref()
                    .map(|c| c.display_name.clone())
                    .unwrap_or_default(),
                carrier_verified: carrier.map(|c| c.is_verified).unwrap_or(false),
                active_truck_count,
            });
        }
        Ok(Page {
            items,
            page_number: offers.page_number,
            page_size: offers.page_size,
            total_count: offers.total_count,
        })
    }

    /// The carrier's own bids, newest first
    pub async fn list_mine(
        &self,
        carrier_id: CarrierId,
        page: PageRequest,
    ) -> FreightResult<Page<ShipmentOffer>> {
        self.ctx.store.list_offers_by_carrier(carrier_id, page).await
    }

    /// One expiry pass: overdue pending offers, then stale open requests
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> FreightResult<SweepReport> {
        let report = SweepReport {
            offers_expired: self.ctx.store.expire_overdue_offers(now).await?,
            requests_expired: self
                .ctx
                .store
                .expire_stale_requests(now.date_naive())
                .await?,
        };
        if report.is_empty() {
            debug!("expiry sweep found nothing");
        } else {
            info!(
                offers_expired = report.offers_expired,
                requests_expired = report.requests_expired,
                "expiry sweep"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Clock, ManualClock, SeededEntropy};
    use crate::fleet::{FleetService, NewTruck};
    use crate::notify::NotificationKind;
    use crate::notify::mock::RecordingSink;
    use crate::profile::{NewUser, ProfileId, ProfileService, Role};
    use crate::request::{Place, RequestService, ShipmentRequestDraft};
    use chrono::{Duration, NaiveDate, TimeZone};

    struct Fixture {
        ctx: Arc<FreightContext>,
        clock: Arc<ManualClock>,
        sink: Arc<RecordingSink>,
        engine: OfferEngine,
        requests: RequestService,
        fleet: FleetService,
        profiles: ProfileService,
    }

    fn fixture() -> Fixture {
        let sink = Arc::new(RecordingSink::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap(),
        ));
        let ctx = Arc::new(FreightContext::in_memory(
            sink.clone(),
            clock.clone(),
            Arc::new(SeededEntropy::new(5)),
        ));
        Fixture {
            engine: OfferEngine::new(ctx.clone()),
            requests: RequestService::new(ctx.clone()),
            fleet: FleetService::new(ctx.clone()),
            profiles: ProfileService::new(ctx.clone()),
            ctx,
            clock,
            sink,
        }
    }

    async fn register(f: &Fixture, phone: &str, role: Role) -> ProfileId {
        f.profiles
            .register(
                NewUser {
                    full_name: format!("user {phone}"),
                    phone_number: phone.into(),
                    email: None,
                },
                role,
            )
            .await
            .unwrap()
            .1
    }

    async fn merchant(f: &Fixture, phone: &str) -> MerchantId {
        match register(f, phone, Role::Merchant).await {
            ProfileId::Merchant(id) => id,
            other => panic!("unexpected {other:?}"),
        }
    }

    async fn carrier(f: &Fixture, phone: &str, with_truck: bool) -> CarrierId {
        let id = match register(f, phone, Role::TruckAccount).await {
            ProfileId::TruckAccount(id) => id,
            other => panic!("unexpected {other:?}"),
        };
        if with_truck {
            f.fleet
                .add_truck(
                    id,
                    NewTruck {
                        truck_type: "box".into(),
                        max_weight_kg: Decimal::new(3000, 0),
                        plate_number: format!("P-{phone}"),
                    },
                )
                .await
                .unwrap();
        }
        id
    }

    async fn open_request(f: &Fixture, m: MerchantId) -> ShipmentRequest {
        let draft = ShipmentRequestDraft {
            required_truck_type: None,
            pickup: Place {
                address: "A".into(),
                ..Default::default()
            },
            dropoff: Place {
                address: "B".into(),
                ..Default::default()
            },
            sender_name: "S".into(),
            sender_phone: "1".into(),
            cargo_description: "boxes".into(),
            parcel_type: None,
            weight_kg: Decimal::new(50, 0),
            size: None,
            count: 2,
            delivery_date: NaiveDate::from_ymd_opt(2025, 5, 11).unwrap(),
            time_from: None,
            time_to: None,
            payment_method: "cash".into(),
            notes: None,
        };
        f.requests.create(m, draft).await.unwrap()
    }

    fn bid(request_id: RequestId, price: i64) -> OfferSubmission {
        OfferSubmission {
            request_id,
            price: Decimal::new(price, 0),
            notes: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_submit_defaults_expiry_and_notifies() {
        let f = fixture();
        let m = merchant(&f, "m").await;
        let c = carrier(&f, "c", true).await;
        let r = open_request(&f, m).await;

        let offer = f.engine.submit(c, bid(r.id, 100)).await.unwrap();
        assert_eq!(offer.status, OfferStatus::Pending);
        assert_eq!(offer.expires_at, f.clock.now() + Duration::days(7));
        assert_eq!(f.sink.count_of(NotificationKind::OfferReceived), 1);
    }

    #[tokio::test]
    async fn test_submit_preconditions() {
        let f = fixture();
        let m = merchant(&f, "m").await;
        let r = open_request(&f, m).await;

        let idle = carrier(&f, "idle", false).await;
        assert!(matches!(
            f.engine.submit(idle, bid(r.id, 100)).await,
            Err(FreightError::InvalidState(_))
        ));

        let c = carrier(&f, "c", true).await;
        assert!(matches!(
            f.engine.submit(c, bid(r.id, 0)).await,
            Err(FreightError::ValidationFailed(_))
        ));
        let mut past = bid(r.id, 10);
        past.expires_at = Some(f.clock.now());
        assert!(matches!(
            f.engine.submit(c, past).await,
            Err(FreightError::ValidationFailed(_))
        ));

        f.engine.submit(c, bid(r.id, 100)).await.unwrap();
        assert!(matches!(
            f.engine.submit(c, bid(r.id, 90)).await,
            Err(FreightError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_accept_rejects_siblings() {
        let f = fixture();
        let m = merchant(&f, "m").await;
        let a = carrier(&f, "a", true).await;
        let b = carrier(&f, "b", true).await;
        let r = open_request(&f, m).await;
        let oa = f.engine.submit(a, bid(r.id, 100)).await.unwrap();
        let ob = f.engine.submit(b, bid(r.id, 120)).await.unwrap();

        let accepted = f.engine.accept(m, r.id, oa.id).await.unwrap();
        assert_eq!(accepted.rejected_count, 1);
        assert_eq!(accepted.shipment.status, ShipmentStatus::AwaitingDriver);

        let store = &f.ctx.store;
        let truck = store.get_truck(accepted.shipment.truck_id).await.unwrap().unwrap();
        assert_eq!(truck.carrier_id, a);
        assert!(truck.is_active);
        assert_eq!(
            store.get_offer(ob.id).await.unwrap().unwrap().status,
            OfferStatus::Rejected
        );
        assert_eq!(
            store.get_request(r.id).await.unwrap().unwrap().status,
            RequestStatus::OfferAccepted
        );
        assert_eq!(f.sink.count_of(NotificationKind::OfferAccepted), 1);

        let again = f.engine.accept(m, r.id, ob.id).await.unwrap_err();
        assert!(matches!(again, FreightError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_accept_scoping() {
        let f = fixture();
        let owner = merchant(&f, "m1").await;
        let other = merchant(&f, "m2").await;
        let c = carrier(&f, "c", true).await;
        let r1 = open_request(&f, owner).await;
        let r2 = open_request(&f, owner).await;
        let offer = f.engine.submit(c, bid(r1.id, 100)).await.unwrap();

        assert!(matches!(
            f.engine.accept(other, r1.id, offer.id).await,
            Err(FreightError::NotFound(_))
        ));
        assert!(matches!(
            f.engine.accept(owner, r2.id, offer.id).await,
            Err(FreightError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_accept_overdue_offer_expires_it() {
        let f = fixture();
        let m = merchant(&f, "m").await;
        let c = carrier(&f, "c", true).await;
        let r = open_request(&f, m).await;
        let mut short = bid(r.id, 100);
        short.expires_at = Some(f.clock.now() + Duration::hours(1));
        let offer = f.engine.submit(c, short).await.unwrap();

        f.clock.advance(Duration::hours(2));
        let err = f.engine.accept(m, r.id, offer.id).await.unwrap_err();
        assert!(matches!(err, FreightError::InvalidState(_)));
        assert_eq!(
            f.ctx.store.get_offer(offer.id).await.unwrap().unwrap().status,
            OfferStatus::Expired
        );
    }

    #[tokio::test]
    async fn test_accept_requires_active_truck() {
        let f = fixture();
        let m = merchant(&f, "m").await;
        let c = carrier(&f, "c", true).await;
        let r = open_request(&f, m).await;
        let offer = f.engine.submit(c, bid(r.id, 100)).await.unwrap();

        let truck = f.fleet.list_trucks(c).await.unwrap().remove(0);
        f.fleet.set_truck_active(c, truck.id, false).await.unwrap();

        let err = f.engine.accept(m, r.id, offer.id).await.unwrap_err();
        assert!(matches!(err, FreightError::InvalidState(_)));
        assert_eq!(
            f.ctx.store.get_request(r.id).await.unwrap().unwrap().status,
            RequestStatus::Open
        );
    }

    #[tokio::test]
    async fn test_accept_skips_inactive_truck() {
        let f = fixture();
        let m = merchant(&f, "m").await;
        let c = carrier(&f, "c", true).await;
        f.clock.advance(Duration::minutes(1));
        let spare = f
            .fleet
            .add_truck(
                c,
                NewTruck {
                    truck_type: "box".into(),
                    max_weight_kg: Decimal::new(3000, 0),
                    plate_number: "P-SPARE".into(),
                },
            )
            .await
            .unwrap();
        let r = open_request(&f, m).await;
        let offer = f.engine.submit(c, bid(r.id, 100)).await.unwrap();

        // The older truck would win, but it goes out of service before acceptance
        let first = f
            .fleet
            .list_trucks(c)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.id != spare.id)
            .unwrap();
        f.fleet.set_truck_active(c, first.id, false).await.unwrap();

        let accepted = f.engine.accept(m, r.id, offer.id).await.unwrap();
        assert_eq!(accepted.shipment.truck_id, spare.id);
    }

    #[tokio::test]
    async fn test_store_refuses_shipment_on_unavailable_truck() {
        let f = fixture();
        let m = merchant(&f, "m").await;
        let c = carrier(&f, "c", true).await;
        let other = carrier(&f, "o", true).await;
        let r = open_request(&f, m).await;
        let offer = f.engine.submit(c, bid(r.id, 100)).await.unwrap();
        let truck = f.fleet.list_trucks(c).await.unwrap().remove(0);
        let foreign = f.fleet.list_trucks(other).await.unwrap().remove(0);

        let acceptance = |truck_id| OfferAcceptance {
            request_id: r.id,
            offer_id: offer.id,
            shipment: Shipment {
                id: ShipmentId::new(),
                request_id: r.id,
                accepted_offer_id: offer.id,
                truck_id,
                driver_id: None,
                status: ShipmentStatus::AwaitingDriver,
                created_at: f.clock.now(),
                started_at: None,
                completed_at: None,
                cancelled_at: None,
                current_location: None,
                location_updated_at: None,
            },
        };

        // Truck picked, then deactivated before the commit
        f.fleet.set_truck_active(c, truck.id, false).await.unwrap();
        let err = f.ctx.store.accept_offer(&acceptance(truck.id)).await.unwrap_err();
        assert!(matches!(err, FreightError::Conflict(_)));

        let err = f.ctx.store.accept_offer(&acceptance(foreign.id)).await.unwrap_err();
        assert!(matches!(err, FreightError::Conflict(_)));

        let store = &f.ctx.store;
        assert_eq!(
            store.get_request(r.id).await.unwrap().unwrap().status,
            RequestStatus::Open
        );
        assert_eq!(
            store.get_offer(offer.id).await.unwrap().unwrap().status,
            OfferStatus::Pending
        );
        assert!(store.shipment_for_request(r.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_request_enriched() {
        let f = fixture();
        let m = merchant(&f, "m").await;
        let c = carrier(&f, "c", true).await;
        let r = open_request(&f, m).await;
        f.engine.submit(c, bid(r.id, 100)).await.unwrap();

        let page = f
            .engine
            .list_for_request(m, r.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].carrier_name, "user c");
        assert_eq!(page.items[0].active_truck_count, 1);
    }

    #[tokio::test]
    async fn test_sweep_expires_offers_and_requests() {
        let f = fixture();
        let m = merchant(&f, "m").await;
        let c = carrier(&f, "c", true).await;
        let r = open_request(&f, m).await;
        f.engine.submit(c, bid(r.id, 100)).await.unwrap();

        assert!(f.engine.sweep_once(f.clock.now()).await.unwrap().is_empty());

        // Delivery date (May 11) passes before the 7 day offer lifetime.
        f.clock.advance(Duration::days(2));
        let report = f.engine.sweep_once(f.clock.now()).await.unwrap();
        assert_eq!(report.requests_expired, 1);
        assert_eq!(
            f.ctx.store.get_request(r.id).await.unwrap().unwrap().status,
            RequestStatus::Expired
        );
        let mine = f.engine.list_mine(c, PageRequest::default()).await.unwrap();
        assert_eq!(mine.items[0].status, OfferStatus::Expired);
    }
}
