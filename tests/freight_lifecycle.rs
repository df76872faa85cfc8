//! End-to-end lifecycle over the in-memory store: request → offers →
//! acceptance → driver → delivery, plus the races and rejections around it.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use hm_freight::environment::{Clock, ManualClock, SeededEntropy};
use hm_freight::fleet::NewTruck;
use hm_freight::notify::mock::{FailingSink, RecordingSink};
use hm_freight::notify::{NotificationKind, NotificationSink};
use hm_freight::offer::{OfferStatus, OfferSubmission};
use hm_freight::profile::{NewUser, ProfileId, Role};
use hm_freight::request::{Place, RequestStatus, ShipmentRequest, ShipmentRequestDraft};
use hm_freight::shipment::{NewDriver, ShipmentStatus};
use hm_freight::{
    CarrierId, FreightContext, FreightError, FreightServices, MerchantId, PageRequest, UserId,
};

struct World {
    svc: FreightServices,
    clock: Arc<ManualClock>,
}

fn world_with(sink: Arc<dyn NotificationSink>) -> World {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
    ));
    let ctx = Arc::new(FreightContext::in_memory(
        sink,
        clock.clone(),
        Arc::new(SeededEntropy::new(2025)),
    ));
    World {
        svc: FreightServices::new(ctx),
        clock,
    }
}

fn world() -> (World, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    (world_with(sink.clone()), sink)
}

async fn register(w: &World, phone: &str, role: Role) -> (UserId, ProfileId) {
    let (user, pid) = w
        .svc
        .profiles
        .register(
            NewUser {
                full_name: format!("Person {phone}"),
                phone_number: phone.to_string(),
                email: None,
            },
            role,
        )
        .await
        .unwrap();
    (user.id, pid)
}

async fn merchant(w: &World, phone: &str) -> MerchantId {
    match register(w, phone, Role::Merchant).await.1 {
        ProfileId::Merchant(id) => id,
        other => panic!("unexpected {other:?}"),
    }
}

/// Truck account with one active truck
async fn carrier(w: &World, phone: &str) -> (UserId, CarrierId) {
    let (user_id, pid) = register(w, phone, Role::TruckAccount).await;
    let carrier_id = match pid {
        ProfileId::TruckAccount(id) => id,
        other => panic!("unexpected {other:?}"),
    };
    w.svc
        .fleet
        .add_truck(
            carrier_id,
            NewTruck {
                truck_type: "flatbed".into(),
                max_weight_kg: Decimal::new(12_000, 0),
                plate_number: format!("TRK-{phone}"),
            },
        )
        .await
        .unwrap();
    (user_id, carrier_id)
}

fn draft() -> ShipmentRequestDraft {
    ShipmentRequestDraft {
        required_truck_type: Some("flatbed".into()),
        pickup: Place {
            address: "Warehouse 4, Port Road".into(),
            area: Some("Harbour".into()),
            ..Default::default()
        },
        dropoff: Place {
            address: "Mall loading bay".into(),
            ..Default::default()
        },
        sender_name: "Dana".into(),
        sender_phone: "0500000000".into(),
        cargo_description: "Tiles".into(),
        parcel_type: Some("pallet".into()),
        weight_kg: Decimal::new(50, 0),
        size: None,
        count: 2,
        delivery_date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
        time_from: None,
        time_to: None,
        payment_method: "bank_transfer".into(),
        notes: None,
    }
}

async fn post_request(w: &World, m: MerchantId) -> ShipmentRequest {
    w.svc.requests.create(m, draft()).await.unwrap()
}

fn bid(request: &ShipmentRequest, price: i64) -> OfferSubmission {
    OfferSubmission {
        request_id: request.id,
        price: Decimal::new(price, 0),
        notes: None,
        expires_at: None,
    }
}

#[tokio::test]
async fn merchant_to_delivery_with_self_assigned_carrier() {
    let (w, sink) = world();
    let m = merchant(&w, "m1").await;
    let (a_user, a) = carrier(&w, "a").await;
    let (_, b) = carrier(&w, "b").await;

    let request = post_request(&w, m).await;
    assert_eq!(request.status, RequestStatus::Open);
    assert!(request.request_number.starts_with("HM"));
    assert_eq!(request.request_number.len(), 8);
    assert!(request.request_number[2..].chars().all(|c| c.is_ascii_digit()));
    // Both carriers hear about it
    assert_eq!(sink.count_of(NotificationKind::NewRequestAvailable), 2);

    let offer_a = w.svc.offers.submit(a, bid(&request, 100)).await.unwrap();
    let offer_b = w.svc.offers.submit(b, bid(&request, 120)).await.unwrap();
    assert_eq!(sink.count_of(NotificationKind::OfferReceived), 2);

    let accepted = w.svc.offers.accept(m, request.id, offer_a.id).await.unwrap();
    assert_eq!(accepted.offer.status, OfferStatus::Accepted);
    assert_eq!(accepted.rejected_count, 1);
    assert_eq!(accepted.shipment.status, ShipmentStatus::AwaitingDriver);

    let store = &w.svc.ctx.store;
    let sibling = store.get_offer(offer_b.id).await.unwrap().unwrap();
    assert_eq!(sibling.status, OfferStatus::Rejected);
    let r = store.get_request(request.id).await.unwrap().unwrap();
    assert_eq!(r.status, RequestStatus::OfferAccepted);

    let shipment = accepted.shipment;
    let s = w
        .svc
        .shipments
        .assign_self(a, shipment.id, shipment.truck_id)
        .await
        .unwrap();
    assert_eq!(s.status, ShipmentStatus::Ready);
    assert!(s.driver_id.is_some());

    let s = w.svc.shipments.start(a_user, shipment.id).await.unwrap();
    assert_eq!(s.status, ShipmentStatus::InTransit);
    assert!(s.started_at.is_some());
    let r = store.get_request(request.id).await.unwrap().unwrap();
    assert_eq!(r.status, RequestStatus::InProgress);

    w.clock.advance(Duration::minutes(40));
    w.svc
        .shipments
        .update_location(a_user, shipment.id, 24.7, 46.6)
        .await
        .unwrap();
    let s = w.svc.shipments.arrive(a_user, shipment.id).await.unwrap();
    assert_eq!(s.status, ShipmentStatus::Arrived);
    let s = w.svc.shipments.complete(a_user, shipment.id).await.unwrap();
    assert_eq!(s.status, ShipmentStatus::Completed);
    assert!(s.completed_at.is_some());

    let r = store.get_request(request.id).await.unwrap().unwrap();
    assert_eq!(r.status, RequestStatus::Completed);

    let tracking = w
        .svc
        .shipments
        .tracking_for_merchant(m, shipment.id)
        .await
        .unwrap();
    assert_eq!(tracking.status, ShipmentStatus::Completed);
}

#[tokio::test]
async fn accepting_twice_fails_and_keeps_one_shipment() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let (_, b) = carrier(&w, "b").await;
    let request = post_request(&w, m).await;
    let offer_a = w.svc.offers.submit(a, bid(&request, 300)).await.unwrap();
    let offer_b = w.svc.offers.submit(b, bid(&request, 310)).await.unwrap();

    w.svc.offers.accept(m, request.id, offer_a.id).await.unwrap();

    let again = w.svc.offers.accept(m, request.id, offer_a.id).await;
    assert!(matches!(again, Err(FreightError::InvalidState(_))));
    let sibling = w.svc.offers.accept(m, request.id, offer_b.id).await;
    assert!(matches!(sibling, Err(FreightError::InvalidState(_))));

    let shipments = w
        .svc
        .shipments
        .list_for_carrier(a, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(shipments.items.len(), 1);
    let none = w
        .svc
        .shipments
        .list_for_carrier(b, PageRequest::default())
        .await
        .unwrap();
    assert!(none.items.is_empty());
}

#[tokio::test]
async fn concurrent_accepts_produce_exactly_one_winner() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let request = post_request(&w, m).await;
    let mut offer_ids = Vec::new();
    for phone in ["a", "b", "c", "d"] {
        let (_, c) = carrier(&w, phone).await;
        offer_ids.push(w.svc.offers.submit(c, bid(&request, 100)).await.unwrap().id);
    }

    let mut set = tokio::task::JoinSet::new();
    for offer_id in offer_ids {
        let offers = w.svc.offers.clone();
        let request_id = request.id;
        set.spawn(async move { offers.accept(m, request_id, offer_id).await });
    }
    let mut wins = 0;
    while let Some(res) = set.join_next().await {
        match res.unwrap() {
            Ok(_) => wins += 1,
            Err(FreightError::InvalidState(_)) | Err(FreightError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(wins, 1);
}

#[tokio::test]
async fn duplicate_offer_is_a_conflict() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let request = post_request(&w, m).await;

    w.svc.offers.submit(a, bid(&request, 200)).await.unwrap();
    let dup = w.svc.offers.submit(a, bid(&request, 180)).await;
    assert!(matches!(dup, Err(FreightError::Conflict(_))));
}

#[tokio::test]
async fn offers_on_cancelled_request_are_refused() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let (_, b) = carrier(&w, "b").await;
    let request = post_request(&w, m).await;
    let pending = w.svc.offers.submit(a, bid(&request, 200)).await.unwrap();

    let cancelled = w.svc.requests.cancel(m, request.id).await.unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    let rejected = w.svc.ctx.store.get_offer(pending.id).await.unwrap().unwrap();
    assert_eq!(rejected.status, OfferStatus::Rejected);

    let late = w.svc.offers.submit(b, bid(&request, 150)).await;
    assert!(matches!(late, Err(FreightError::InvalidState(_))));
}

#[tokio::test]
async fn trip_steps_out_of_order_are_rejected() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (a_user, a) = carrier(&w, "a").await;
    let request = post_request(&w, m).await;
    let offer = w.svc.offers.submit(a, bid(&request, 200)).await.unwrap();
    let shipment = w
        .svc
        .offers
        .accept(m, request.id, offer.id)
        .await
        .unwrap()
        .shipment;

    // No driver yet
    let early = w.svc.shipments.start(a_user, shipment.id).await;
    assert!(early.is_err());

    w.svc
        .shipments
        .assign_self(a, shipment.id, shipment.truck_id)
        .await
        .unwrap();
    let complete_before_start = w.svc.shipments.complete(a_user, shipment.id).await;
    assert!(matches!(
        complete_before_start,
        Err(FreightError::InvalidState(_))
    ));
    let arrive_before_start = w.svc.shipments.arrive(a_user, shipment.id).await;
    assert!(matches!(
        arrive_before_start,
        Err(FreightError::InvalidState(_))
    ));

    w.svc.shipments.start(a_user, shipment.id).await.unwrap();
    let cancel_on_road = w.svc.shipments.cancel(a, shipment.id, None).await;
    assert!(matches!(cancel_on_road, Err(FreightError::InvalidState(_))));

    w.svc.shipments.pause(a_user, shipment.id).await.unwrap();
    let arrive_while_paused = w.svc.shipments.arrive(a_user, shipment.id).await;
    assert!(matches!(
        arrive_while_paused,
        Err(FreightError::InvalidState(_))
    ));
    let s = w.svc.shipments.resume(a_user, shipment.id).await.unwrap();
    assert_eq!(s.status, ShipmentStatus::InTransit);
}

#[tokio::test]
async fn carrier_cancel_before_trip_cancels_request() {
    let (w, sink) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let request = post_request(&w, m).await;
    let offer = w.svc.offers.submit(a, bid(&request, 200)).await.unwrap();
    let shipment = w
        .svc
        .offers
        .accept(m, request.id, offer.id)
        .await
        .unwrap()
        .shipment;

    let s = w
        .svc
        .shipments
        .cancel(a, shipment.id, Some("truck broke down".into()))
        .await
        .unwrap();
    assert_eq!(s.status, ShipmentStatus::Cancelled);
    assert!(s.cancelled_at.is_some());
    let r = w.svc.ctx.store.get_request(request.id).await.unwrap().unwrap();
    assert_eq!(r.status, RequestStatus::Cancelled);
    assert_eq!(sink.count_of(NotificationKind::ShipmentCancelled), 1);
}

#[tokio::test]
async fn concurrent_requests_get_distinct_numbers() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;

    let mut set = tokio::task::JoinSet::new();
    for _ in 0..32 {
        let requests = w.svc.requests.clone();
        set.spawn(async move { requests.create(m, draft()).await });
    }
    let mut numbers = std::collections::HashSet::new();
    while let Some(res) = set.join_next().await {
        let request = res.unwrap().unwrap();
        assert!(request.request_number.starts_with("HM"));
        assert!(numbers.insert(request.request_number));
    }
    assert_eq!(numbers.len(), 32);
}

#[tokio::test]
async fn invitation_is_single_use_and_exclusive() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let request = post_request(&w, m).await;
    let offer = w.svc.offers.submit(a, bid(&request, 200)).await.unwrap();
    let shipment = w
        .svc
        .offers
        .accept(m, request.id, offer.id)
        .await
        .unwrap()
        .shipment;

    let invitation = w
        .svc
        .shipments
        .generate_invitation(a, shipment.id)
        .await
        .unwrap();
    assert!(!invitation.token.is_empty());

    // One live invitation per shipment
    let second = w.svc.shipments.generate_invitation(a, shipment.id).await;
    assert!(matches!(second, Err(FreightError::Conflict(_))));

    let new_driver = |phone: &str| NewDriver {
        full_name: "Omar".into(),
        phone_number: phone.into(),
        email: None,
    };
    let (user, driver, s) = w
        .svc
        .shipments
        .redeem_invitation(&invitation.token, new_driver("0555"))
        .await
        .unwrap();
    assert_eq!(s.status, ShipmentStatus::Ready);
    assert_eq!(s.driver_id, Some(driver.id));

    let reuse = w
        .svc
        .shipments
        .redeem_invitation(&invitation.token, new_driver("0556"))
        .await;
    assert!(matches!(reuse, Err(FreightError::Conflict(_))));

    // The driver is bound for good: no new invitation, no self-assign over it
    let reissue = w.svc.shipments.generate_invitation(a, shipment.id).await;
    assert!(matches!(reissue, Err(FreightError::InvalidState(_))));
    let takeover = w
        .svc
        .shipments
        .assign_self(a, shipment.id, shipment.truck_id)
        .await;
    assert!(matches!(takeover, Err(FreightError::InvalidState(_))));

    // The invited driver runs the trip
    let s = w.svc.shipments.start(user.id, shipment.id).await.unwrap();
    assert_eq!(s.status, ShipmentStatus::InTransit);
}

#[tokio::test]
async fn self_assigning_twice_is_rejected() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let request = post_request(&w, m).await;
    let offer = w.svc.offers.submit(a, bid(&request, 100)).await.unwrap();
    let shipment = w
        .svc
        .offers
        .accept(m, request.id, offer.id)
        .await
        .unwrap()
        .shipment;

    let first = w
        .svc
        .shipments
        .assign_self(a, shipment.id, shipment.truck_id)
        .await
        .unwrap();
    assert_eq!(first.status, ShipmentStatus::Ready);

    let second = w
        .svc
        .shipments
        .assign_self(a, shipment.id, shipment.truck_id)
        .await;
    assert!(matches!(second, Err(FreightError::InvalidState(_))));
    let stored = w.svc.ctx.store.get_shipment(shipment.id).await.unwrap().unwrap();
    assert_eq!(stored.driver_id, first.driver_id);
}

#[tokio::test]
async fn acceptance_binds_an_active_truck() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let request = post_request(&w, m).await;
    let offer = w.svc.offers.submit(a, bid(&request, 100)).await.unwrap();

    // A second flatbed joins, then the original goes out of service
    let old = w.svc.fleet.list_trucks(a).await.unwrap().remove(0);
    w.clock.advance(Duration::minutes(10));
    let spare = w
        .svc
        .fleet
        .add_truck(
            a,
            NewTruck {
                truck_type: "flatbed".into(),
                max_weight_kg: Decimal::new(12_000, 0),
                plate_number: "TRK-SPARE".into(),
            },
        )
        .await
        .unwrap();
    w.svc.fleet.set_truck_active(a, old.id, false).await.unwrap();

    let accepted = w.svc.offers.accept(m, request.id, offer.id).await.unwrap();
    assert_eq!(accepted.shipment.truck_id, spare.id);
    let truck = w
        .svc
        .ctx
        .store
        .get_truck(accepted.shipment.truck_id)
        .await
        .unwrap()
        .unwrap();
    assert!(truck.is_active);
    assert_eq!(truck.carrier_id, a);
}

#[tokio::test]
async fn expired_invitation_frees_the_slot() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let request = post_request(&w, m).await;
    let offer = w.svc.offers.submit(a, bid(&request, 200)).await.unwrap();
    let shipment = w
        .svc
        .offers
        .accept(m, request.id, offer.id)
        .await
        .unwrap()
        .shipment;

    let stale = w
        .svc
        .shipments
        .generate_invitation(a, shipment.id)
        .await
        .unwrap();
    w.clock.advance(Duration::hours(25));

    let redeem = w
        .svc
        .shipments
        .redeem_invitation(
            &stale.token,
            NewDriver {
                full_name: "Late".into(),
                phone_number: "0777".into(),
                email: None,
            },
        )
        .await;
    assert!(matches!(redeem, Err(FreightError::NotFound(_))));

    let fresh = w
        .svc
        .shipments
        .generate_invitation(a, shipment.id)
        .await
        .unwrap();
    assert_ne!(fresh.token, stale.token);
}

#[tokio::test]
async fn stranger_cannot_drive_the_shipment() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let (b_user, _) = carrier(&w, "b").await;
    let request = post_request(&w, m).await;
    let offer = w.svc.offers.submit(a, bid(&request, 200)).await.unwrap();
    let shipment = w
        .svc
        .offers
        .accept(m, request.id, offer.id)
        .await
        .unwrap()
        .shipment;
    w.svc
        .shipments
        .assign_self(a, shipment.id, shipment.truck_id)
        .await
        .unwrap();

    let other = w.svc.shipments.start(b_user, shipment.id).await;
    assert!(matches!(other, Err(FreightError::Unauthorized(_))));

    let other_merchant = merchant(&w, "m2").await;
    let peek = w
        .svc
        .shipments
        .tracking_for_merchant(other_merchant, shipment.id)
        .await;
    assert!(matches!(peek, Err(FreightError::NotFound(_))));
}

#[tokio::test]
async fn failing_notifications_never_undo_the_transition() {
    let sink = Arc::new(FailingSink::default());
    let w = world_with(sink.clone());
    let m = merchant(&w, "m1").await;
    let (a_user, a) = carrier(&w, "a").await;

    let request = post_request(&w, m).await;
    let offer = w.svc.offers.submit(a, bid(&request, 200)).await.unwrap();
    let accepted = w.svc.offers.accept(m, request.id, offer.id).await.unwrap();
    let id = accepted.shipment.id;
    w.svc
        .shipments
        .assign_self(a, id, accepted.shipment.truck_id)
        .await
        .unwrap();
    w.svc.shipments.start(a_user, id).await.unwrap();
    w.svc.shipments.arrive(a_user, id).await.unwrap();
    let s = w.svc.shipments.complete(a_user, id).await.unwrap();

    assert_eq!(s.status, ShipmentStatus::Completed);
    assert!(sink.attempts() > 0);
}

#[tokio::test]
async fn sweeper_expires_overdue_offers() {
    let (w, _) = world();
    let m = merchant(&w, "m1").await;
    let (_, a) = carrier(&w, "a").await;
    let request = post_request(&w, m).await;
    let now = w.clock.now();
    let offer = w
        .svc
        .offers
        .submit(
            a,
            OfferSubmission {
                expires_at: Some(now + Duration::hours(1)),
                ..bid(&request, 200)
            },
        )
        .await
        .unwrap();

    w.clock.advance(Duration::hours(2));
    let report = w.svc.offers.sweep_once(w.clock.now()).await.unwrap();
    assert_eq!(report.offers_expired, 1);

    let expired = w.svc.ctx.store.get_offer(offer.id).await.unwrap().unwrap();
    assert_eq!(expired.status, OfferStatus::Expired);
    let late = w.svc.offers.accept(m, request.id, offer.id).await;
    assert!(matches!(late, Err(FreightError::InvalidState(_))));
}
