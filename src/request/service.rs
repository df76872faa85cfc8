//! Shipment Request Store
//!
//! Creation validates, numbers and persists a request, then announces it.
//! Listing enriches each row with its offer count.

use std::sync::Arc;

use tracing::{info, warn};

use super::number;
use super::state::RequestStatus;
use super::types::{
    RequestDetails, RequestQuery, RequestSummary, ShipmentRequest, ShipmentRequestDraft,
    to_details, to_summary,
};
use super::validation::validate_draft;
use crate::context::FreightContext;
use crate::core_types::{CarrierId, MerchantId, Page, PageRequest, RequestId};
use crate::error::{FreightError, FreightResult};
use crate::logging::AUDIT_TARGET;
use crate::notify::Message;

#[derive(Clone)]
pub struct RequestService {
    ctx: Arc<FreightContext>,
}

impl RequestService {
    pub fn new(ctx: Arc<FreightContext>) -> Self {
        Self { ctx }
    }

    /// Validate, number and persist a new request in status `Open`
    pub async fn create(
        &self,
        merchant_id: MerchantId,
        draft: ShipmentRequestDraft,
    ) -> FreightResult<ShipmentRequest> {
        let v = validate_draft(draft, self.ctx.clock.today())?;
        let merchant = self
            .ctx
            .store
            .get_merchant(merchant_id)
            .await?
            .ok_or_else(|| FreightError::not_found("merchant profile"))?;

        let mut request = ShipmentRequest {
            id: RequestId::new(),
            merchant_id,
            request_number: String::new(),
            required_truck_type: v.required_truck_type,
            pickup: v.pickup,
            dropoff: v.dropoff,
            sender_name: v.sender_name,
            sender_phone: v.sender_phone,
            cargo: v.cargo,
            delivery: v.delivery,
            payment_method: v.payment_method,
            notes: v.notes,
            status: RequestStatus::Open,
            created_at: self.ctx.clock.now(),
        };
        self.insert_numbered(&mut request).await?;

        info!(
            request_id = %request.id,
            request_number = %request.request_number,
            merchant_id = %merchant_id,
            "shipment request created"
        );
        info!(target: AUDIT_TARGET, request_id = %request.id, to = %request.status, "request opened");

        self.ctx
            .notifier
            .dispatch(merchant.user_id, &Message::request_submitted(&request))
            .await;
        self.announce(&request).await;
        Ok(request)
    }

    /// Try random candidates, then one wide fallback. The unique index has
    /// the final say, so a lost insert race simply consumes an attempt.
    async fn insert_numbered(&self, request: &mut ShipmentRequest) -> FreightResult<()> {
        let entropy = self.ctx.entropy.as_ref();
        for attempt in 0..self.ctx.policy.request_number_attempts {
            let candidate = number::candidate(entropy);
            if self.ctx.store.request_number_exists(&candidate).await? {
                continue;
            }
            request.request_number = candidate;
            match self.ctx.store.insert_request(request).await {
                Ok(()) => return Ok(()),
                Err(FreightError::Conflict(_)) => {
                    warn!(attempt, number = %request.request_number, "request number collision");
                }
                Err(e) => return Err(e),
            }
        }

        request.request_number = number::fallback(entropy);
        warn!(number = %request.request_number, "request number attempts exhausted, using fallback");
        self.ctx.store.insert_request(request).await
    }

    /// Tell every carrier with an active truck. Best-effort.
    async fn announce(&self, request: &ShipmentRequest) {
        match self.ctx.store.carriers_with_active_trucks().await {
            Ok(carriers) => {
                let users: Vec<_> = carriers.iter().map(|c| c.user_id).collect();
                self.ctx
                    .notifier
                    .broadcast(&users, &Message::new_request_available(request))
                    .await;
            }
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "could not resolve carriers to notify");
            }
        }
    }

    async fn summaries(&self, page: Page<ShipmentRequest>) -> FreightResult<Page<RequestSummary>> {
        let ids: Vec<RequestId> = page.items.iter().map(|r| r.id).collect();
        let counts = self.ctx.store.offer_counts(&ids).await?;
        Ok(page.map(|r| to_summary(&r, counts.get(&r.id).copied().unwrap_or(0))))
    }

    async fn details(&self, request: ShipmentRequest) -> FreightResult<RequestDetails> {
        let counts = self.ctx.store.offer_counts(&[request.id]).await?;
        let shipment = self.ctx.store.shipment_for_request(request.id).await?;
        let offers = counts.get(&request.id).copied().unwrap_or(0);
        Ok(to_details(request, offers, shipment.map(|s| s.id)))
    }

    /// Request owned by the merchant; someone else's is `NotFound`
    pub async fn owned(&self, merchant_id: MerchantId, id: RequestId) -> FreightResult<ShipmentRequest> {
        match self.ctx.store.get_request(id).await? {
            Some(r) if r.merchant_id == merchant_id => Ok(r),
            _ => Err(FreightError::not_found("shipment request")),
        }
    }

    pub async fn list_mine(
        &self,
        merchant_id: MerchantId,
        status: Option<RequestStatus>,
        page: PageRequest,
    ) -> FreightResult<Page<RequestSummary>> {
        let query = RequestQuery {
            merchant_id: Some(merchant_id),
            status,
            ..Default::default()
        };
        let found = self.ctx.store.list_requests(&query, page).await?;
        self.summaries(found).await
    }

    pub async fn get_mine(&self, merchant_id: MerchantId, id: RequestId) -> FreightResult<RequestDetails> {
        let request = self.owned(merchant_id, id).await?;
        self.details(request).await
    }

    /// Carrier browse: open requests only, newest first
    pub async fn browse_open(
        &self,
        mut query: RequestQuery,
        page: PageRequest,
    ) -> FreightResult<Page<RequestSummary>> {
        query.merchant_id = None;
        query.status = Some(RequestStatus::Open);
        let found = self.ctx.store.list_requests(&query, page).await?;
        self.summaries(found).await
    }

    /// Carriers see open requests and those they already bid on
    pub async fn get_for_carrier(&self, carrier_id: CarrierId, id: RequestId) -> FreightResult<RequestDetails> {
        let request = self
            .ctx
            .store
            .get_request(id)
            .await?
            .ok_or_else(|| FreightError::not_found("shipment request"))?;
        if request.status != RequestStatus::Open
            && self.ctx.store.find_offer(id, carrier_id).await?.is_none()
        {
            return Err(FreightError::not_found("shipment request"));
        }
        self.details(request).await
    }

    /// Cancel a Draft/Open request; its pending offers are rejected
    pub async fn cancel(&self, merchant_id: MerchantId, id: RequestId) -> FreightResult<ShipmentRequest> {
        let mut request = self.owned(merchant_id, id).await?;
        if !request.status.is_cancellable() {
            return Err(FreightError::invalid_state(format!(
                "cannot cancel a request in status {}",
                request.status
            )));
        }
        let rejected = self.ctx.store.cancel_request(id).await?;
        let from = request.status;
        request.status = RequestStatus::Cancelled;

        info!(request_id = %id, rejected_offers = rejected, "shipment request cancelled");
        info!(target: AUDIT_TARGET, request_id = %id, from = %from, to = %request.status, "request cancelled");
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{ManualClock, SeededEntropy};
    use crate::notify::NotificationKind;
    use crate::notify::mock::RecordingSink;
    use crate::profile::{NewUser, ProfileId, ProfileService, Role};
    use crate::request::Place;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    struct Fixture {
        svc: RequestService,
        profiles: ProfileService,
        sink: Arc<RecordingSink>,
    }

    fn fixture() -> Fixture {
        let sink = Arc::new(RecordingSink::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap(),
        ));
        let ctx = Arc::new(FreightContext::in_memory(
            sink.clone(),
            clock,
            Arc::new(SeededEntropy::new(11)),
        ));
        Fixture {
            svc: RequestService::new(ctx.clone()),
            profiles: ProfileService::new(ctx),
            sink,
        }
    }

    async fn merchant(f: &Fixture, phone: &str) -> MerchantId {
        let (_, pid) = f
            .profiles
            .register(
                NewUser {
                    full_name: "Shop".into(),
                    phone_number: phone.into(),
                    email: None,
                },
                Role::Merchant,
            )
            .await
            .unwrap();
        match pid {
            ProfileId::Merchant(id) => id,
            other => panic!("unexpected profile {other:?}"),
        }
    }

    fn draft() -> ShipmentRequestDraft {
        ShipmentRequestDraft {
            required_truck_type: None,
            pickup: Place {
                address: "Warehouse 4".into(),
                area: Some("North".into()),
                ..Default::default()
            },
            dropoff: Place {
                address: "Market St".into(),
                area: Some("South".into()),
                ..Default::default()
            },
            sender_name: "Omar".into(),
            sender_phone: "+100".into(),
            cargo_description: "Tiles".into(),
            parcel_type: None,
            weight_kg: Decimal::new(800, 0),
            size: None,
            count: 2,
            delivery_date: NaiveDate::from_ymd_opt(2025, 5, 12).unwrap(),
            time_from: None,
            time_to: None,
            payment_method: "Cash".into(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_opens_and_notifies_merchant() {
        let f = fixture();
        let m = merchant(&f, "m1").await;
        let r = f.svc.create(m, draft()).await.unwrap();

        assert_eq!(r.status, RequestStatus::Open);
        assert!(r.request_number.starts_with("HM"));
        assert_eq!(f.sink.count_of(NotificationKind::RequestSubmitted), 1);
    }

    #[tokio::test]
    async fn test_invalid_draft_persists_nothing() {
        let f = fixture();
        let m = merchant(&f, "m2").await;
        let mut d = draft();
        d.count = 0;
        assert!(f.svc.create(m, d).await.is_err());

        let page = f.svc.list_mine(m, None, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_count, 0);
        assert!(f.sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_numbers_unique_with_colliding_entropy() {
        // Same seed in two contexts would collide; one context must not.
        let f = fixture();
        let m = merchant(&f, "m3").await;
        let mut numbers = std::collections::HashSet::new();
        for _ in 0..20 {
            let r = f.svc.create(m, draft()).await.unwrap();
            assert!(numbers.insert(r.request_number));
        }
    }

    #[tokio::test]
    async fn test_other_merchant_sees_not_found() {
        let f = fixture();
        let owner = merchant(&f, "m4").await;
        let intruder = merchant(&f, "m5").await;
        let r = f.svc.create(owner, draft()).await.unwrap();

        let err = f.svc.get_mine(intruder, r.id).await.unwrap_err();
        assert!(matches!(err, FreightError::NotFound(_)));
        let err = f.svc.cancel(intruder, r.id).await.unwrap_err();
        assert!(matches!(err, FreightError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_twice_is_invalid_state() {
        let f = fixture();
        let m = merchant(&f, "m6").await;
        let r = f.svc.create(m, draft()).await.unwrap();

        let cancelled = f.svc.cancel(m, r.id).await.unwrap();
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
        let err = f.svc.cancel(m, r.id).await.unwrap_err();
        assert!(matches!(err, FreightError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_browse_filters_and_hides_cancelled() {
        let f = fixture();
        let m = merchant(&f, "m7").await;
        let kept = f.svc.create(m, draft()).await.unwrap();
        let gone = f.svc.create(m, draft()).await.unwrap();
        f.svc.cancel(m, gone.id).await.unwrap();

        let page = f
            .svc
            .browse_open(RequestQuery::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].id, kept.id);
        assert_eq!(page.items[0].offers_count, 0);

        let by_area = RequestQuery {
            dropoff: Some("south".into()),
            ..Default::default()
        };
        let page = f.svc.browse_open(by_area, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_count, 1);

        let too_heavy = RequestQuery {
            min_weight_kg: Some(Decimal::new(1000, 0)),
            ..Default::default()
        };
        let page = f.svc.browse_open(too_heavy, PageRequest::default()).await.unwrap();
        assert_eq!(page.total_count, 0);
    }
}
