//! Merchant routes: requests, offers on them, tracking, profile

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::super::auth::MerchantCaller;
use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, StatusFilter, ok};
use crate::core_types::{OfferId, Page, PageRequest, RequestId, ShipmentId};
use crate::offer::{AcceptedOffer, OfferView};
use crate::profile::{ProfileUpdate, ProfileView, Role};
use crate::request::{
    RequestDetails, RequestStatus, RequestSummary, ShipmentRequest, ShipmentRequestDraft,
};
use crate::shipment::TrackingSnapshot;

/// POST /api/v1/merchant/requests
pub async fn create_request(
    State(state): State<Arc<AppState>>,
    caller: MerchantCaller,
    Json(draft): Json<ShipmentRequestDraft>,
) -> ApiResult<ShipmentRequest> {
    ok(state
        .services
        .requests
        .create(caller.merchant_id, draft)
        .await?)
}

/// GET /api/v1/merchant/requests?status=OPEN&page_number=1
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    caller: MerchantCaller,
    Query(filter): Query<StatusFilter>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Page<RequestSummary>> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()
        .map_err(ApiError::bad_request)?;
    ok(state
        .services
        .requests
        .list_mine(caller.merchant_id, status, page)
        .await?)
}

pub async fn get_request(
    State(state): State<Arc<AppState>>,
    caller: MerchantCaller,
    Path(id): Path<RequestId>,
) -> ApiResult<RequestDetails> {
    ok(state.services.requests.get_mine(caller.merchant_id, id).await?)
}

pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    caller: MerchantCaller,
    Path(id): Path<RequestId>,
) -> ApiResult<ShipmentRequest> {
    ok(state.services.requests.cancel(caller.merchant_id, id).await?)
}

pub async fn list_offers(
    State(state): State<Arc<AppState>>,
    caller: MerchantCaller,
    Path(id): Path<RequestId>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Page<OfferView>> {
    ok(state
        .services
        .offers
        .list_for_request(caller.merchant_id, id, page)
        .await?)
}

/// POST /api/v1/merchant/requests/{id}/offers/{offer_id}/accept
pub async fn accept_offer(
    State(state): State<Arc<AppState>>,
    caller: MerchantCaller,
    Path((request_id, offer_id)): Path<(RequestId, OfferId)>,
) -> ApiResult<AcceptedOffer> {
    ok(state
        .services
        .offers
        .accept(caller.merchant_id, request_id, offer_id)
        .await?)
}

pub async fn tracking(
    State(state): State<Arc<AppState>>,
    caller: MerchantCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<TrackingSnapshot> {
    ok(state
        .services
        .shipments
        .tracking_for_merchant(caller.merchant_id, id)
        .await?)
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    caller: MerchantCaller,
) -> ApiResult<ProfileView> {
    ok(state
        .services
        .profiles
        .get_profile(caller.user_id, Role::Merchant)
        .await?)
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    caller: MerchantCaller,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<ProfileView> {
    ok(state
        .services
        .profiles
        .update_profile(caller.user_id, Role::Merchant, update)
        .await?)
}
