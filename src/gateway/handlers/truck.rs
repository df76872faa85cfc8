//! Truck account routes: browsing, bidding, fleet, shipments, profile

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::super::auth::CarrierCaller;
use super::super::state::AppState;
use super::super::types::{
    ApiResult, AssignSelfRequest, CancelShipmentRequest, InvitationResponse, SetActiveRequest, ok,
};
use crate::core_types::{Page, PageRequest, RequestId, ShipmentId, TruckId};
use crate::fleet::{NewTruck, Truck};
use crate::offer::{OfferSubmission, ShipmentOffer};
use crate::profile::{ProfileUpdate, ProfileView, Role};
use crate::request::{RequestDetails, RequestQuery, RequestSummary};
use crate::shipment::{CarrierShipmentItem, QrPayload, Shipment, ShipmentDetails};

/// GET /api/v1/truck/requests/open?truck_type=van&min_weight_kg=100
pub async fn browse_open(
    State(state): State<Arc<AppState>>,
    _caller: CarrierCaller,
    Query(query): Query<RequestQuery>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Page<RequestSummary>> {
    ok(state.services.requests.browse_open(query, page).await?)
}

pub async fn get_request(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Path(id): Path<RequestId>,
) -> ApiResult<RequestDetails> {
    ok(state
        .services
        .requests
        .get_for_carrier(caller.carrier_id, id)
        .await?)
}

pub async fn add_truck(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Json(input): Json<NewTruck>,
) -> ApiResult<Truck> {
    ok(state.services.fleet.add_truck(caller.carrier_id, input).await?)
}

pub async fn list_trucks(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
) -> ApiResult<Vec<Truck>> {
    ok(state.services.fleet.list_trucks(caller.carrier_id).await?)
}

/// PUT /api/v1/truck/trucks/{id}/active
pub async fn set_truck_active(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Path(id): Path<TruckId>,
    Json(req): Json<SetActiveRequest>,
) -> ApiResult<Truck> {
    ok(state
        .services
        .fleet
        .set_truck_active(caller.carrier_id, id, req.is_active)
        .await?)
}

pub async fn submit_offer(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Json(submission): Json<OfferSubmission>,
) -> ApiResult<ShipmentOffer> {
    ok(state
        .services
        .offers
        .submit(caller.carrier_id, submission)
        .await?)
}

pub async fn list_offers(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Query(page): Query<PageRequest>,
) -> ApiResult<Page<ShipmentOffer>> {
    ok(state.services.offers.list_mine(caller.carrier_id, page).await?)
}

pub async fn list_shipments(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Query(page): Query<PageRequest>,
) -> ApiResult<Page<CarrierShipmentItem>> {
    ok(state
        .services
        .shipments
        .list_for_carrier(caller.carrier_id, page)
        .await?)
}

pub async fn get_shipment(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<ShipmentDetails> {
    ok(state
        .services
        .shipments
        .details_for_carrier(caller.carrier_id, id)
        .await?)
}

pub async fn assign_self(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Path(id): Path<ShipmentId>,
    Json(req): Json<AssignSelfRequest>,
) -> ApiResult<Shipment> {
    ok(state
        .services
        .shipments
        .assign_self(caller.carrier_id, id, req.truck_id)
        .await?)
}

pub async fn invite_driver(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<InvitationResponse> {
    let invitation = state
        .services
        .shipments
        .generate_invitation(caller.carrier_id, id)
        .await?;
    ok(InvitationResponse {
        url: invitation.url(),
        token: invitation.token,
        expires_at: invitation.expires_at,
    })
}

pub async fn cancel_shipment(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Path(id): Path<ShipmentId>,
    body: Option<Json<CancelShipmentRequest>>,
) -> ApiResult<Shipment> {
    let reason = body.and_then(|Json(b)| b.reason);
    ok(state
        .services
        .shipments
        .cancel(caller.carrier_id, id, reason)
        .await?)
}

pub async fn qr(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<QrPayload> {
    ok(state
        .services
        .shipments
        .qr_for_carrier(caller.carrier_id, id)
        .await?)
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
) -> ApiResult<ProfileView> {
    ok(state
        .services
        .profiles
        .get_profile(caller.user_id, Role::TruckAccount)
        .await?)
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    caller: CarrierCaller,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<ProfileView> {
    ok(state
        .services
        .profiles
        .update_profile(caller.user_id, Role::TruckAccount, update)
        .await?)
}
