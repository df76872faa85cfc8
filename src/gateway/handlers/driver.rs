//! Driver routes: assigned shipments, trip progress, profile

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::super::auth::DriverCaller;
use super::super::state::AppState;
use super::super::types::{ApiResult, LocationRequest, ok};
use crate::core_types::{Page, PageRequest, ShipmentId};
use crate::profile::{ProfileUpdate, ProfileView, Role};
use crate::shipment::{DriverShipmentDetails, DriverTracking, Shipment};

pub async fn list_shipments(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Query(page): Query<PageRequest>,
) -> ApiResult<Page<DriverShipmentDetails>> {
    ok(state
        .services
        .shipments
        .list_for_driver(caller.user_id, page)
        .await?)
}

pub async fn get_shipment(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<DriverShipmentDetails> {
    ok(state
        .services
        .shipments
        .details_for_driver(caller.user_id, id)
        .await?)
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<Shipment> {
    ok(state.services.shipments.start(caller.user_id, id).await?)
}

pub async fn arrive(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<Shipment> {
    ok(state.services.shipments.arrive(caller.user_id, id).await?)
}

pub async fn pause(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<Shipment> {
    ok(state.services.shipments.pause(caller.user_id, id).await?)
}

pub async fn resume(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<Shipment> {
    ok(state.services.shipments.resume(caller.user_id, id).await?)
}

pub async fn complete(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<Shipment> {
    ok(state.services.shipments.complete(caller.user_id, id).await?)
}

/// PUT /api/v1/driver/shipments/{id}/location
pub async fn update_location(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Path(id): Path<ShipmentId>,
    Json(req): Json<LocationRequest>,
) -> ApiResult<Shipment> {
    ok(state
        .services
        .shipments
        .update_location(caller.user_id, id, req.lat, req.lng)
        .await?)
}

pub async fn tracking(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Path(id): Path<ShipmentId>,
) -> ApiResult<DriverTracking> {
    ok(state
        .services
        .shipments
        .tracking_for_driver(caller.user_id, id)
        .await?)
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
) -> ApiResult<ProfileView> {
    ok(state
        .services
        .profiles
        .get_profile(caller.user_id, Role::Driver)
        .await?)
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    caller: DriverCaller,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<ProfileView> {
    ok(state
        .services
        .profiles
        .update_profile(caller.user_id, Role::Driver, update)
        .await?)
}
