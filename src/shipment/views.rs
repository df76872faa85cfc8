//! Shipment read models.
//!
//! Each view is built by one explicit mapping function from the records it
//! draws on, so which fields are stored and which are derived stays visible.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::state::ShipmentStatus;
use super::types::{GeoPoint, Shipment};
use crate::core_types::{RequestId, ShipmentId, TruckId};
use crate::fleet::{Truck, TruckType};
use crate::offer::ShipmentOffer;
use crate::profile::{DriverProfile, User};
use crate::request::{Cargo, PaymentMethod, Place, ShipmentRequest};

/// Row of the carrier's shipment list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierShipmentItem {
    pub id: ShipmentId,
    pub request_id: RequestId,
    pub request_number: String,
    pub status: ShipmentStatus,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub cargo_description: String,
    pub weight_kg: Decimal,
    pub price: Decimal,
    pub driver_name: Option<String>,
    pub plate_number: String,
    pub created_at: DateTime<Utc>,
}

pub fn to_carrier_item(
    s: &Shipment,
    r: &ShipmentRequest,
    offer: &ShipmentOffer,
    truck: &Truck,
    driver: Option<&DriverProfile>,
) -> CarrierShipmentItem {
    CarrierShipmentItem {
        id: s.id,
        request_id: r.id,
        request_number: r.request_number.clone(),
        status: s.status,
        pickup_address: r.pickup.address.clone(),
        dropoff_address: r.dropoff.address.clone(),
        cargo_description: r.cargo.description.clone(),
        weight_kg: r.cargo.weight_kg,
        price: offer.price,
        driver_name: driver.map(|d| d.full_name.clone()),
        plate_number: truck.plate_number.clone(),
        created_at: s.created_at,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TruckBrief {
    pub id: TruckId,
    pub truck_type: TruckType,
    pub plate_number: String,
}

/// Carrier-facing shipment details
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentDetails {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub request_number: String,
    pub pickup: Place,
    pub dropoff: Place,
    pub cargo: Cargo,
    pub delivery_date: NaiveDate,
    pub delivery_window: String,
    pub price: Decimal,
    pub truck: TruckBrief,
    pub driver_name: Option<String>,
}

pub fn to_shipment_details(
    s: Shipment,
    r: &ShipmentRequest,
    offer: &ShipmentOffer,
    truck: &Truck,
    driver: Option<&DriverProfile>,
) -> ShipmentDetails {
    ShipmentDetails {
        shipment: s,
        request_number: r.request_number.clone(),
        pickup: r.pickup.clone(),
        dropoff: r.dropoff.clone(),
        cargo: r.cargo.clone(),
        delivery_date: r.delivery.date,
        delivery_window: r.delivery.label(),
        price: offer.price,
        truck: TruckBrief {
            id: truck.id,
            truck_type: truck.truck_type,
            plate_number: truck.plate_number.clone(),
        },
        driver_name: driver.map(|d| d.full_name.clone()),
    }
}

/// What the driver needs on the road. Carries no price or carrier data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverShipmentDetails {
    pub id: ShipmentId,
    pub status: ShipmentStatus,
    pub request_number: String,
    pub pickup: Place,
    pub dropoff: Place,
    pub cargo: Cargo,
    pub delivery_date: NaiveDate,
    pub delivery_window: String,
    pub sender_name: String,
    pub sender_phone: String,
    pub merchant_name: String,
    pub merchant_phone: String,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub fn to_driver_details(
    s: &Shipment,
    r: &ShipmentRequest,
    merchant: &User,
) -> DriverShipmentDetails {
    DriverShipmentDetails {
        id: s.id,
        status: s.status,
        request_number: r.request_number.clone(),
        pickup: r.pickup.clone(),
        dropoff: r.dropoff.clone(),
        cargo: r.cargo.clone(),
        delivery_date: r.delivery.date,
        delivery_window: r.delivery.label(),
        sender_name: r.sender_name.clone(),
        sender_phone: r.sender_phone.clone(),
        merchant_name: merchant.full_name.clone(),
        merchant_phone: merchant.phone_number.clone(),
        payment_method: r.payment_method,
        notes: r.notes.clone(),
        started_at: s.started_at,
        completed_at: s.completed_at,
    }
}

/// Merchant-facing position and progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingSnapshot {
    pub shipment_id: ShipmentId,
    pub request_id: RequestId,
    pub request_number: String,
    pub status: ShipmentStatus,
    pub current_location: Option<GeoPoint>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub driver_name: Option<String>,
    pub plate_number: Option<String>,
}

/// Last position fix, else trip start, else completion
fn last_updated_at(s: &Shipment) -> Option<DateTime<Utc>> {
    s.location_updated_at.or(s.started_at).or(s.completed_at)
}

pub fn to_tracking(
    s: &Shipment,
    r: &ShipmentRequest,
    driver: Option<&DriverProfile>,
    truck: Option<&Truck>,
) -> TrackingSnapshot {
    TrackingSnapshot {
        shipment_id: s.id,
        request_id: r.id,
        request_number: r.request_number.clone(),
        status: s.status,
        current_location: s.current_location,
        last_updated_at: last_updated_at(s),
        started_at: s.started_at,
        completed_at: s.completed_at,
        driver_name: driver.map(|d| d.full_name.clone()),
        plate_number: truck.map(|t| t.plate_number.clone()),
    }
}

/// Driver-facing tracking: own position against the route endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverTracking {
    pub shipment_id: ShipmentId,
    pub status: ShipmentStatus,
    pub pickup: Place,
    pub dropoff: Place,
    pub current_location: Option<GeoPoint>,
    pub last_updated_at: Option<DateTime<Utc>>,
}

pub fn to_driver_tracking(s: &Shipment, r: &ShipmentRequest) -> DriverTracking {
    DriverTracking {
        shipment_id: s.id,
        status: s.status,
        pickup: r.pickup.clone(),
        dropoff: r.dropoff.clone(),
        current_location: s.current_location,
        last_updated_at: last_updated_at(s),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub shipment_id: ShipmentId,
    pub tracking_url: String,
}

pub fn qr_payload(s: &Shipment, tracking_base_url: &str) -> QrPayload {
    QrPayload {
        shipment_id: s.id,
        tracking_url: format!("{}/{}", tracking_base_url.trim_end_matches('/'), s.id),
    }
}
