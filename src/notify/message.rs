use chrono::{DateTime, Utc};
use serde_json::json;

use super::{Notification, NotificationKind};
use crate::core_types::{NotificationId, UserId};
use crate::offer::ShipmentOffer;
use crate::request::ShipmentRequest;
use crate::shipment::Shipment;

/// Recipient-independent notification content
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

impl Message {
    pub fn new(kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn request_submitted(r: &ShipmentRequest) -> Self {
        Self::new(
            NotificationKind::RequestSubmitted,
            "Request submitted",
            format!(
                "Your shipment request {} is open for offers.",
                r.request_number
            ),
        )
        .with_data(json!({ "requestId": r.id, "requestNumber": r.request_number }))
    }

    pub fn new_request_available(r: &ShipmentRequest) -> Self {
        let area = r
            .pickup
            .area
            .as_deref()
            .unwrap_or(r.pickup.address.as_str());
        Self::new(
            NotificationKind::NewRequestAvailable,
            "New shipment request",
            format!(
                "{} kg from {} on {}.",
                r.cargo.weight_kg, area, r.delivery.date
            ),
        )
        .with_data(json!({ "requestId": r.id, "requestNumber": r.request_number }))
    }

    pub fn offer_received(r: &ShipmentRequest, offer: &ShipmentOffer) -> Self {
        Self::new(
            NotificationKind::OfferReceived,
            "New offer",
            format!(
                "You received an offer of {} for request {}.",
                offer.price, r.request_number
            ),
        )
        .with_data(json!({ "requestId": r.id, "offerId": offer.id }))
    }

    pub fn offer_accepted(r: &ShipmentRequest, shipment: &Shipment) -> Self {
        Self::new(
            NotificationKind::OfferAccepted,
            "Offer accepted",
            format!(
                "Your offer for request {} was accepted. Assign a driver to get going.",
                r.request_number
            ),
        )
        .with_data(json!({ "requestId": r.id, "shipmentId": shipment.id }))
    }

    pub fn shipment_delivered(r: &ShipmentRequest, shipment: &Shipment) -> Self {
        Self::new(
            NotificationKind::ShipmentDelivered,
            "Shipment delivered",
            format!("Shipment for request {} has been delivered.", r.request_number),
        )
        .with_data(json!({ "requestId": r.id, "shipmentId": shipment.id }))
    }

    pub fn shipment_cancelled(r: &ShipmentRequest, shipment: &Shipment) -> Self {
        Self::new(
            NotificationKind::ShipmentCancelled,
            "Shipment cancelled",
            format!(
                "The carrier cancelled the shipment for request {}.",
                r.request_number
            ),
        )
        .with_data(json!({ "requestId": r.id, "shipmentId": shipment.id }))
    }

    pub(crate) fn to_notification(&self, user_id: UserId, now: DateTime<Utc>) -> Notification {
        Notification {
            id: NotificationId::new(),
            user_id,
            kind: self.kind,
            title: self.title.clone(),
            body: self.body.clone(),
            data: self.data.clone(),
            seen_at: None,
            created_at: now,
        }
    }
}
