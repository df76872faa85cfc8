//! Create-request input checks.
//!
//! The first failing rule is reported. Nothing is persisted before every rule
//! passes.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::types::{Cargo, DeliveryWindow, PaymentMethod, Place, ShipmentRequestDraft};
use crate::error::{FreightError, FreightResult};
use crate::fleet::TruckType;

/// Typed, checked pieces of a draft
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    pub required_truck_type: Option<TruckType>,
    pub pickup: Place,
    pub dropoff: Place,
    pub sender_name: String,
    pub sender_phone: String,
    pub cargo: Cargo,
    pub delivery: DeliveryWindow,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

fn required(field: &str, value: &str) -> FreightResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(FreightError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_place(field: &str, place: Place) -> FreightResult<Place> {
    let address = required(field, &place.address)?;
    match (place.lat, place.lng) {
        (Some(lat), Some(lng)) => check_coordinates(lat, lng)?,
        (None, None) => {}
        _ => {
            return Err(FreightError::validation(format!(
                "{field} coordinates need both lat and lng"
            )));
        }
    }
    Ok(Place {
        address,
        area: optional(place.area),
        lat: place.lat,
        lng: place.lng,
    })
}

/// WGS84 bounds
pub fn check_coordinates(lat: f64, lng: f64) -> FreightResult<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(FreightError::validation(format!(
            "coordinates out of range: {lat}, {lng}"
        )));
    }
    Ok(())
}

pub fn validate_draft(draft: ShipmentRequestDraft, today: NaiveDate) -> FreightResult<ValidatedDraft> {
    let sender_name = required("sender name", &draft.sender_name)?;
    let sender_phone = required("sender phone", &draft.sender_phone)?;
    let pickup = check_place("pickup address", draft.pickup)?;
    let dropoff = check_place("dropoff address", draft.dropoff)?;
    let description = required("cargo description", &draft.cargo_description)?;

    if draft.weight_kg <= Decimal::ZERO {
        return Err(FreightError::validation("weight must be greater than zero"));
    }
    if draft.count < 1 {
        return Err(FreightError::validation("count must be at least 1"));
    }
    if draft.delivery_date < today {
        return Err(FreightError::validation(format!(
            "delivery date {} is in the past",
            draft.delivery_date
        )));
    }
    if let (Some(from), Some(to)) = (draft.time_from, draft.time_to) {
        if from > to {
            return Err(FreightError::validation(
                "delivery window start is after its end",
            ));
        }
    }

    let payment_method = draft
        .payment_method
        .parse::<PaymentMethod>()
        .map_err(FreightError::validation)?;
    let required_truck_type = match optional(draft.required_truck_type) {
        Some(t) => Some(t.parse::<TruckType>().map_err(FreightError::validation)?),
        None => None,
    };

    Ok(ValidatedDraft {
        required_truck_type,
        pickup,
        dropoff,
        sender_name,
        sender_phone,
        cargo: Cargo {
            description,
            parcel_type: optional(draft.parcel_type),
            weight_kg: draft.weight_kg,
            size: optional(draft.size),
            count: draft.count,
        },
        delivery: DeliveryWindow {
            date: draft.delivery_date,
            time_from: draft.time_from,
            time_to: draft.time_to,
        },
        payment_method,
        notes: optional(draft.notes),
    })
}
