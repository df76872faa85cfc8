//! Shipment request records, inputs and read models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state::RequestStatus;
use crate::core_types::{MerchantId, RequestId, ShipmentId};
use crate::fleet::TruckType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum PaymentMethod {
    Cash = 1,
    Card = 2,
    BankTransfer = 3,
    Wallet = 4,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::BankTransfer,
        PaymentMethod::Wallet,
    ];

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Wallet => "wallet",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    /// Case-insensitive; `BankTransfer`, `bank_transfer` and `bank-transfer` all parse
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().replace('_', "") == needle)
            .ok_or_else(|| format!("unknown payment method: {}", s.trim()))
    }
}

/// Address with optional area and coordinates
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    pub description: String,
    pub parcel_type: Option<String>,
    pub weight_kg: Decimal,
    pub size: Option<String>,
    pub count: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryWindow {
    pub date: NaiveDate,
    pub time_from: Option<NaiveTime>,
    pub time_to: Option<NaiveTime>,
}

impl DeliveryWindow {
    /// "HH:MM - HH:MM", "?" standing in for a missing side
    pub fn label(&self) -> String {
        let side = |t: Option<NaiveTime>| {
            t.map(|t| t.format("%H:%M").to_string())
                .unwrap_or_else(|| "?".to_string())
        };
        format!("{} - {}", side(self.time_from), side(self.time_to))
    }
}

/// A merchant's posted shipment need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub id: RequestId,
    pub merchant_id: MerchantId,
    /// "HM" + digits, unique
    pub request_number: String,
    pub required_truck_type: Option<TruckType>,
    pub pickup: Place,
    pub dropoff: Place,
    pub sender_name: String,
    pub sender_phone: String,
    pub cargo: Cargo,
    pub delivery: DeliveryWindow,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated create input. Enumerations arrive as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShipmentRequestDraft {
    #[serde(default)]
    pub required_truck_type: Option<String>,
    pub pickup: Place,
    pub dropoff: Place,
    pub sender_name: String,
    pub sender_phone: String,
    pub cargo_description: String,
    #[serde(default)]
    pub parcel_type: Option<String>,
    pub weight_kg: Decimal,
    #[serde(default)]
    pub size: Option<String>,
    pub count: i32,
    pub delivery_date: NaiveDate,
    #[serde(default)]
    pub time_from: Option<NaiveTime>,
    #[serde(default)]
    pub time_to: Option<NaiveTime>,
    pub payment_method: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Browse / list filter
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RequestQuery {
    #[serde(skip)]
    pub merchant_id: Option<MerchantId>,
    #[serde(skip)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub truck_type: Option<TruckType>,
    #[serde(default)]
    pub min_weight_kg: Option<Decimal>,
    #[serde(default)]
    pub max_weight_kg: Option<Decimal>,
    /// Substring match on pickup address or area
    #[serde(default)]
    pub pickup: Option<String>,
    #[serde(default)]
    pub dropoff: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
}

impl RequestQuery {
    pub fn open() -> Self {
        Self {
            status: Some(RequestStatus::Open),
            ..Default::default()
        }
    }

    /// In-memory evaluation of the filter
    pub fn matches(&self, r: &ShipmentRequest) -> bool {
        fn place_matches(place: &Place, needle: &Option<String>) -> bool {
            let Some(needle) = needle.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
                return true;
            };
            let needle = needle.to_lowercase();
            place.address.to_lowercase().contains(&needle)
                || place
                    .area
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase().contains(&needle))
        }

        self.merchant_id.is_none_or(|m| r.merchant_id == m)
            && self.status.is_none_or(|s| r.status == s)
            && self
                .truck_type
                .is_none_or(|t| r.required_truck_type == Some(t))
            && self.min_weight_kg.is_none_or(|w| r.cargo.weight_kg >= w)
            && self.max_weight_kg.is_none_or(|w| r.cargo.weight_kg <= w)
            && self.delivery_date.is_none_or(|d| r.delivery.date == d)
            && place_matches(&r.pickup, &self.pickup)
            && place_matches(&r.dropoff, &self.dropoff)
    }
}

/// List row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSummary {
    pub id: RequestId,
    pub request_number: String,
    pub status: RequestStatus,
    pub required_truck_type: Option<TruckType>,
    pub pickup_address: String,
    pub pickup_area: Option<String>,
    pub dropoff_address: String,
    pub dropoff_area: Option<String>,
    pub weight_kg: Decimal,
    pub delivery_date: NaiveDate,
    pub delivery_window: String,
    pub offers_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Full request plus derived fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDetails {
    #[serde(flatten)]
    pub request: ShipmentRequest,
    pub delivery_window: String,
    pub offers_count: u64,
    pub shipment_id: Option<ShipmentId>,
}

pub fn to_summary(r: &ShipmentRequest, offers_count: u64) -> RequestSummary {
    RequestSummary {
        id: r.id,
        request_number: r.request_number.clone(),
        status: r.status,
        required_truck_type: r.required_truck_type,
        pickup_address: r.pickup.address.clone(),
        pickup_area: r.pickup.area.clone(),
        dropoff_address: r.dropoff.address.clone(),
        dropoff_area: r.dropoff.area.clone(),
        weight_kg: r.cargo.weight_kg,
        delivery_date: r.delivery.date,
        delivery_window: r.delivery.label(),
        offers_count,
        created_at: r.created_at,
    }
}

pub fn to_details(
    request: ShipmentRequest,
    offers_count: u64,
    shipment_id: Option<ShipmentId>,
) -> RequestDetails {
    RequestDetails {
        delivery_window: request.delivery.label(),
        request,
        offers_count,
        shipment_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_parse() {
        assert_eq!("CASH".parse::<PaymentMethod>(), Ok(PaymentMethod::Cash));
        assert_eq!(
            "BankTransfer".parse::<PaymentMethod>(),
            Ok(PaymentMethod::BankTransfer)
        );
        assert_eq!(
            "bank-transfer".parse::<PaymentMethod>(),
            Ok(PaymentMethod::BankTransfer)
        );
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_delivery_window_label() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0);
        let five = NaiveTime::from_hms_opt(17, 30, 0);

        let full = DeliveryWindow { date, time_from: nine, time_to: five };
        assert_eq!(full.label(), "09:00 - 17:30");

        let open_end = DeliveryWindow { date, time_from: nine, time_to: None };
        assert_eq!(open_end.label(), "09:00 - ?");

        let none = DeliveryWindow { date, time_from: None, time_to: None };
        assert_eq!(none.label(), "? - ?");
    }
}
