//! Truck records and truck types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{CarrierId, TruckId};

/// Body type of a truck; a request may require one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum TruckType {
    Pickup = 1,
    Van = 2,
    Box = 3,
    Flatbed = 4,
    Refrigerated = 5,
    Tanker = 6,
}

impl TruckType {
    pub const ALL: [TruckType; 6] = [
        TruckType::Pickup,
        TruckType::Van,
        TruckType::Box,
        TruckType::Flatbed,
        TruckType::Refrigerated,
        TruckType::Tanker,
    ];

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TruckType::Pickup => "pickup",
            TruckType::Van => "van",
            TruckType::Box => "box",
            TruckType::Flatbed => "flatbed",
            TruckType::Refrigerated => "refrigerated",
            TruckType::Tanker => "tanker",
        }
    }
}

impl fmt::Display for TruckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TruckType {
    type Err = String;

    /// Case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| format!("unknown truck type: {}", s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Truck {
    pub id: TruckId,
    pub carrier_id: CarrierId,
    pub truck_type: TruckType,
    pub max_weight_kg: Decimal,
    pub plate_number: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields a carrier supplies when registering a truck
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTruck {
    pub truck_type: String,
    pub max_weight_kg: Decimal,
    pub plate_number: String,
}

/// Pick the truck an accepted offer is bound to.
///
/// Only active trucks qualify. A truck of the preferred type wins; ties and
/// the no-preference case go to the earliest registered.
pub fn pick_truck(trucks: &[Truck], preferred: Option<TruckType>) -> Option<&Truck> {
    fn earliest<'a>(it: impl Iterator<Item = &'a Truck>) -> Option<&'a Truck> {
        it.min_by_key(|t| (t.created_at, t.id))
    }

    let active = || trucks.iter().filter(|t| t.is_active);
    preferred
        .and_then(|ty| earliest(active().filter(move |t| t.truck_type == ty)))
        .or_else(|| earliest(active()))
}
