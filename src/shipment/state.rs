//! Shipment FSM
//!
//! ```text
//! AwaitingDriver ──assign──► Ready ──start──► InTransit ──arrive──► Arrived ──complete──► Completed
//!      │  └───────────start──────────────────►  ▲  │
//!      │                       │          resume │  │ pause
//!      └──────cancel───────────┴──► Cancelled   Paused ◄┘
//! ```
//!
//! Every lifecycle operation is an [`ShipmentAction`]; the table in
//! [`ShipmentAction::allowed_from`] is the single source of legal moves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FreightError, FreightResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum ShipmentStatus {
    /// Created by offer acceptance, no driver yet
    AwaitingDriver = 0,
    /// Driver bound, trip not started
    Ready = 10,
    InTransit = 20,
    Paused = 25,
    Arrived = 30,
    /// Terminal: receipt confirmed
    Completed = 40,
    /// Terminal
    Cancelled = -10,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 7] = [
        ShipmentStatus::AwaitingDriver,
        ShipmentStatus::Ready,
        ShipmentStatus::InTransit,
        ShipmentStatus::Paused,
        ShipmentStatus::Arrived,
        ShipmentStatus::Completed,
        ShipmentStatus::Cancelled,
    ];

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShipmentStatus::Completed | ShipmentStatus::Cancelled)
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::AwaitingDriver => "AWAITING_DRIVER",
            ShipmentStatus::Ready => "READY",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Paused => "PAUSED",
            ShipmentStatus::Arrived => "ARRIVED",
            ShipmentStatus::Completed => "COMPLETED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == needle || st.as_str().replace('_', "") == needle)
            .ok_or_else(|| format!("unknown shipment status: {}", s.trim()))
    }
}

/// Lifecycle operation on a shipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShipmentAction {
    /// Carrier self-assign or invitation redemption; a bound driver is never replaced
    AssignDriver,
    Start,
    Arrive,
    Pause,
    Resume,
    Complete,
    Cancel,
    /// Position report; status unchanged
    ReportLocation,
}

impl ShipmentAction {
    pub const ALL: [ShipmentAction; 8] = [
        ShipmentAction::AssignDriver,
        ShipmentAction::Start,
        ShipmentAction::Arrive,
        ShipmentAction::Pause,
        ShipmentAction::Resume,
        ShipmentAction::Complete,
        ShipmentAction::Cancel,
        ShipmentAction::ReportLocation,
    ];

    pub fn allowed_from(&self) -> &'static [ShipmentStatus] {
        use ShipmentStatus::*;
        match self {
            ShipmentAction::AssignDriver => &[AwaitingDriver],
            ShipmentAction::Start => &[AwaitingDriver, Ready],
            ShipmentAction::Arrive => &[InTransit],
            ShipmentAction::Pause => &[InTransit],
            ShipmentAction::Resume => &[Paused],
            ShipmentAction::Complete => &[Arrived],
            ShipmentAction::Cancel => &[AwaitingDriver, Ready],
            ShipmentAction::ReportLocation => &[InTransit, Paused, Arrived],
        }
    }

    /// Status after the action; `None` leaves it unchanged
    pub fn target(&self) -> Option<ShipmentStatus> {
        match self {
            ShipmentAction::AssignDriver => Some(ShipmentStatus::Ready),
            ShipmentAction::Start => Some(ShipmentStatus::InTransit),
            ShipmentAction::Arrive => Some(ShipmentStatus::Arrived),
            ShipmentAction::Pause => Some(ShipmentStatus::Paused),
            ShipmentAction::Resume => Some(ShipmentStatus::InTransit),
            ShipmentAction::Complete => Some(ShipmentStatus::Completed),
            ShipmentAction::Cancel => Some(ShipmentStatus::Cancelled),
            ShipmentAction::ReportLocation => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentAction::AssignDriver => "assign driver",
            ShipmentAction::Start => "start trip",
            ShipmentAction::Arrive => "mark arrived",
            ShipmentAction::Pause => "pause trip",
            ShipmentAction::Resume => "resume trip",
            ShipmentAction::Complete => "complete",
            ShipmentAction::Cancel => "cancel",
            ShipmentAction::ReportLocation => "update location",
        }
    }

    /// Resulting status, or `InvalidState` naming the current one
    pub fn apply(&self, current: ShipmentStatus) -> FreightResult<ShipmentStatus> {
        if !self.allowed_from().contains(&current) {
            return Err(FreightError::invalid_state(format!(
                "cannot {} a shipment in status {current}",
                self.as_str()
            )));
        }
        Ok(self.target().unwrap_or(current))
    }
}
