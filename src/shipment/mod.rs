//! Shipments: execution of an accepted offer.

pub mod invitation;
mod service;
pub mod state;
pub mod types;
pub mod views;

pub use service::ShipmentLifecycle;
pub use state::{ShipmentAction, ShipmentStatus};
pub use types::{DriverInvitation, GeoPoint, NewDriver, Shipment};
pub use views::{
    CarrierShipmentItem, DriverShipmentDetails, DriverTracking, QrPayload, ShipmentDetails,
    TrackingSnapshot,
};
