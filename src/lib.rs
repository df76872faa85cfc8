//! HM Freight - freight coordination between merchants, carriers and drivers
//!
//! A merchant posts a shipment request, truck accounts bid on it, the
//! merchant accepts one offer and a shipment is born. A driver (the carrier
//! itself or an invited person) then walks the shipment to delivery.
//!
//! # Modules
//!
//! - [`core_types`] - Entity ids and paging
//! - [`profile`] - Users and role profiles
//! - [`fleet`] - Trucks owned by truck accounts
//! - [`request`] - Shipment requests and HM numbers
//! - [`offer`] - Offers, acceptance and expiry sweeping
//! - [`shipment`] - Shipment lifecycle, invitations and read models
//! - [`notify`] - Notification dispatch and inbox
//! - [`store`] - Persistence seam (memory and PostgreSQL)
//! - [`gateway`] - HTTP API

// Core types - must be first!
pub mod core_types;
pub mod error;

pub mod config;
pub mod context;
pub mod db;
pub mod environment;
pub mod logging;

// Domain components
pub mod fleet;
pub mod notify;
pub mod offer;
pub mod profile;
pub mod request;
pub mod shipment;
pub mod store;

pub mod gateway;

// Convenient re-exports at crate root
pub use context::{FreightContext, FreightServices, LifecyclePolicy};
pub use core_types::{
    CarrierId, DriverId, MerchantId, NotificationId, OfferId, Page, PageRequest, RequestId,
    ShipmentId, TruckId, UserId,
};
pub use error::{FreightError, FreightResult};
pub use offer::{ExpirySweeper, OfferEngine, OfferStatus};
pub use request::{RequestService, RequestStatus};
pub use shipment::{ShipmentLifecycle, ShipmentStatus};
pub use store::{FreightStore, MemoryStore, PgStore};
