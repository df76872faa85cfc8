//! Carrier fleets: trucks, truck types and truck selection.

pub mod models;
mod service;

pub use models::{NewTruck, Truck, TruckType, pick_truck};
pub use service::FleetService;
