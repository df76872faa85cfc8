//! Shipment requests: merchant-posted freight needs.

pub mod number;
mod service;
pub mod state;
pub mod types;
pub mod validation;

pub use service::RequestService;
pub use state::RequestStatus;
pub use types::{
    Cargo, DeliveryWindow, PaymentMethod, Place, RequestDetails, RequestQuery, RequestSummary,
    ShipmentRequest, ShipmentRequestDraft,
};
