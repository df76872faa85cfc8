//! Competitive bidding on open requests.

mod service;
pub mod state;
mod sweeper;
pub mod types;

pub use service::OfferEngine;
pub use state::OfferStatus;
pub use sweeper::{ExpirySweeper, SweeperConfig};
pub use types::{AcceptedOffer, OfferSubmission, OfferView, ShipmentOffer, SweepReport};
