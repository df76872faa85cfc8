//! Actors and profile resolution.
//!
//! Identity (credentials, tokens) is owned by the auth layer; this module
//! stores the user row and exactly one role profile per user, and maps an
//! authenticated user id to the profile acting on its behalf.

pub mod models;
mod resolver;
mod service;

pub use models::{
    DriverProfile, MerchantProfile, NewUser, ProfileId, ProfileUpdate, ProfileView, Role,
    RoleProfile, TruckAccount, User,
};
pub use resolver::ProfileResolver;
pub use service::ProfileService;
pub(crate) use service::new_driver_profile;
