//! HTTP handlers, one module per caller role

pub mod driver;
pub mod health;
pub mod merchant;
pub mod shared;
pub mod truck;
