// kab-orders/src/orders/mod.rs

//! Turning a sealed cart into an order record.

pub mod factory;
pub mod tracking;

pub use factory::OrderFactory;
pub use tracking::{RandomTrackingCodes, TrackingCodeSource};
