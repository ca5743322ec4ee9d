//! API Exposure modules
//!
//! Each exposure type consumes a `ServerHost` and produces a Router for its protocol.

pub mod rest;

pub use rest::RestExposure;
