//! Server module for exposing entity types over HTTP
//!
//! This module provides a `ServerBuilder` that registers entity types and
//! their repositories, and a transport-agnostic `ServerHost` consumed by the
//! REST exposure.

pub mod builder;
pub mod exposure;
pub mod host;

pub use builder::ServerBuilder;
pub use exposure::RestExposure;
pub use host::ServerHost;
