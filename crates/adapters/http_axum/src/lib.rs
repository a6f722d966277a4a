//! # hubbridge-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Accept actuator commands as plain URLs
//!   (`/api/set/{type}/{serial}/{channel}/{action}[/{value}]`), so that
//!   anything able to fetch a URL can drive the hub
//! - Expose the known actuators as JSON
//! - Stream status events as server-sent events
//! - Map [`BridgeError`](hubbridge_domain::error::BridgeError) into status
//!   codes with a JSON `{"error"}` body
//!
//! ## Dependency rule
//! Depends on `hubbridge-app` (for port traits and services) and
//! `hubbridge-domain` (for types used in request/response mapping). Never
//! leaks axum types into the domain.

pub mod api;
mod error;
pub mod router;
pub mod state;
