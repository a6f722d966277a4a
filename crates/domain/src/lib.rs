//! # hubbridge-domain
//!
//! Pure domain model for the hubbridge building-automation bridge.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps
//! - Define **Actuators** (physical or virtual bus endpoints) and their
//!   **Channels** of input/output **Datapoints**
//! - Define the static **command table** mapping actuator types and actions
//!   to datapoint writes
//! - Validate and resolve command requests against known actuators
//! - Turn symbolic value specifications (toggle, pulse, delta, …) into
//!   concrete datapoint writes
//! - Define the records exchanged with the hub session (RPC responses,
//!   datapoint updates, status events, session states)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod actuator;
pub mod command;
pub mod datapoint;
pub mod event;
pub mod receipt;
pub mod rpc;
pub mod session;
pub mod transform;
