//! # hubbridge-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `StateStore`: current actuator topology and datapoint values
//!   - `RpcSink`: sends datapoint writes to the hub
//!   - `StatusPublisher`: notifies subscribers that hub state changed
//! - Define the **use-cases**:
//!   - `CommandService`: validate and resolve command requests
//!   - `Dispatcher`: resolve symbolic values and send (or schedule) writes
//! - Provide **in-process infrastructure** that doesn't need IO
//!   (`MemoryStore`, `InProcessEventBus`)
//!
//! ## Dependency rule
//! Depends on `hubbridge-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod services;
pub mod state_store;
