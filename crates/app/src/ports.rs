//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod event_bus;
pub mod rpc_sink;
pub mod state_store;

pub use event_bus::StatusPublisher;
pub use rpc_sink::RpcSink;
pub use state_store::StateStore;
