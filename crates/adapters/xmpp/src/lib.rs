//! # hubbridge-adapter-xmpp
//!
//! The hub session: one long-lived XMPP connection to the building
//! automation hub.
//!
//! ## How it works
//!
//! The hub speaks XMPP. Writes are XML-RPC calls (`RemoteInterface.*`)
//! sent as `iq` stanzas to the hub's RPC resource; status changes arrive
//! as pub-sub `headline` messages carrying an escaped project document.
//!
//! | Module | Role |
//! |--------|------|
//! | `xml` | owned element tree over `quick-xml` |
//! | `framing` | cuts the byte stream into stanzas |
//! | `stanza` | builds outbound stanzas, classifies inbound ones |
//! | `project` | parses project and update documents |
//! | `transport` | TCP, SASL `PLAIN`, resource binding |
//! | `session` | state machine, keepalive, reconnect |
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `hubbridge-app` and `hubbridge-domain`.

mod backoff;
mod config;
mod error;
pub mod framing;
pub mod project;
mod session;
pub mod stanza;
mod transport;
pub mod xml;

pub use config::XmppConfig;
pub use error::XmppError;
pub use session::{HubSession, SessionHandle};
pub use transport::{Connector, TcpConnector, TcpTransport, Transport};
