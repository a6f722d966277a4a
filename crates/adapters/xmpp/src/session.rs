//! Hub session: the single long-lived connection to the hub.
//!
//! [`HubSession`] runs as one task. It connects, subscribes to hub
//! presence, keeps the link alive with pings, classifies inbound stanzas,
//! and sends the writes queued through [`SessionHandle`]. After a transport
//! failure it goes back to `Disconnected` and reconnects with exponential
//! backoff, running the subscribe-then-refresh handshake again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use hubbridge_app::ports::{RpcSink, StateStore, StatusPublisher};
use hubbridge_domain::datapoint::DatapointWrite;
use hubbridge_domain::error::BridgeError;
use hubbridge_domain::event::{StatusEvent, StatusKind};
use hubbridge_domain::session::SessionState;

use crate::backoff::Backoff;
use crate::config::XmppConfig;
use crate::error::XmppError;
use crate::stanza::{self, Frame, Query};
use crate::transport::{Connector, Transport};
use crate::xml::Element;

const COMMAND_QUEUE: usize = 64;

/// Cheap handle to a running session.
///
/// Implements [`RpcSink`]: writes are queued to the session task, and
/// rejected with [`BridgeError::SessionUnavailable`] unless the session is
/// online.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<DatapointWrite>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    /// Current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }
}

impl RpcSink for SessionHandle {
    fn set_datapoint(
        &self,
        write: DatapointWrite,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let result = if self.state().is_online() {
            self.commands.try_send(write).map_err(|err| match err {
                TrySendError::Full(_) => XmppError::QueueFull.into(),
                TrySendError::Closed(_) => BridgeError::SessionUnavailable,
            })
        } else {
            Err(BridgeError::SessionUnavailable)
        };
        async move { result }
    }
}

/// How a connection ended without an error.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// The hub closed the stream.
    Closed,
    /// Every [`SessionHandle`] was dropped.
    Shutdown,
}

/// The session state machine.
pub struct HubSession<S, P> {
    config: XmppConfig,
    rpc_jid: String,
    store: Arc<S>,
    publisher: Arc<P>,
    state: watch::Sender<SessionState>,
    commands: mpsc::Receiver<DatapointWrite>,
    ping_counter: u64,
    last_ping_id: Option<String>,
    awaiting_ack: bool,
    refresh_requested: bool,
}

impl<S, P> HubSession<S, P>
where
    S: StateStore + Send + Sync + 'static,
    P: StatusPublisher + Send + Sync + 'static,
{
    /// Create a session and the handle used to reach it.
    pub fn new(config: XmppConfig, store: Arc<S>, publisher: Arc<P>) -> (Self, SessionHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (state, state_rx) = watch::channel(SessionState::Disconnected);
        let session = Self {
            rpc_jid: config.rpc_jid(),
            config,
            store,
            publisher,
            state,
            commands,
            ping_counter: 0,
            last_ping_id: None,
            awaiting_ack: false,
            refresh_requested: false,
        };
        let handle = SessionHandle {
            commands: commands_tx,
            state: state_rx,
        };
        (session, handle)
    }

    /// Spawn the session loop.
    pub fn start<C>(self, connector: C) -> JoinHandle<()>
    where
        C: Connector + Send + Sync + 'static,
    {
        tokio::spawn(self.run(connector))
    }

    /// Connect, serve, and reconnect until every handle is dropped.
    pub async fn run<C: Connector>(mut self, connector: C) {
        let mut backoff = Backoff::new(
            Duration::from_millis(self.config.reconnect_base_ms),
            Duration::from_secs(self.config.reconnect_max_secs),
        );

        loop {
            self.set_state(SessionState::Connecting);
            let outcome = match connector.connect().await {
                Ok(mut transport) => {
                    backoff.reset();
                    self.serve(&mut transport).await
                }
                Err(err) => Err(err),
            };

            match outcome {
                Ok(Outcome::Shutdown) => {
                    tracing::info!("all session handles dropped, stopping");
                    self.set_state(SessionState::Disconnected);
                    return;
                }
                Ok(Outcome::Closed) => tracing::warn!("hub closed the stream"),
                Err(err) => tracing::error!(error = %err, "hub session failed"),
            }

            self.set_state(SessionState::Disconnected);
            self.drop_queued_writes();
            self.publish(StatusKind::Disconnected, Vec::new()).await;

            let delay = backoff.next_delay();
            tracing::info!(
                attempt = backoff.attempt(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "reconnecting"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Serve one connection until it ends.
    async fn serve<T: Transport>(&mut self, transport: &mut T) -> Result<Outcome, XmppError> {
        self.refresh_requested = false;
        self.last_ping_id = None;
        self.awaiting_ack = false;
        self.set_state(SessionState::Online);

        for stanza in self.on_online() {
            transport.send(&stanza).await?;
        }

        let period = self.config.keepalive();
        let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                inbound = transport.recv() => {
                    let Some(raw) = inbound? else {
                        return Ok(Outcome::Closed);
                    };
                    for reply in self.on_stanza(&raw).await {
                        transport.send(&reply).await?;
                    }
                }
                command = self.commands.recv() => {
                    let Some(write) = command else {
                        return Ok(Outcome::Shutdown);
                    };
                    tracing::debug!(%write, "sending write");
                    transport.send(&self.on_write(&write)).await?;
                }
                _ = keepalive.tick() => {
                    if self.awaiting_ack {
                        return Err(XmppError::PingTimeout(period));
                    }
                    let ping = self.next_ping();
                    transport.send(&ping).await?;
                }
            }
        }
    }

    /// Subscription request sent as soon as the connection is up.
    fn on_online(&self) -> Vec<String> {
        vec![
            stanza::presence(&self.config.hub_jid, "subscribe"),
            stanza::presence_with_caps(),
        ]
    }

    fn on_write(&self, write: &DatapointWrite) -> String {
        stanza::set_datapoint(&self.rpc_jid, &Uuid::new_v4().to_string(), write)
    }

    fn next_ping(&mut self) -> String {
        self.ping_counter += 1;
        let id = self.ping_counter.to_string();
        let ping = stanza::ping(&self.rpc_jid, &id);
        self.last_ping_id = Some(id);
        self.awaiting_ack = true;
        ping
    }

    /// Route one inbound stanza, returning the stanzas to send back.
    async fn on_stanza(&mut self, raw: &str) -> Vec<String> {
        let frame = match Element::parse(raw).and_then(|element| stanza::classify(&element, &self.config)) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(error = %err, stanza = raw, "discarding unreadable stanza");
                return Vec::new();
            }
        };

        match frame {
            Frame::Update(updates) => {
                tracing::debug!(count = updates.len(), "update received");
                let serials = self.store.apply_update(&updates);
                self.publish(StatusKind::Update, serials).await;
                Vec::new()
            }
            Frame::RpcResult { id, response } => {
                if id.is_some() && id == self.last_ping_id {
                    self.awaiting_ack = false;
                    tracing::debug!(id = ?id, "ping acknowledged");
                    return Vec::new();
                }
                tracing::debug!(id = ?id, "rpc result received");
                let serials = self.store.apply_response(&response);
                self.publish(StatusKind::Response, serials).await;
                Vec::new()
            }
            Frame::Presence { from_hub, kind } => self.on_presence(from_hub, kind.as_deref()).await,
            Frame::Query(query) => vec![self.answer(query)],
            Frame::Unknown => {
                tracing::warn!(stanza = raw, "unclassified frame");
                Vec::new()
            }
        }
    }

    async fn on_presence(&mut self, from_hub: bool, kind: Option<&str>) -> Vec<String> {
        if !from_hub {
            tracing::debug!(kind, "presence from another entity");
            return Vec::new();
        }
        match kind {
            Some("subscribe") => {
                return vec![stanza::presence(&self.config.hub_jid, "subscribed")];
            }
            None | Some("subscribed") => {}
            Some(other) => {
                tracing::debug!(kind = other, "hub presence ignored");
                return Vec::new();
            }
        }
        if self.refresh_requested {
            return Vec::new();
        }

        // refresh only once the hub confirmed, so no push update is missed
        self.refresh_requested = true;
        self.set_state(SessionState::Subscribed);
        self.publish(StatusKind::Subscribed, Vec::new()).await;
        tracing::info!("hub presence confirmed, requesting full refresh");
        vec![stanza::get_all(&self.rpc_jid, &Uuid::new_v4().to_string())]
    }

    fn answer(&self, query: Query) -> String {
        match query {
            Query::DiscoInfo { from, id, node } => {
                stanza::disco_info_result(&from, &id, node.as_deref(), &self.config.update_node)
            }
            Query::Ping { from, id } => stanza::empty_result(&from, &id),
        }
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::info!(%state, %previous, "session state changed");
        }
    }

    fn drop_queued_writes(&mut self) {
        while let Ok(write) = self.commands.try_recv() {
            tracing::warn!(%write, "dropping write queued before disconnect");
        }
    }

    async fn publish(&self, kind: StatusKind, serials: Vec<String>) {
        if let Err(err) = self.publisher.publish(StatusEvent::new(kind, serials)).await {
            tracing::warn!(error = %err, "status publish failed");
        }
    }
}
