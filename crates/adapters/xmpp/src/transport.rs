//! Byte transport to the hub and the login handshake.

use std::future::Future;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;
use uuid::Uuid;

use crate::config::XmppConfig;
use crate::error::XmppError;
use crate::framing::{Framed, StanzaFramer};
use crate::stanza;
use crate::xml::Element;

/// An authenticated stanza stream.
pub trait Transport: Send {
    /// Write one stanza.
    fn send(&mut self, stanza: &str) -> impl Future<Output = Result<(), XmppError>> + Send;

    /// Next inbound stanza, `None` once the hub closed the stream.
    ///
    /// Must be cancel safe: the session polls it inside `select!`.
    fn recv(&mut self) -> impl Future<Output = Result<Option<String>, XmppError>> + Send;
}

/// Opens authenticated transports.
pub trait Connector {
    type Transport: Transport;

    /// Connect and log in.
    fn connect(&self) -> impl Future<Output = Result<Self::Transport, XmppError>> + Send;
}

/// Connects over plain TCP and logs in with SASL `PLAIN`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    config: XmppConfig,
}

impl TcpConnector {
    /// Create a connector for the configured hub.
    #[must_use]
    pub fn new(config: XmppConfig) -> Self {
        Self { config }
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(&self) -> Result<TcpTransport, XmppError> {
        tracing::info!(host = %self.config.host, port = self.config.port, "connecting to hub");
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port)).await?;
        let mut transport = TcpTransport::new(stream, self.config.max_stanza_bytes);
        transport.login(&self.config).await?;
        Ok(transport)
    }
}

/// XMPP stream over a TCP socket.
#[derive(Debug)]
pub struct TcpTransport {
    reader: FramedRead<OwnedReadHalf, StanzaFramer>,
    writer: OwnedWriteHalf,
    jid: String,
}

impl TcpTransport {
    fn new(stream: TcpStream, max_stanza_bytes: usize) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: FramedRead::new(reader, StanzaFramer::with_max(max_stanza_bytes)),
            writer,
            jid: String::new(),
        }
    }

    /// Full address bound for this connection.
    #[must_use]
    pub fn jid(&self) -> &str {
        &self.jid
    }

    async fn login(&mut self, config: &XmppConfig) -> Result<(), XmppError> {
        self.send(&stanza::stream_header(config.domain())).await?;
        let features = self.expect_features().await?;
        let offers_plain = features.child("mechanisms").is_some_and(|mechanisms| {
            mechanisms
                .children_named("mechanism")
                .any(|mechanism| mechanism.text() == "PLAIN")
        });
        if !offers_plain {
            return Err(XmppError::Auth("PLAIN mechanism not offered".to_string()));
        }

        self.send(&stanza::auth_plain(config.username(), &config.password))
            .await?;
        let outcome = self.expect_stanza().await?;
        match outcome.name() {
            "success" => {}
            "failure" => {
                let reason = outcome
                    .children()
                    .next()
                    .map_or("rejected", Element::name);
                return Err(XmppError::Auth(reason.to_string()));
            }
            other => {
                return Err(XmppError::Protocol(format!(
                    "unexpected <{other}> during authentication"
                )));
            }
        }

        self.send(&stanza::stream_header(config.domain())).await?;
        let features = self.expect_features().await?;
        if features.child("bind").is_none() {
            return Err(XmppError::Protocol(
                "server offers no resource binding".to_string(),
            ));
        }

        let resource = format!("{}-{}", config.resource, Uuid::new_v4().simple());
        self.send(&stanza::bind("bind", &resource)).await?;
        let bound = self.expect_result("bind").await?;
        self.jid = bound
            .find(&["bind", "jid"])
            .map_or_else(|| format!("{}/{resource}", config.jid), |jid| jid.text().to_string());

        if features.child("session").is_some() {
            self.send(&stanza::session_start("session")).await?;
            self.expect_result("session").await?;
        }

        tracing::info!(jid = %self.jid, "logged in to hub");
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<Framed>, XmppError> {
        self.reader.next().await.transpose()
    }

    async fn expect_stanza(&mut self) -> Result<Element, XmppError> {
        loop {
            match self.read_frame().await? {
                Some(Framed::Stanza(raw)) => return Element::parse(&raw),
                Some(Framed::Opened) => {}
                Some(Framed::Closed) | None => return Err(XmppError::Closed),
            }
        }
    }

    async fn expect_features(&mut self) -> Result<Element, XmppError> {
        let features = self.expect_stanza().await?;
        if features.name() == "features" {
            Ok(features)
        } else {
            Err(XmppError::Protocol(format!(
                "expected stream features, got <{}>",
                features.name()
            )))
        }
    }

    async fn expect_result(&mut self, id: &str) -> Result<Element, XmppError> {
        loop {
            let stanza = self.expect_stanza().await?;
            if stanza.name() != "iq" || stanza.attr("id") != Some(id) {
                tracing::debug!(name = stanza.name(), "skipping stanza during login");
                continue;
            }
            return match stanza.attr("type") {
                Some("result") => Ok(stanza),
                _ => Err(XmppError::Protocol(format!("{id} request rejected"))),
            };
        }
    }
}

impl Transport for TcpTransport {
    async fn send(&mut self, stanza: &str) -> Result<(), XmppError> {
        tracing::debug!(stanza, "sending");
        self.writer.write_all(stanza.as_bytes()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, XmppError> {
        loop {
            match self.read_frame().await? {
                Some(Framed::Stanza(raw)) if raw.starts_with("<stream:error") => {
                    return Err(XmppError::Protocol(raw));
                }
                Some(Framed::Stanza(raw)) => {
                    tracing::debug!(stanza = %raw, "received");
                    return Ok(Some(raw));
                }
                Some(Framed::Opened) => {}
                Some(Framed::Closed) | None => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const SERVER_HEADER: &str = "<?xml version='1.0'?><stream:stream xmlns='jabber:client' xmlns:stream='http://etherx.jabber.org/streams' from='busch-jaeger.de' id='s1' version='1.0'>";
    const SASL_FEATURES: &str = "<stream:features><mechanisms xmlns='urn:ietf:params:xml:ns:xmpp-sasl'><mechanism>PLAIN</mechanism></mechanisms></stream:features>";
    const BIND_FEATURES: &str = "<stream:features><bind xmlns='urn:ietf:params:xml:ns:xmpp-bind'/></stream:features>";

    async fn read_until(socket: &mut TcpStream, marker: &str) -> String {
        let mut received = String::new();
        let mut chunk = [0_u8; 1024];
        while !received.contains(marker) {
            let read = socket.read(&mut chunk).await.unwrap();
            assert!(read > 0, "client closed before sending {marker}");
            received.push_str(std::str::from_utf8(&chunk[..read]).unwrap());
        }
        received
    }

    async fn listen() -> (TcpListener, XmppConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = XmppConfig {
            host: "127.0.0.1".to_string(),
            port: listener.local_addr().unwrap().port(),
            password: "secret".to_string(),
            ..XmppConfig::default()
        };
        (listener, config)
    }

    #[tokio::test]
    async fn should_log_in_and_receive_stanzas() {
        let (listener, config) = listen().await;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_until(&mut socket, "<stream:stream").await;
            socket
                .write_all(format!("{SERVER_HEADER}{SASL_FEATURES}").as_bytes())
                .await
                .unwrap();
            let auth = read_until(&mut socket, "</auth>").await;
            socket
                .write_all(b"<success xmlns='urn:ietf:params:xml:ns:xmpp-sasl'/>")
                .await
                .unwrap();
            read_until(&mut socket, "<stream:stream").await;
            socket
                .write_all(format!("{SERVER_HEADER}{BIND_FEATURES}").as_bytes())
                .await
                .unwrap();
            let bind = read_until(&mut socket, "</iq>").await;
            socket
                .write_all(b"<iq type='result' id='bind'><bind xmlns='urn:ietf:params:xml:ns:xmpp-bind'><jid>installer@busch-jaeger.de/hubbridge-1</jid></bind></iq><presence from='mrha@busch-jaeger.de/rpc'/>")
                .await
                .unwrap();
            (auth, bind, socket)
        });

        let mut transport = TcpConnector::new(config).connect().await.unwrap();
        assert_eq!(transport.jid(), "installer@busch-jaeger.de/hubbridge-1");
        assert_eq!(
            transport.recv().await.unwrap(),
            Some("<presence from='mrha@busch-jaeger.de/rpc'/>".to_string())
        );

        let (auth, bind, _socket) = server.await.unwrap();
        assert!(auth.contains("mechanism=\"PLAIN\""));
        assert!(bind.contains("<resource>hubbridge-"));
    }

    #[tokio::test]
    async fn should_fail_when_credentials_are_rejected() {
        let (listener, config) = listen().await;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_until(&mut socket, "<stream:stream").await;
            socket
                .write_all(format!("{SERVER_HEADER}{SASL_FEATURES}").as_bytes())
                .await
                .unwrap();
            read_until(&mut socket, "</auth>").await;
            socket
                .write_all(b"<failure xmlns='urn:ietf:params:xml:ns:xmpp-sasl'><not-authorized/></failure>")
                .await
                .unwrap();
            socket
        });

        let err = TcpConnector::new(config).connect().await.unwrap_err();
        assert!(matches!(err, XmppError::Auth(reason) if reason == "not-authorized"));
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn should_fail_on_end_tag_outside_a_stanza() {
        let (listener, config) = listen().await;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_until(&mut socket, "<stream:stream").await;
            socket
                .write_all(format!("{SERVER_HEADER}</features>{SASL_FEATURES}").as_bytes())
                .await
                .unwrap();
            socket
        });

        let err = TcpConnector::new(config).connect().await.unwrap_err();
        assert!(matches!(err, XmppError::Protocol(message) if message.contains("</features>")));
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn should_report_closed_stream() {
        let (listener, config) = listen().await;
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_until(&mut socket, "<stream:stream").await;
            socket.write_all(SERVER_HEADER.as_bytes()).await.unwrap();
            socket.write_all(b"</stream:stream>").await.unwrap();
        });

        let err = TcpConnector::new(config).connect().await.unwrap_err();
        assert!(matches!(err, XmppError::Closed));
    }
}
