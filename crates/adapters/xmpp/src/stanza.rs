//! Stanza builders and inbound frame classification.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use hubbridge_domain::datapoint::DatapointWrite;
use hubbridge_domain::rpc::{DatapointUpdate, RpcResponse};

use crate::config::XmppConfig;
use crate::error::XmppError;
use crate::project;
use crate::xml::Element;

const NS_CLIENT: &str = "jabber:client";
const NS_STREAM: &str = "http://etherx.jabber.org/streams";
const NS_SASL: &str = "urn:ietf:params:xml:ns:xmpp-sasl";
const NS_BIND: &str = "urn:ietf:params:xml:ns:xmpp-bind";
const NS_SESSION: &str = "urn:ietf:params:xml:ns:xmpp-session";
const NS_RPC: &str = "jabber:iq:rpc";
const NS_PING: &str = "urn:xmpp:ping";
const NS_CAPS: &str = "http://jabber.org/protocol/caps";
const NS_DISCO_INFO: &str = "http://jabber.org/protocol/disco#info";
const CAPS_NODE: &str = "urn:hubbridge:caps";
const CAPS_VERSION: &str = "1.0";

/// Opening tag of a client stream. Sent again after authentication.
#[must_use]
pub fn stream_header(domain: &str) -> String {
    format!(
        "<?xml version='1.0'?><stream:stream to='{domain}' xmlns='{NS_CLIENT}' xmlns:stream='{NS_STREAM}' version='1.0'>"
    )
}

/// SASL `PLAIN` authentication request.
#[must_use]
pub fn auth_plain(username: &str, password: &str) -> String {
    let credentials = STANDARD.encode(format!("\0{username}\0{password}"));
    Element::new("auth")
        .with_attr("xmlns", NS_SASL)
        .with_attr("mechanism", "PLAIN")
        .with_text(credentials)
        .to_string()
}

/// Resource binding request.
#[must_use]
pub fn bind(id: &str, resource: &str) -> String {
    Element::new("iq")
        .with_attr("type", "set")
        .with_attr("id", id)
        .with_child(
            Element::new("bind")
                .with_attr("xmlns", NS_BIND)
                .with_child(Element::new("resource").with_text(resource)),
        )
        .to_string()
}

/// Legacy session establishment, for servers still advertising it.
#[must_use]
pub fn session_start(id: &str) -> String {
    Element::new("iq")
        .with_attr("type", "set")
        .with_attr("id", id)
        .with_child(Element::new("session").with_attr("xmlns", NS_SESSION))
        .to_string()
}

fn method_call(to: &str, id: &str, method: &str, params: Vec<Element>) -> String {
    let params = params.into_iter().fold(Element::new("params"), |params, value| {
        params.with_child(Element::new("param").with_child(Element::new("value").with_child(value)))
    });
    Element::new("iq")
        .with_attr("type", "set")
        .with_attr("to", to)
        .with_attr("id", id)
        .with_child(
            Element::new("query").with_attr("xmlns", NS_RPC).with_child(
                Element::new("methodCall")
                    .with_child(Element::new("methodName").with_text(method))
                    .with_child(params),
            ),
        )
        .to_string()
}

/// `RemoteInterface.setDatapoint` call: address and value, both as strings.
#[must_use]
pub fn set_datapoint(to: &str, id: &str, write: &DatapointWrite) -> String {
    method_call(
        to,
        id,
        "RemoteInterface.setDatapoint",
        vec![
            Element::new("string").with_text(write.target.to_string()),
            Element::new("string").with_text(write.value.to_string()),
        ],
    )
}

/// `RemoteInterface.getAll` call returning the whole project.
#[must_use]
pub fn get_all(to: &str, id: &str) -> String {
    method_call(
        to,
        id,
        "RemoteInterface.getAll",
        vec![
            Element::new("string").with_text("de"),
            Element::new("int").with_text("4"),
            Element::new("int").with_text("0"),
            Element::new("int").with_text("0"),
        ],
    )
}

/// Keepalive ping.
#[must_use]
pub fn ping(to: &str, id: &str) -> String {
    Element::new("iq")
        .with_attr("type", "get")
        .with_attr("to", to)
        .with_attr("id", id)
        .with_child(Element::new("ping").with_attr("xmlns", NS_PING))
        .to_string()
}

/// Presence of the given type addressed to `to`.
#[must_use]
pub fn presence(to: &str, kind: &str) -> String {
    Element::new("presence")
        .with_attr("to", to)
        .with_attr("type", kind)
        .to_string()
}

/// Initial presence advertising entity capabilities.
#[must_use]
pub fn presence_with_caps() -> String {
    Element::new("presence")
        .with_child(
            Element::new("c")
                .with_attr("xmlns", NS_CAPS)
                .with_attr("node", CAPS_NODE)
                .with_attr("ver", CAPS_VERSION),
        )
        .to_string()
}

/// Answer to a service discovery query: the features that make the hub
/// push update events.
#[must_use]
pub fn disco_info_result(to: &str, id: &str, node: Option<&str>, update_node: &str) -> String {
    let mut query = Element::new("query").with_attr("xmlns", NS_DISCO_INFO);
    if let Some(node) = node {
        query = query.with_attr("node", node);
    }
    let query = [NS_DISCO_INFO.to_string(), NS_CAPS.to_string(), format!("{update_node}+notify")]
        .into_iter()
        .fold(
            query.with_child(
                Element::new("identity")
                    .with_attr("category", "client")
                    .with_attr("type", "pc")
                    .with_attr("name", "hubbridge"),
            ),
            |query, feature| query.with_child(Element::new("feature").with_attr("var", feature)),
        );
    Element::new("iq")
        .with_attr("type", "result")
        .with_attr("to", to)
        .with_attr("id", id)
        .with_child(query)
        .to_string()
}

/// Empty `result` answering an `iq` get, such as a ping from the hub.
#[must_use]
pub fn empty_result(to: &str, id: &str) -> String {
    Element::new("iq")
        .with_attr("type", "result")
        .with_attr("to", to)
        .with_attr("id", id)
        .to_string()
}

/// A request from the hub this client must answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Service discovery of this client's features.
    DiscoInfo {
        from: String,
        id: String,
        node: Option<String>,
    },
    /// Liveness check.
    Ping { from: String, id: String },
}

/// An inbound stanza, classified.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Datapoint values pushed by the hub.
    Update(Vec<DatapointUpdate>),
    /// Result of an `iq` sent to the RPC endpoint.
    RpcResult {
        id: Option<String>,
        response: RpcResponse,
    },
    /// Presence from anyone; `from_hub` is set for the hub's own presence.
    Presence {
        from_hub: bool,
        kind: Option<String>,
    },
    /// A request to answer.
    Query(Query),
    /// Anything else.
    Unknown,
}

/// Classify a stanza. The first matching class wins, in declaration order
/// of [`Frame`].
///
/// # Errors
///
/// Returns an error when an update or RPC payload is not well-formed.
pub fn classify(stanza: &Element, config: &XmppConfig) -> Result<Frame, XmppError> {
    let from = stanza.attr("from").unwrap_or_default();
    let kind = stanza.attr("type");

    if stanza.name() == "message" && kind == Some("headline") && bare(from) == config.hub_jid {
        if let Some(items) = stanza
            .find(&["event", "items"])
            .filter(|items| items.attr("node") == Some(config.update_node.as_str()))
        {
            return decode_update(items).map(Frame::Update);
        }
    }

    if stanza.name() == "iq" && kind == Some("result") && from == config.rpc_jid() {
        return Ok(Frame::RpcResult {
            id: stanza.attr("id").map(str::to_string),
            response: decode_response(stanza)?,
        });
    }

    if stanza.name() == "presence" {
        return Ok(Frame::Presence {
            from_hub: bare(from) == config.hub_jid,
            kind: kind.map(str::to_string),
        });
    }

    if stanza.name() == "iq" && kind == Some("get") {
        if let Some(query) = decode_query(stanza) {
            return Ok(Frame::Query(query));
        }
    }

    Ok(Frame::Unknown)
}

fn bare(jid: &str) -> &str {
    jid.split_once('/').map_or(jid, |(bare, _)| bare)
}

fn decode_update(items: &Element) -> Result<Vec<DatapointUpdate>, XmppError> {
    let mut updates = Vec::new();
    for item in items.children_named("item") {
        if let Some(data) = item.find(&["update", "data"]) {
            updates.extend(project::parse_updates(data.text())?);
        }
    }
    Ok(updates)
}

fn decode_response(iq: &Element) -> Result<RpcResponse, XmppError> {
    let Some(response) = iq.find(&["query", "methodResponse"]) else {
        return Ok(RpcResponse::Empty);
    };

    if let Some(fault) = response.find(&["fault", "value", "struct"]) {
        let member = |name: &str| {
            fault
                .children_named("member")
                .find(|member| member.child("name").map(Element::text) == Some(name))
                .and_then(|member| member.child("value"))
                .map(scalar)
        };
        return Ok(RpcResponse::Fault {
            code: member("faultCode")
                .and_then(|code| code.trim().parse().ok())
                .unwrap_or_default(),
            message: member("faultString").unwrap_or_default().to_string(),
        });
    }

    let Some(value) = response.find(&["params", "param", "value"]) else {
        return Ok(RpcResponse::Empty);
    };
    let payload = scalar(value);
    if project::is_project(payload) {
        return project::parse_project(payload).map(RpcResponse::Project);
    }
    Ok(RpcResponse::Value(payload.to_string()))
}

/// Text of an XML-RPC `<value>`, typed (`<string>`, `<int>`, ...) or bare.
fn scalar(value: &Element) -> &str {
    value.children().next().map_or(value.text(), Element::text)
}

fn decode_query(iq: &Element) -> Option<Query> {
    let from = iq.attr("from")?.to_string();
    let id = iq.attr("id")?.to_string();

    if let Some(query) = iq
        .child("query")
        .filter(|query| query.attr("xmlns") == Some(NS_DISCO_INFO))
    {
        return Some(Query::DiscoInfo {
            from,
            id,
            node: query.attr("node").map(str::to_string),
        });
    }
    iq.child("ping")
        .filter(|ping| ping.attr("xmlns") == Some(NS_PING))
        .map(|_| Query::Ping { from, id })
}
