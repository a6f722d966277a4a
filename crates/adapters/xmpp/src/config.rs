//! Hub connection configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::framing::DEFAULT_MAX_STANZA_BYTES;

/// Configuration for the hub session.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct XmppConfig {
    /// Hub hostname or IP address.
    pub host: String,
    /// Hub XMPP port.
    pub port: u16,
    /// Login address, `user@domain`.
    pub jid: String,
    /// Login password.
    pub password: String,
    /// Prefix of the bound resource; a random suffix is appended per connection.
    pub resource: String,
    /// Bare address of the hub itself.
    pub hub_jid: String,
    /// Resource of the hub that answers RPC calls.
    pub rpc_resource: String,
    /// Pub-sub node carrying status updates.
    pub update_node: String,
    /// Interval between keepalive pings, in seconds.
    pub keepalive_secs: u64,
    /// First reconnect delay, in milliseconds.
    pub reconnect_base_ms: u64,
    /// Upper bound of the reconnect delay, in seconds.
    pub reconnect_max_secs: u64,
    /// Largest inbound stanza accepted before the connection is dropped.
    pub max_stanza_bytes: usize,
}

impl Default for XmppConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5222,
            jid: "installer@busch-jaeger.de".to_string(),
            password: String::new(),
            resource: "hubbridge".to_string(),
            hub_jid: "mrha@busch-jaeger.de".to_string(),
            rpc_resource: "rpc".to_string(),
            update_node: "http://abb.com/protocol/update".to_string(),
            keepalive_secs: 10,
            reconnect_base_ms: 500,
            reconnect_max_secs: 60,
            max_stanza_bytes: DEFAULT_MAX_STANZA_BYTES,
        }
    }
}

impl XmppConfig {
    /// Full address of the hub's RPC endpoint.
    #[must_use]
    pub fn rpc_jid(&self) -> String {
        format!("{}/{}", self.hub_jid, self.rpc_resource)
    }

    /// Local part of the login address.
    #[must_use]
    pub fn username(&self) -> &str {
        self.jid.split_once('@').map_or(self.jid.as_str(), |(user, _)| user)
    }

    /// Domain part of the login address.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.jid.split_once('@').map_or(self.jid.as_str(), |(_, domain)| domain)
    }

    /// Keepalive period.
    #[must_use]
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = XmppConfig::default();
        assert_eq!(config.port, 5222);
        assert_eq!(config.jid, "installer@busch-jaeger.de");
        assert_eq!(config.hub_jid, "mrha@busch-jaeger.de");
        assert_eq!(config.keepalive_secs, 10);
        assert_eq!(config.rpc_jid(), "mrha@busch-jaeger.de/rpc");
        assert_eq!(config.max_stanza_bytes, 1024 * 1024);
    }

    #[test]
    fn should_split_login_address() {
        let config = XmppConfig::default();
        assert_eq!(config.username(), "installer");
        assert_eq!(config.domain(), "busch-jaeger.de");
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            host = "192.168.1.20"
            password = "secret"
            keepalive_secs = 30
        "#;
        let config: XmppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.host, "192.168.1.20");
        assert_eq!(config.password, "secret");
        assert_eq!(config.keepalive(), Duration::from_secs(30));
        assert_eq!(config.rpc_resource, "rpc");
    }
}
