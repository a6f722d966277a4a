//! Configuration loading: TOML file with environment variable overrides.
//!
//! Reads `hubbridge.toml` from the working directory, or the file named by
//! `HUBBRIDGE_CONFIG`. Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::path::Path;

use serde::Deserialize;

use hubbridge_adapter_xmpp::XmppConfig;
use hubbridge_domain::actuator::Actuator;

const DEFAULT_PATH: &str = "hubbridge.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Hub connection.
    pub hub: XmppConfig,
    /// Scene endpoints known before the hub sends its project.
    pub scenes: Vec<SceneConfig>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// A virtual scene whose trigger datapoint lives on a physical actuator.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneConfig {
    /// Scene serial, as used in command URLs.
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Serial of the actuator owning the trigger datapoint.
    pub owner: String,
}

impl SceneConfig {
    /// The store entry for this scene.
    #[must_use]
    pub fn to_actuator(&self) -> Actuator {
        let name = if self.name.is_empty() {
            self.id.as_str()
        } else {
            self.name.as_str()
        };
        Actuator::virtual_endpoint(self.id.clone(), name, self.owner.clone())
    }
}

impl Config {
    /// Load the configuration file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HUBBRIDGE_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HUBBRIDGE_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("HUBBRIDGE_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("HUBBRIDGE_HUB_HOST") {
            self.hub.host = val;
        }
        if let Ok(val) = std::env::var("HUBBRIDGE_HUB_JID") {
            self.hub.jid = val;
        }
        if let Ok(val) = std::env::var("HUBBRIDGE_HUB_PASSWORD") {
            self.hub.password = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if !self.hub.jid.contains('@') {
            return Err(ConfigError::Validation(format!(
                "hub jid '{}' must be of the form user@domain",
                self.hub.jid
            )));
        }
        if self.hub.keepalive_secs == 0 {
            return Err(ConfigError::Validation(
                "hub keepalive_secs must be non-zero".to_string(),
            ));
        }
        if self.hub.max_stanza_bytes == 0 {
            return Err(ConfigError::Validation(
                "hub max_stanza_bytes must be non-zero".to_string(),
            ));
        }
        if let Some(scene) = self
            .scenes
            .iter()
            .find(|scene| scene.id.is_empty() || scene.owner.is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "scene '{}' needs both an id and an owner",
                scene.name
            )));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hubbridged=info,hubbridge=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.hub.port, 5222);
        assert!(config.scenes.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.hub.hub_jid, "mrha@busch-jaeger.de");
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [logging]
            filter = 'debug'

            [hub]
            host = '192.168.1.20'
            password = 'secret'
            keepalive_secs = 30

            [[scenes]]
            id = 'FFFF48010001'
            name = 'Movie night'
            owner = 'ABB700D99999'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.hub.host, "192.168.1.20");
        assert_eq!(config.hub.password, "secret");
        assert_eq!(config.hub.keepalive_secs, 30);
        assert_eq!(config.scenes.len(), 1);
        assert_eq!(config.scenes[0].owner, "ABB700D99999");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn should_read_config_from_file() {
        let path = std::env::temp_dir().join(format!("hubbridge-{}.toml", std::process::id()));
        std::fs::write(&path, "[server]\nport = 9191\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.server.port, 9191);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_jid_without_domain() {
        let mut config = Config::default();
        config.hub.jid = "installer".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("user@domain"));
    }

    #[test]
    fn should_reject_zero_keepalive() {
        let mut config = Config::default();
        config.hub.keepalive_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_stanza_cap() {
        let mut config = Config::default();
        config.hub.max_stanza_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_scene_without_owner() {
        let mut config = Config::default();
        config.scenes.push(SceneConfig {
            id: "FFFF48010001".to_string(),
            name: "Movie night".to_string(),
            owner: String::new(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_turn_scene_into_virtual_endpoint() {
        let scene = SceneConfig {
            id: "FFFF48010001".to_string(),
            name: String::new(),
            owner: "ABB700D99999".to_string(),
        };
        let actuator = scene.to_actuator();
        assert!(actuator.is_virtual());
        assert_eq!(actuator.serial, "FFFF48010001");
        assert_eq!(actuator.serial_number, "ABB700D99999");
        assert_eq!(actuator.type_name, "FFFF48010001");
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
