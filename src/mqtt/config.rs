//! MQTT connection settings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;

/// Broker endpoint and credentials. Empty user means anonymous access.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttServer {
    /// Broker address as "host" or "host:port" (port defaults to 1883)
    pub url: String,
    pub user: String,
    pub pw: String,
}

impl fmt::Display for MqttServer {
    /// Formats the server as "user@url"; the password is excluded.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.user.is_empty() {
            write!(f, "{}", self.url)
        } else {
            write!(f, "{}@{}", self.user, self.url)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub server: MqttServer,
    pub client_id: String,
    pub keep_alive_secs: u64,
    pub reconnect_delay_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            server: MqttServer {
                url: "localhost:1883".to_string(),
                user: String::new(),
                pw: String::new(),
            },
            client_id: "ledcontroller".to_string(),
            keep_alive_secs: 5,
            reconnect_delay_secs: 3,
        }
    }
}

impl MqttConfig {
    /// Splits the configured url into host and port. A malformed
    /// address is a startup error; there is no sensible fallback host.
    pub fn broker_address(&self) -> Result<(String, u16), ConfigError> {
        let mut parts = self.server.url.split(':');
        let host = parts.next().unwrap_or_default();
        if host.is_empty() {
            return Err(ConfigError::BrokerAddress {
                url: self.server.url.clone(),
                reason: "missing host".to_string(),
            });
        }

        let port = match parts.next() {
            None => 1883,
            Some(raw) => raw.parse().map_err(|_| ConfigError::BrokerAddress {
                url: self.server.url.clone(),
                reason: format!("invalid port '{raw}'"),
            })?,
        };

        Ok((host.to_string(), port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn address_with_port_parses() {
        let mut config = MqttConfig::default();
        config.server.url = "broker.local:8883".to_string();

        assert_eq!(
            config.broker_address().unwrap(),
            ("broker.local".to_string(), 8883)
        );
    }

    #[test]
    fn missing_port_defaults_to_1883() {
        let mut config = MqttConfig::default();
        config.server.url = "broker.local".to_string();

        assert_eq!(
            config.broker_address().unwrap(),
            ("broker.local".to_string(), 1883)
        );
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut config = MqttConfig::default();
        config.server.url = "broker.local:mqtt".to_string();

        assert!(config.broker_address().is_err());
    }

    #[test]
    fn missing_host_is_rejected() {
        let mut config = MqttConfig::default();
        config.server.url = ":1883".to_string();

        assert!(config.broker_address().is_err());
    }

    #[test]
    fn display_excludes_password() {
        let server = MqttServer {
            url: "broker.local:1883".to_string(),
            user: "pi".to_string(),
            pw: "secret".to_string(),
        };

        assert_eq!(server.to_string(), "pi@broker.local:1883");
    }
}
