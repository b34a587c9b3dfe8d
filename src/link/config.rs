//! # Tunnel identity and endpoint configuration.
//!
//! [`TunnelConfig`] carries what the external engine needs to create a session:
//! identity keys, the local tunnel address, and the remote endpoint.
//!
//! ```toml
//! name = "wg0"
//! private_key = "YEocP0e2o1WT5GlvBvQzVF7EeR6z9aCk4ANOVPBsw2M="
//! address = "10.6.0.2"
//! netmask = "255.255.255.255"     # optional
//! gateway = "0.0.0.0"             # optional
//! endpoint = "vpn.example.com"    # IP literal or hostname
//! port = 51820                    # optional
//! peer_public_key = "9jalV3EEBnVXahro0pRMQ+cHlmjE33Slo9tddzCVtCw="
//! preshared_key = "..."           # optional
//! persistent_keepalive = 25       # optional, seconds, 0 disables
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use base64::prelude::*;
use serde::Deserialize;

use crate::error::ConfigError;

/// Length of a decoded Curve25519 key.
const KEY_LEN: usize = 32;

/// Remote endpoint: a literal address used as-is, or a hostname the engine resolves.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Endpoint {
    /// Literal IP address.
    Ip(IpAddr),
    /// Hostname resolved by the engine (possibly asynchronously).
    Host(String),
}

impl Endpoint {
    /// Returns the literal address, if the endpoint is one.
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Endpoint::Ip(ip) => Some(*ip),
            Endpoint::Host(_) => None,
        }
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        match trimmed.parse::<IpAddr>() {
            Ok(ip) => Endpoint::Ip(ip),
            Err(_) => Endpoint::Host(trimmed.to_string()),
        }
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Endpoint::from(s.to_string())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Ip(ip) => write!(f, "{ip}"),
            Endpoint::Host(host) => f.write_str(host),
        }
    }
}

/// Configuration of one tunnel session.
#[derive(Clone, Deserialize)]
pub struct TunnelConfig {
    /// Name used in events and logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Local private key, base64.
    pub private_key: String,
    /// Local address on the tunnel interface.
    pub address: Ipv4Addr,
    /// Netmask of the tunnel interface.
    #[serde(default = "default_netmask")]
    pub netmask: Ipv4Addr,
    /// Gateway of the underlying interface.
    #[serde(default = "default_gateway")]
    pub gateway: Ipv4Addr,
    /// Remote endpoint.
    pub endpoint: Endpoint,
    /// Remote UDP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Remote public key, base64.
    pub peer_public_key: String,
    /// Optional pre-shared key, base64.
    #[serde(default)]
    pub preshared_key: Option<String>,
    /// Keepalive interval in seconds (`0` disables).
    #[serde(default = "default_keepalive")]
    pub persistent_keepalive: u16,
}

fn default_name() -> String {
    "wg0".to_string()
}

fn default_netmask() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}

fn default_gateway() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_port() -> u16 {
    51820
}

fn default_keepalive() -> u16 {
    25
}

impl TunnelConfig {
    /// Short form: host netmask, no gateway, keepalive 25s, no pre-shared key.
    pub fn new(
        address: Ipv4Addr,
        private_key: impl Into<String>,
        endpoint: impl Into<Endpoint>,
        peer_public_key: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: default_name(),
            private_key: private_key.into(),
            address,
            netmask: default_netmask(),
            gateway: default_gateway(),
            endpoint: endpoint.into(),
            port,
            peer_public_key: peer_public_key.into(),
            preshared_key: None,
            persistent_keepalive: default_keepalive(),
        }
    }

    /// Returns the config with another tunnel name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the config with the given netmask and gateway.
    pub fn with_subnet(mut self, netmask: Ipv4Addr, gateway: Ipv4Addr) -> Self {
        self.netmask = netmask;
        self.gateway = gateway;
        self
    }

    /// Returns the config with a pre-shared key.
    pub fn with_preshared_key(mut self, key: impl Into<String>) -> Self {
        self.preshared_key = Some(key.into());
        self
    }

    /// Returns the config with another keepalive interval (`0` disables).
    pub fn with_keepalive(mut self, secs: u16) -> Self {
        self.persistent_keepalive = secs;
        self
    }

    /// Parse a tunnel configuration from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let cfg: TunnelConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks keys, endpoint and port before anything is handed to the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Missing("name"));
        }
        check_key("private_key", &self.private_key)?;
        check_key("peer_public_key", &self.peer_public_key)?;
        if let Some(psk) = &self.preshared_key {
            check_key("preshared_key", psk)?;
        }
        match &self.endpoint {
            Endpoint::Host(host) if host.is_empty() => return Err(ConfigError::Missing("endpoint")),
            Endpoint::Host(host) if host.chars().any(char::is_whitespace) => {
                return Err(ConfigError::invalid("endpoint", "hostname contains whitespace"));
            }
            Endpoint::Ip(ip) if ip.is_unspecified() => {
                return Err(ConfigError::invalid("endpoint", "unspecified address"));
            }
            _ => {}
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("port", "must be non-zero"));
        }
        if self.address.is_unspecified() {
            return Err(ConfigError::invalid("address", "unspecified address"));
        }
        Ok(())
    }
}

fn check_key(field: &'static str, key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::Missing(field));
    }
    let bytes = BASE64_STANDARD
        .decode(key.trim())
        .map_err(|e| ConfigError::invalid(field, format!("not base64: {e}")))?;
    if bytes.len() != KEY_LEN {
        return Err(ConfigError::invalid(
            field,
            format!("decodes to {} bytes, expected {KEY_LEN}", bytes.len()),
        ));
    }
    Ok(())
}

impl fmt::Debug for TunnelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelConfig")
            .field("name", &self.name)
            .field("private_key", &"<redacted>")
            .field("address", &self.address)
            .field("netmask", &self.netmask)
            .field("gateway", &self.gateway)
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("peer_public_key", &self.peer_public_key)
            .field(
                "preshared_key",
                &self.preshared_key.as_ref().map(|_| "<redacted>"),
            )
            .field("persistent_keepalive", &self.persistent_keepalive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: &str = "YEocP0e2o1WT5GlvBvQzVF7EeR6z9aCk4ANOVPBsw2M=";
    const KEY_B: &str = "9jalV3EEBnVXahro0pRMQ+cHlmjE33Slo9tddzCVtCw=";

    fn sample() -> TunnelConfig {
        TunnelConfig::new(
            Ipv4Addr::new(10, 6, 0, 2),
            KEY_A,
            "203.0.113.9",
            KEY_B,
            51820,
        )
    }

    #[test]
    fn test_short_form_defaults() {
        let cfg = sample();
        assert_eq!(cfg.netmask, Ipv4Addr::new(255, 255, 255, 255));
        assert_eq!(cfg.gateway, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(cfg.persistent_keepalive, 25);
        assert!(cfg.preshared_key.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_endpoint_literal_vs_hostname() {
        assert_eq!(
            Endpoint::from("198.51.100.1"),
            Endpoint::Ip("198.51.100.1".parse().unwrap())
        );
        assert_eq!(Endpoint::from("2001:db8::1").ip(), "2001:db8::1".parse().ok());
        assert_eq!(
            Endpoint::from(" vpn.example.com "),
            Endpoint::Host("vpn.example.com".into())
        );
        assert_eq!(Endpoint::from("vpn.example.com").to_string(), "vpn.example.com");
    }

    #[test]
    fn test_rejects_bad_keys() {
        let mut cfg = sample();
        cfg.private_key = String::new();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing("private_key"))));

        let mut cfg = sample();
        cfg.peer_public_key = "c2hvcnQ=".into();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "peer_public_key",
                ..
            })
        ));

        let cfg = sample().with_preshared_key("%%%");
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "preshared_key",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_bad_endpoint_and_port() {
        let mut cfg = sample();
        cfg.endpoint = Endpoint::Host(String::new());
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing("endpoint"))));

        let mut cfg = sample();
        cfg.endpoint = Endpoint::from("0.0.0.0");
        assert!(cfg.validate().is_err());

        let mut cfg = sample();
        cfg.port = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "port", .. })
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let cfg = sample().with_preshared_key(KEY_B);
        let dump = format!("{cfg:?}");
        assert!(!dump.contains(KEY_A));
        assert!(dump.contains("<redacted>"));
        assert!(dump.contains(KEY_B), "public key stays visible");
    }

    #[test]
    fn test_from_toml() {
        let doc = format!(
            "name = \"office\"\nprivate_key = \"{KEY_A}\"\naddress = \"10.6.0.3\"\n\
             endpoint = \"vpn.example.com\"\npeer_public_key = \"{KEY_B}\"\npersistent_keepalive = 0\n"
        );
        let cfg = TunnelConfig::from_toml(&doc).unwrap();
        assert_eq!(cfg.name, "office");
        assert_eq!(cfg.port, 51820);
        assert_eq!(cfg.persistent_keepalive, 0);
        assert_eq!(cfg.endpoint, Endpoint::Host("vpn.example.com".into()));
    }
}
