//! # Gateway configuration.
//!
//! [`GatewayConfig`] is the owned, immutable value a [`Gateway`](super::Gateway)
//! runs with. Construction does no semantic validation: addresses and the network
//! name are checked by the gateway when it starts.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TaskError;

/// Transport used to reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// TCP over IPv4 or IPv6.
    Tcp,
    /// TCP, IPv4 addresses only.
    Tcp4,
    /// TCP, IPv6 addresses only.
    Tcp6,
    /// Unix domain socket; the address is a filesystem path.
    Unix,
}

impl FromStr for Network {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Network::Tcp),
            "tcp4" => Ok(Network::Tcp4),
            "tcp6" => Ok(Network::Tcp6),
            "unix" => Ok(Network::Unix),
            other => Err(TaskError::Fatal {
                error: format!("unsupported network {other:?}"),
            }),
        }
    }
}

/// Backend endpoint descriptor: `{network, address}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Network name as supplied by the caller (`tcp`, `tcp4`, `tcp6`, `unix`).
    pub network: String,
    /// Address in the form the network expects (`host:port` or a socket path).
    pub addr: String,
}

impl Endpoint {
    /// Creates an endpoint descriptor.
    pub fn new(network: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            addr: addr.into(),
        }
    }

    /// Parses the network name.
    ///
    /// # Errors
    /// [`TaskError::Fatal`] for an unknown network name.
    pub fn network(&self) -> Result<Network, TaskError> {
        self.network.parse()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.network, self.addr)
    }
}

/// Configuration of one gateway instance.
///
/// ## Field semantics
/// - `bind_addr`: listen address; a bare `:port` listens on all interfaces
/// - `endpoint`: backend to proxy to
/// - `assets_dir`: directory holding `*.swagger.json` files
/// - `dial_timeout`: bound on the startup dial to the backend
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the gateway listens on.
    pub bind_addr: String,
    /// Backend endpoint.
    pub endpoint: Endpoint,
    /// Static assets directory.
    pub assets_dir: PathBuf,
    /// Maximum time to wait for the backend during startup.
    pub dial_timeout: Duration,
}

impl GatewayConfig {
    /// Default bound on the startup dial.
    pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a configuration with the default dial timeout.
    pub fn new(
        bind_addr: impl Into<String>,
        endpoint: Endpoint,
        assets_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            endpoint,
            assets_dir: assets_dir.into(),
            dial_timeout: Self::DEFAULT_DIAL_TIMEOUT,
        }
    }

    /// Returns a new config with an updated dial timeout.
    pub fn with_dial_timeout(mut self, dial_timeout: Duration) -> Self {
        self.dial_timeout = dial_timeout;
        self
    }

    /// Returns the listen address, expanding a bare `:port` to all interfaces.
    pub fn listen_addr(&self) -> String {
        if self.bind_addr.starts_with(':') {
            format!("0.0.0.0{}", self.bind_addr)
        } else {
            self.bind_addr.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_names() {
        assert_eq!("tcp".parse::<Network>().unwrap(), Network::Tcp);
        assert_eq!("tcp4".parse::<Network>().unwrap(), Network::Tcp4);
        assert_eq!("tcp6".parse::<Network>().unwrap(), Network::Tcp6);
        assert_eq!("unix".parse::<Network>().unwrap(), Network::Unix);

        let err = "udp".parse::<Network>().unwrap_err();
        assert_eq!(err.as_label(), "task_fatal");
        assert!(err.to_string().contains("udp"));
    }

    #[test]
    fn test_listen_addr_expands_bare_port() {
        let cfg = GatewayConfig::new(":8080", Endpoint::new("tcp", "127.0.0.1:9090"), "/tmp");
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");

        let cfg = GatewayConfig::new("127.0.0.1:8080", cfg.endpoint.clone(), "/tmp");
        assert_eq!(cfg.listen_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_defaults() {
        let cfg = GatewayConfig::new("127.0.0.1:0", Endpoint::new("tcp", "127.0.0.1:1"), "assets");
        assert_eq!(cfg.dial_timeout, GatewayConfig::DEFAULT_DIAL_TIMEOUT);
        assert_eq!(cfg.endpoint.to_string(), "tcp://127.0.0.1:1");
        let cfg = cfg.with_dial_timeout(Duration::from_millis(250));
        assert_eq!(cfg.dial_timeout, Duration::from_millis(250));
    }
}
