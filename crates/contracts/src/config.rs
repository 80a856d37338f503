//! BridgeConfig - the full startup configuration surface
//!
//! Assembled once (file + flag overrides), validated, then immutable for the
//! life of the process.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::BridgeError;

/// Default port of the upstream collaborator.
pub const DEFAULT_SERVER_PORT: u16 = 3333;

/// Upstream server address, written as `host[:port]`.
///
/// A bare `host` is normalized with [`DEFAULT_SERVER_PORT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_SERVER_PORT)
    }
}

impl FromStr for ServerAddress {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BridgeError::config_validation(
                "server",
                "server address is empty",
            ));
        }
        match s.rsplit_once(':') {
            Some((host, port)) => {
                if host.is_empty() {
                    return Err(BridgeError::config_validation(
                        "server",
                        "server address has no host",
                    ));
                }
                let port: u16 = port.parse().map_err(|_| {
                    BridgeError::config_validation(
                        "server",
                        format!("'{port}' is not a valid port"),
                    )
                })?;
                Ok(Self::new(host, port))
            }
            // Bare host: fill in the collaborator's well-known port
            None => Ok(Self::new(s, DEFAULT_SERVER_PORT)),
        }
    }
}

impl TryFrom<String> for ServerAddress {
    type Error = BridgeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ServerAddress> for String {
    fn from(addr: ServerAddress) -> Self {
        addr.to_string()
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The byte stream tailed in continuous mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TailEndpoint {
    /// TCP byte stream at `addr` (`host:port`)
    Tcp { addr: String },
    /// Growing local file
    File { path: PathBuf },
}

impl FromStr for TailEndpoint {
    type Err = BridgeError;

    /// Parse the CLI form `tcp:host:port` or `file:/path/to/log`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s.split_once(':').ok_or_else(|| {
            BridgeError::config_validation("tail", "expected tcp:host:port or file:path")
        })?;
        match scheme {
            "tcp" if !rest.is_empty() => Ok(Self::Tcp {
                addr: rest.to_string(),
            }),
            "file" if !rest.is_empty() => Ok(Self::File {
                path: PathBuf::from(rest),
            }),
            _ => Err(BridgeError::config_validation(
                "tail",
                format!("unknown tail endpoint '{s}'"),
            )),
        }
    }
}

impl fmt::Display for TailEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { addr } => write!(f, "tcp:{addr}"),
            Self::File { path } => write!(f, "file:{}", path.display()),
        }
    }
}

/// Ingestion strategy selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestMode {
    /// Periodic request/response pulls from the upstream collaborator
    #[default]
    Pull,
    /// Continuous tailing of a growing byte stream
    Tail { endpoint: TailEndpoint },
}

impl IngestMode {
    pub fn is_tail(&self) -> bool {
        matches!(self, Self::Tail { .. })
    }
}

/// Immutable bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Upstream collaborator address
    #[serde(default)]
    pub server: ServerAddress,

    /// Channel to ingest; always required
    pub channel: String,

    /// First port tried for the outbound datagram socket; the bind walks
    /// upward from here when the port is taken
    #[serde(default = "default_sender_port")]
    pub sender_port: u16,

    /// Comma-delimited `host:port` recipient list. Absent selects the
    /// built-in default recipient; present-but-unusable is fatal.
    #[serde(default)]
    pub recipients: Option<String>,

    /// Sleep between pull requests in milliseconds; zero polls as fast as
    /// possible
    #[serde(default)]
    pub fetch_period_ms: u64,

    /// Start continuous ingestion at the oldest available data instead of
    /// joining at the newest
    #[serde(default)]
    pub stream_from_oldest: bool,

    /// Skip the interactive start confirmation
    #[serde(default)]
    pub autostart: bool,

    /// Run with no interactive UI; requires autostart and a complete
    /// configuration
    #[serde(default)]
    pub headless: bool,

    /// Admission filter definition file (one `name min max` per line)
    #[serde(default)]
    pub filter_file: Option<PathBuf>,

    /// Field-name schema for binding filters to record positions
    #[serde(default)]
    pub field_names: Vec<String>,

    /// Backoff after an ingestion I/O failure, milliseconds
    #[serde(default = "default_reconnect_backoff_ms")]
    pub reconnect_backoff_ms: u64,

    /// Idle sleep after a zero-byte tail cycle, milliseconds
    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Ingestion strategy
    #[serde(default)]
    pub mode: IngestMode,
}

fn default_sender_port() -> u16 {
    3456
}

fn default_reconnect_backoff_ms() -> u64 {
    500
}

fn default_idle_interval_ms() -> u64 {
    100
}

impl BridgeConfig {
    /// Configuration for `channel` with every other option at its default.
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            server: ServerAddress::default(),
            channel: channel.into(),
            sender_port: default_sender_port(),
            recipients: None,
            fetch_period_ms: 0,
            stream_from_oldest: false,
            autostart: false,
            headless: false,
            filter_file: None,
            field_names: Vec::new(),
            reconnect_backoff_ms: default_reconnect_backoff_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            mode: IngestMode::default(),
        }
    }

    pub fn fetch_period(&self) -> Duration {
        Duration::from_millis(self.fetch_period_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_address_with_port() {
        let addr: ServerAddress = "turbine.example.org:4444".parse().unwrap();
        assert_eq!(addr.host, "turbine.example.org");
        assert_eq!(addr.port, 4444);
    }

    #[test]
    fn test_bare_host_gets_default_port() {
        let addr: ServerAddress = "turbine.example.org".parse().unwrap();
        assert_eq!(addr.port, DEFAULT_SERVER_PORT);
        assert_eq!(addr.to_string(), "turbine.example.org:3333");
    }

    #[test]
    fn test_empty_server_address_rejected() {
        assert!("".parse::<ServerAddress>().is_err());
        assert!(":3333".parse::<ServerAddress>().is_err());
    }

    #[test]
    fn test_tail_endpoint_forms() {
        let tcp: TailEndpoint = "tcp:localhost:6000".parse().unwrap();
        assert_eq!(
            tcp,
            TailEndpoint::Tcp {
                addr: "localhost:6000".into()
            }
        );
        let file: TailEndpoint = "file:/var/log/stream.dat".parse().unwrap();
        assert!(matches!(file, TailEndpoint::File { .. }));
        assert!("ftp:somewhere".parse::<TailEndpoint>().is_err());
        assert!("tcp:".parse::<TailEndpoint>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::new("met/wind");
        assert_eq!(config.server.to_string(), "localhost:3333");
        assert_eq!(config.sender_port, 3456);
        assert_eq!(config.fetch_period_ms, 0);
        assert!(!config.stream_from_oldest);
        assert!(!config.autostart);
        assert!(!config.headless);
        assert!(config.recipients.is_none());
        assert_eq!(config.mode, IngestMode::Pull);
        assert_eq!(config.reconnect_backoff(), Duration::from_millis(500));
        assert_eq!(config.idle_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_config_serde_round_trip() {
        let mut config = BridgeConfig::new("met/wind");
        config.mode = IngestMode::Tail {
            endpoint: TailEndpoint::Tcp {
                addr: "localhost:6000".into(),
            },
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: BridgeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.channel, "met/wind");
        assert_eq!(parsed.mode, config.mode);
        assert_eq!(parsed.server, config.server);
    }

    #[test]
    fn test_channel_is_required_in_serde() {
        let result = serde_json::from_str::<BridgeConfig>("{}");
        assert!(result.is_err());
    }
}
