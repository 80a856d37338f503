//! Recipient - a dissemination destination

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::BridgeError;

/// A network destination registered to receive disseminated frames.
///
/// Identity is the normalized `host:port` string; two recipients with the
/// same identity are the same recipient. Host names are kept symbolic at
/// parse time and resolved only when a datagram is actually sent, so an
/// unresolvable host is a delivery failure rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    host: String,
    port: u16,
}

impl Recipient {
    /// Construct from already-separated parts.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, BridgeError> {
        let host = host.into();
        if host.is_empty() {
            return Err(BridgeError::recipient_parse(
                format!(":{port}"),
                "no host name specified",
            ));
        }
        if port == 0 {
            return Err(BridgeError::recipient_parse(
                &host,
                "port must be in 1..=65535",
            ));
        }
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Normalized `host:port` identity string.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve to a socket address for a datagram send.
    pub fn resolve(&self) -> Result<SocketAddr, BridgeError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| BridgeError::delivery(self.identity(), e.to_string()))?
            .next()
            .ok_or_else(|| BridgeError::delivery(self.identity(), "address did not resolve"))
    }
}

impl FromStr for Recipient {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let (host, port) = token
            .rsplit_once(':')
            .ok_or_else(|| BridgeError::recipient_parse(token, "expected host:port"))?;
        let port: u16 = port
            .parse()
            .map_err(|_| BridgeError::recipient_parse(token, "port is not an integer"))?;
        Self::new(host, port)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_token() {
        let r: Recipient = "stats.example.org:5555".parse().unwrap();
        assert_eq!(r.host(), "stats.example.org");
        assert_eq!(r.port(), 5555);
        assert_eq!(r.to_string(), "stats.example.org:5555");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let r: Recipient = "  h1:100 ".parse().unwrap();
        assert_eq!(r.identity(), "h1:100");
    }

    #[test]
    fn test_missing_colon_rejected() {
        let err = "justahost".parse::<Recipient>().unwrap_err();
        assert!(matches!(err, BridgeError::RecipientParse { .. }));
    }

    #[test]
    fn test_empty_host_rejected() {
        assert!(":5555".parse::<Recipient>().is_err());
    }

    #[test]
    fn test_bad_port_rejected() {
        assert!("h1:notaport".parse::<Recipient>().is_err());
        assert!("h1:0".parse::<Recipient>().is_err());
        assert!("h1:70000".parse::<Recipient>().is_err());
    }

    #[test]
    fn test_identity_equality() {
        let a: Recipient = "h1:100".parse().unwrap();
        let b: Recipient = " h1:100".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_loopback_resolves() {
        let r: Recipient = "127.0.0.1:5555".parse().unwrap();
        let addr = r.resolve().unwrap();
        assert_eq!(addr.port(), 5555);
    }
}
