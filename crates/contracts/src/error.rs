//! Layered error definitions
//!
//! Categorized by recoverability: configuration failures are fatal before
//! any connection attempt, per-token/per-record/per-recipient failures are
//! contained at their origin, and only a terminal upstream condition may
//! stop a running bridge.

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum BridgeError {
    // ===== Configuration Errors (fatal at startup) =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Admission filter construction error
    #[error("invalid filter '{channel}': {message}")]
    InvalidFilter { channel: String, message: String },

    // ===== Per-token / per-record / per-recipient Errors (recoverable) =====
    /// Recipient token could not be parsed; the token is dropped
    #[error("bad recipient '{token}': {message}")]
    RecipientParse { token: String, message: String },

    /// Record is structurally unusable for admission checks
    #[error("malformed record: {message}")]
    MalformedRecord { message: String },

    /// Designated field is present but not a number; distinct from a
    /// filter returning `false`
    #[error("channel '{channel}': value '{value}' is not numeric")]
    NotNumeric { channel: String, value: String },

    /// Datagram delivery to one recipient failed; other recipients are
    /// unaffected
    #[error("delivery to {recipient} failed: {message}")]
    Delivery { recipient: String, message: String },

    // ===== Upstream / Ingestion Errors =====
    /// Could not reach or handshake with the upstream server
    #[error("upstream connection to {address} failed: {message}")]
    UpstreamConnection { address: String, message: String },

    /// Recoverable ingestion I/O failure; triggers reconnect with backoff
    #[error("ingest i/o error: {message}")]
    IngestIo { message: String },

    /// Terminal upstream condition; ends the bridge
    #[error("fatal upstream error: {message}")]
    FatalUpstream { message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    /// Create a configuration parse error without an underlying source
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a filter construction error
    pub fn invalid_filter(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create a recipient parse error
    pub fn recipient_parse(token: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecipientParse {
            token: token.into(),
            message: message.into(),
        }
    }

    /// Create a malformed record error
    pub fn malformed_record(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }

    /// Create a non-numeric field error
    pub fn not_numeric(channel: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NotNumeric {
            channel: channel.into(),
            value: value.into(),
        }
    }

    /// Create a per-recipient delivery error
    pub fn delivery(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            recipient: recipient.into(),
            message: message.into(),
        }
    }

    /// Create an upstream connection error
    pub fn upstream_connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamConnection {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create a recoverable ingestion I/O error
    pub fn ingest_io(message: impl Into<String>) -> Self {
        Self::IngestIo {
            message: message.into(),
        }
    }

    /// Create a terminal upstream error
    pub fn fatal_upstream(message: impl Into<String>) -> Self {
        Self::FatalUpstream {
            message: message.into(),
        }
    }

    /// True for conditions that must stop the bridge rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::InvalidFilter { .. }
                | Self::FatalUpstream { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(BridgeError::config_validation("headless", "requires autostart").is_fatal());
        assert!(BridgeError::fatal_upstream("channel closed").is_fatal());
        assert!(!BridgeError::ingest_io("read reset").is_fatal());
        assert!(!BridgeError::delivery("h1:100", "unreachable").is_fatal());
        assert!(!BridgeError::not_numeric("temp", "abc").is_fatal());
    }

    #[test]
    fn test_display_names_offender() {
        let err = BridgeError::recipient_parse("bad", "expected host:port");
        assert!(err.to_string().contains("bad"));
        let err = BridgeError::not_numeric("pressure", "n/a");
        assert!(err.to_string().contains("pressure"));
        assert!(err.to_string().contains("n/a"));
    }
}
