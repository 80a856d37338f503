//! The set of recipients a bridge delivers to.

use contracts::{BridgeError, Recipient};
use tracing::{info, warn};

/// Host used when no recipient list is configured.
pub const DEFAULT_RECIPIENT_HOST: &str = "localhost";

/// Port used when no recipient list is configured.
pub const DEFAULT_RECIPIENT_PORT: u16 = 5555;

/// An ordered, duplicate-free set of delivery targets.
///
/// The registry is built once at startup and read on every delivery
/// cycle. Construction distinguishes between an absent recipient list
/// (fall back to the built-in default) and a present-but-unusable one
/// (refuse to start).
#[derive(Debug, Clone, Default)]
pub struct RecipientRegistry {
    recipients: Vec<Recipient>,
}

impl RecipientRegistry {
    /// Builds a registry from the optional comma-separated recipient list.
    ///
    /// When the list is absent the registry contains exactly the default
    /// recipient. When the list is present, tokens that fail to parse are
    /// dropped with a warning, and a list that yields no valid recipient
    /// at all is a configuration error. The default is never mixed into
    /// an explicitly configured list.
    pub fn from_option(list: Option<&str>) -> Result<Self, BridgeError> {
        match list {
            Some(list) => {
                let registry = Self::parse_list(list);
                if registry.is_empty() {
                    return Err(BridgeError::config_validation(
                        "recipients",
                        "the recipient list must contain at least one valid host:port address",
                    ));
                }
                Ok(registry)
            }
            None => {
                let mut registry = Self::default();
                registry.add(Recipient::new(DEFAULT_RECIPIENT_HOST, DEFAULT_RECIPIENT_PORT)?);
                info!(
                    recipient = %format_args!("{DEFAULT_RECIPIENT_HOST}:{DEFAULT_RECIPIENT_PORT}"),
                    "no recipients configured, using the built-in default"
                );
                Ok(registry)
            }
        }
    }

    /// Parses a comma-separated recipient list, dropping bad tokens.
    pub fn parse_list(list: &str) -> Self {
        let mut registry = Self::default();
        for token in list.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.parse::<Recipient>() {
                Ok(recipient) => {
                    registry.add(recipient);
                }
                Err(error) => {
                    warn!(token, %error, "skipping unparseable recipient");
                }
            }
        }
        registry
    }

    /// Adds a recipient, returning false when an equal one is already present.
    pub fn add(&mut self, recipient: Recipient) -> bool {
        if self
            .recipients
            .iter()
            .any(|existing| existing.identity() == recipient.identity())
        {
            return false;
        }
        self.recipients.push(recipient);
        true
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}
