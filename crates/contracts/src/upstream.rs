use serde::{Deserialize, Serialize};

use crate::{BridgeError, ChannelFrame, ChannelName, ServerAddress};

/// Which record a fetch asks the upstream collaborator for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Most recent record on the channel
    #[default]
    Newest,
    /// Oldest record the client has not yet consumed; consecutive fetches
    /// walk forward through retained history
    OldestSequential,
}

/// Result of one fetch cycle.
///
/// `NoData` is an ordinary outcome, not an error: the upstream simply has
/// nothing new for this client right now.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Data(ChannelFrame),
    NoData,
}

impl FetchOutcome {
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    pub fn into_frame(self) -> Option<ChannelFrame> {
        match self {
            Self::Data(frame) => Some(frame),
            Self::NoData => None,
        }
    }
}

/// Client side of the upstream collaborator protocol.
///
/// The bridge drives the full lifecycle: `open` before the first request,
/// any number of `publish`/`fetch` calls, `close` when done. Implementations
/// report transport trouble as recoverable errors and permanent rejections
/// as [`BridgeError::FatalUpstream`].
#[trait_variant::make(UpstreamClient: Send)]
pub trait LocalUpstreamClient {
    /// Stable name for logs and metrics labels.
    fn client_name(&self) -> &str;

    /// Whether a usable connection is currently established.
    fn is_open(&self) -> bool;

    /// Establish the connection and announce this client to the server.
    async fn open(&mut self, server: &ServerAddress) -> Result<(), BridgeError>;

    /// Push one frame onto its channel.
    async fn publish(&mut self, frame: ChannelFrame) -> Result<(), BridgeError>;

    /// Request one record from `channel` according to `mode`.
    async fn fetch(
        &mut self,
        channel: &ChannelName,
        mode: FetchMode,
    ) -> Result<FetchOutcome, BridgeError>;

    /// Tear the connection down. Safe to call when already closed.
    async fn close(&mut self) -> Result<(), BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_fetch_outcome_accessors() {
        let frame = ChannelFrame::new("met/wind", 12.0, Bytes::from_static(b"3.5"));
        let outcome = FetchOutcome::Data(frame.clone());
        assert!(outcome.is_data());
        assert_eq!(outcome.into_frame(), Some(frame));

        assert!(!FetchOutcome::NoData.is_data());
        assert_eq!(FetchOutcome::NoData.into_frame(), None);
    }

    #[test]
    fn test_fetch_mode_serde_names() {
        assert_eq!(serde_json::to_string(&FetchMode::Newest).unwrap(), "\"newest\"");
        assert_eq!(
            serde_json::to_string(&FetchMode::OldestSequential).unwrap(),
            "\"oldest_sequential\""
        );
    }
}
