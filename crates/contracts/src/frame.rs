//! ChannelFrame - the unit of filtering and dissemination

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ChannelName;

/// One ingested record of channel data.
///
/// A frame is produced once per ingest cycle and consumed (filtered and
/// disseminated) before the next cycle begins; at most one frame is in
/// flight and nothing downstream retains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFrame {
    /// Source channel
    pub channel: ChannelName,

    /// Record time, seconds since the Unix epoch
    pub timestamp: f64,

    /// Raw payload bytes, sent verbatim as one datagram per recipient
    pub payload: Bytes,
}

impl ChannelFrame {
    /// Create a frame with an explicit timestamp.
    pub fn new(channel: impl Into<ChannelName>, timestamp: f64, payload: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            timestamp,
            payload: payload.into(),
        }
    }

    /// Create a frame stamped with the current wall clock, for tailed data
    /// that carries no timestamp of its own.
    pub fn stamped_now(channel: impl Into<ChannelName>, payload: impl Into<Bytes>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self::new(channel, timestamp, payload)
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True when the payload holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// String-encoded field list used by admission filters.
    ///
    /// The payload is decoded as UTF-8 (lossily) and split on commas, with
    /// each field trimmed. An empty payload yields an empty list, which
    /// admission checks reject as malformed.
    pub fn fields(&self) -> Vec<String> {
        if self.payload.is_empty() {
            return Vec::new();
        }
        String::from_utf8_lossy(&self.payload)
            .split(',')
            .map(|field| field.trim().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_split_and_trim() {
        let frame = ChannelFrame::new("met", 10.0, "12.5, 7 ,hello");
        assert_eq!(frame.fields(), vec!["12.5", "7", "hello"]);
    }

    #[test]
    fn test_fields_of_empty_payload() {
        let frame = ChannelFrame::new("met", 10.0, Bytes::new());
        assert!(frame.fields().is_empty());
        assert!(frame.is_empty());
    }

    #[test]
    fn test_single_field_record() {
        let frame = ChannelFrame::new("met", 10.0, "42");
        assert_eq!(frame.fields(), vec!["42"]);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_stamped_now_is_recent() {
        let frame = ChannelFrame::stamped_now("met", "x");
        assert!(frame.timestamp > 0.0);
    }
}
