//! PeriodicPull - request/response ingestion from the managed-channel service

use std::time::Duration;

use tracing::{debug, trace};

use contracts::{
    BridgeError, ChannelName, FetchMode, FetchOutcome, ServerAddress, UpstreamClient,
};

use crate::source::Cycle;

/// Issues one fetch per cycle against the upstream collaborator.
///
/// In newest mode the service keeps answering with the latest record whether
/// or not it changed, so a record with the same timestamp as the previous
/// cycle is suppressed as an idle cycle. Oldest-sequential walks forward and
/// never repeats.
pub struct PeriodicPull<C> {
    client: C,
    server: ServerAddress,
    channel: ChannelName,
    mode: FetchMode,
    fetch_period: Duration,
    last_timestamp: Option<f64>,
}

impl<C: UpstreamClient> PeriodicPull<C> {
    pub fn new(
        client: C,
        server: ServerAddress,
        channel: impl Into<ChannelName>,
        mode: FetchMode,
        fetch_period: Duration,
    ) -> Self {
        Self {
            client,
            server,
            channel: channel.into(),
            mode,
            fetch_period,
            last_timestamp: None,
        }
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    pub fn fetch_period(&self) -> Duration {
        self.fetch_period
    }

    pub fn is_open(&self) -> bool {
        self.client.is_open()
    }

    pub async fn open(&mut self) -> Result<(), BridgeError> {
        self.client.open(&self.server).await?;
        debug!(server = %self.server, channel = %self.channel, "pull source connected");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), BridgeError> {
        self.client.close().await
    }

    /// One fetch round trip.
    pub async fn poll_cycle(&mut self) -> Result<Cycle, BridgeError> {
        match self.client.fetch(&self.channel, self.mode).await? {
            FetchOutcome::NoData => Ok(Cycle::Idle),
            FetchOutcome::Data(frame) => {
                if self.mode == FetchMode::Newest
                    && self.last_timestamp == Some(frame.timestamp)
                {
                    trace!(timestamp = frame.timestamp, "repeat of last record suppressed");
                    return Ok(Cycle::Idle);
                }
                self.last_timestamp = Some(frame.timestamp);
                Ok(Cycle::Data(frame))
            }
        }
    }
}
