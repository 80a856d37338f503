//! ResilienceController - reconnect-and-backoff policy around an IngestSource

use std::time::Duration;

use metrics::counter;
use tracing::{debug, info, warn};

use contracts::{BridgeError, ChannelFrame, UpstreamClient};

use crate::source::{Cycle, IngestSource};

/// One guarded ingest cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// One assembled frame
    Data(ChannelFrame),
    /// Nothing available this cycle
    Idle,
    /// The source failed recoverably and has been closed; back off, then
    /// [`connect`](ResilienceController::connect) again
    Fault,
}

/// Centralizes failure policy at the source boundary.
///
/// Recoverable I/O trouble is logged and turned into a `Fault` outcome that
/// the caller answers with backoff and reconnect. Only a terminal upstream
/// condition escapes as an error and ends the bridge.
pub struct ResilienceController<C: UpstreamClient> {
    source: IngestSource<C>,
    backoff: Duration,
}

impl<C: UpstreamClient> ResilienceController<C> {
    pub fn new(source: IngestSource<C>, backoff: Duration) -> Self {
        Self { source, backoff }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    pub fn is_open(&self) -> bool {
        self.source.is_open()
    }

    /// Fixed interval to wait after a fault before reconnecting.
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// See [`IngestSource::pace`].
    pub fn pace(&self, had_data: bool) -> Option<Duration> {
        self.source.pace(had_data)
    }

    /// Open the source, initially or after a fault.
    ///
    /// `Ok(false)` means the attempt failed recoverably; the caller backs
    /// off and tries again. Terminal refusals propagate.
    pub async fn connect(&mut self) -> Result<bool, BridgeError> {
        match self.source.open().await {
            Ok(()) => {
                info!(source = self.source.source_name(), "ingest source connected");
                Ok(true)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(
                    source = self.source.source_name(),
                    error = %e,
                    "connect attempt failed"
                );
                counter!("streamcast_connect_failures_total").increment(1);
                Ok(false)
            }
        }
    }

    /// Run one poll cycle under the failure policy.
    pub async fn cycle(&mut self) -> Result<CycleOutcome, BridgeError> {
        match self.source.poll_cycle().await {
            Ok(Cycle::Data(frame)) => Ok(CycleOutcome::Data(frame)),
            Ok(Cycle::Idle) => Ok(CycleOutcome::Idle),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(
                    source = self.source.source_name(),
                    error = %e,
                    "ingest cycle failed, source will be reopened"
                );
                counter!("streamcast_ingest_faults_total").increment(1);
                if let Err(close_err) = self.source.close().await {
                    debug!(error = %close_err, "closing the faulted source also failed");
                }
                Ok(CycleOutcome::Fault)
            }
        }
    }

    /// Release the source during shutdown.
    pub async fn close(&mut self) -> Result<(), BridgeError> {
        self.source.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedClient;
    use crate::PeriodicPull;
    use bytes::Bytes;
    use contracts::{FetchMode, FetchOutcome, ServerAddress};

    fn controller(client: ScriptedClient) -> ResilienceController<ScriptedClient> {
        let source = IngestSource::Pull(PeriodicPull::new(
            client,
            ServerAddress::default(),
            "met/wind",
            FetchMode::Newest,
            Duration::from_millis(0),
        ));
        ResilienceController::new(source, Duration::from_millis(500))
    }

    fn data(timestamp: f64) -> Result<FetchOutcome, BridgeError> {
        Ok(FetchOutcome::Data(contracts::ChannelFrame::new(
            "met/wind",
            timestamp,
            Bytes::from_static(b"3.5"),
        )))
    }

    #[tokio::test]
    async fn test_fault_then_reconnect_then_data() {
        let mut client = ScriptedClient::new("pull");
        client.enqueue(Err(BridgeError::ingest_io("connection reset")));
        client.enqueue(data(1.0));
        let mut controller = controller(client);

        assert!(controller.connect().await.unwrap());
        assert!(matches!(
            controller.cycle().await.unwrap(),
            CycleOutcome::Fault
        ));
        // The faulted source was closed; reconnect restores service
        assert!(!controller.is_open());
        assert!(controller.connect().await.unwrap());
        assert!(matches!(
            controller.cycle().await.unwrap(),
            CycleOutcome::Data(_)
        ));
    }

    #[tokio::test]
    async fn test_terminal_upstream_error_propagates() {
        let mut client = ScriptedClient::new("pull");
        client.enqueue(Err(BridgeError::fatal_upstream("service retired")));
        let mut controller = controller(client);

        controller.connect().await.unwrap();
        let err = controller.cycle().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_recoverable_connect_failure_reports_false() {
        let mut client = ScriptedClient::new("pull");
        client.enqueue_open_error(BridgeError::upstream_connection(
            "localhost:3333",
            "connection refused",
        ));
        let mut controller = controller(client);

        assert!(!controller.connect().await.unwrap());
        assert!(controller.connect().await.unwrap());
    }

    #[tokio::test]
    async fn test_terminal_connect_failure_propagates() {
        let mut client = ScriptedClient::new("pull");
        client.enqueue_open_error(BridgeError::fatal_upstream("client banned"));
        let mut controller = controller(client);

        assert!(controller.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_idle_cycles_pass_through() {
        let client = ScriptedClient::new("pull");
        let mut controller = controller(client);
        controller.connect().await.unwrap();
        assert!(matches!(
            controller.cycle().await.unwrap(),
            CycleOutcome::Idle
        ));
    }
}
