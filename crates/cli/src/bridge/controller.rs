//! Bridge controller, the sequential ingest → filter → disseminate loop.

use std::time::{Duration, Instant};

use admission::{load_filter_file, FilterSet};
use contracts::{BridgeConfig, BridgeError, ChannelFrame, UpstreamClient};
use dissemination::{Disseminator, RecipientRegistry};
use ingestion::{CycleOutcome, IngestSource, ResilienceController};
use observability::{
    record_frame_admitted, record_frame_ingested, record_frame_rejected, record_idle_cycle,
    record_state_transition, BridgeStats,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::stats::RunReport;

/// Lifecycle states of a bridge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Init,
    Validating,
    Connecting,
    Streaming,
    Backoff,
    ShuttingDown,
    Stopped,
}

impl BridgeState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Validating => "validating",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Backoff => "backoff",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
        }
    }
}

/// How one streaming pass ended.
enum StreamEnd {
    Shutdown,
    Fault,
}

/// Owns one bridge run from validation through shutdown.
///
/// The loop is strictly sequential: one cycle ingests at most one frame,
/// runs it through admission, hands it to dissemination, then sleeps as
/// the source's pacing dictates. A shutdown request is honored at the
/// next poll boundary; a frame already being processed always finishes
/// its dissemination pass.
pub struct Bridge<C: UpstreamClient> {
    config: BridgeConfig,
    source: ResilienceController<C>,
    filters: FilterSet,
    disseminator: Option<Disseminator>,
    state: BridgeState,
    stats: BridgeStats,
}

impl<C: UpstreamClient> Bridge<C> {
    pub fn new(config: BridgeConfig, source: IngestSource<C>) -> Self {
        let backoff = config.reconnect_backoff();
        Self {
            config,
            source: ResilienceController::new(source, backoff),
            filters: FilterSet::default(),
            disseminator: None,
            state: BridgeState::Init,
            stats: BridgeStats::new(),
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Drives the bridge until shutdown is requested or a fatal error occurs.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunReport, BridgeError> {
        let started = Instant::now();
        let outcome = self.drive(&mut shutdown).await;

        self.enter(BridgeState::ShuttingDown);
        if let Err(error) = self.source.close().await {
            debug!(%error, "error while releasing the ingest handle");
        }
        if let Some(disseminator) = self.disseminator.as_mut() {
            disseminator.close();
        }
        self.enter(BridgeState::Stopped);

        outcome?;
        Ok(RunReport {
            stats: self.stats,
            duration: started.elapsed(),
        })
    }

    async fn drive(&mut self, shutdown: &mut watch::Receiver<bool>) -> Result<(), BridgeError> {
        self.enter(BridgeState::Validating);
        self.prepare()?;

        loop {
            if *shutdown.borrow_and_update() {
                return Ok(());
            }

            self.enter(BridgeState::Connecting);
            if !self.connect().await? {
                self.back_off(shutdown).await;
                continue;
            }

            self.enter(BridgeState::Streaming);
            match self.stream(shutdown).await? {
                StreamEnd::Shutdown => return Ok(()),
                StreamEnd::Fault => self.back_off(shutdown).await,
            }
        }
    }

    /// Startup validation: configuration legality, filter file, recipient set.
    fn prepare(&mut self) -> Result<(), BridgeError> {
        config_loader::ConfigLoader::validate(&self.config)?;

        self.filters = match &self.config.filter_file {
            Some(path) => {
                let mut filters = load_filter_file(path)?;
                filters.bind_fields(&self.config.field_names);
                filters
            }
            None => FilterSet::default(),
        };
        if !self.filters.is_empty() {
            info!(filters = self.filters.len(), "admission filters active");
        }

        let registry = RecipientRegistry::from_option(self.config.recipients.as_deref())?;
        info!(recipients = registry.len(), "recipient registry ready");
        self.disseminator = Some(Disseminator::new(registry));
        Ok(())
    }

    /// Returns false when the connection attempt failed recoverably.
    async fn connect(&mut self) -> Result<bool, BridgeError> {
        if let Some(disseminator) = self.disseminator.as_mut() {
            if !disseminator.is_open() {
                let port = disseminator.open(self.config.sender_port).await?;
                info!(port, "dissemination socket ready");
            }
        }
        self.source.connect().await
    }

    async fn stream(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<StreamEnd, BridgeError> {
        loop {
            if *shutdown.borrow_and_update() {
                return Ok(StreamEnd::Shutdown);
            }

            // Shutdown may interrupt the poll itself, but once a frame is
            // out of the source it runs through dissemination untouched.
            let outcome = tokio::select! {
                biased;
                _ = shutdown.changed() => return Ok(StreamEnd::Shutdown),
                outcome = self.source.cycle() => outcome?,
            };

            let had_data = match outcome {
                CycleOutcome::Data(frame) => {
                    self.process(frame).await;
                    true
                }
                CycleOutcome::Idle => {
                    record_idle_cycle();
                    self.stats.idle();
                    false
                }
                CycleOutcome::Fault => return Ok(StreamEnd::Fault),
            };

            if let Some(pause) = self.source.pace(had_data) {
                if sleep_or_shutdown(pause, shutdown).await {
                    return Ok(StreamEnd::Shutdown);
                }
            }
        }
    }

    async fn process(&mut self, frame: ChannelFrame) {
        record_frame_ingested(frame.channel.as_str(), frame.len(), frame.timestamp);
        self.stats.frame_ingested(frame.len());

        let fields = frame.fields();
        match self.filters.admit(&fields) {
            Ok(true) => {
                record_frame_admitted(frame.channel.as_str());
                self.stats.frame_admitted();
                self.disseminate(&frame).await;
            }
            Ok(false) => {
                record_frame_rejected(frame.channel.as_str(), "filtered");
                self.stats.frame_filtered();
                debug!(channel = %frame.channel, "frame vetoed by admission filters");
            }
            Err(error) => {
                let reason = match &error {
                    BridgeError::NotNumeric { .. } => "not_numeric",
                    _ => "malformed",
                };
                record_frame_rejected(frame.channel.as_str(), reason);
                self.stats.record_malformed();
                warn!(channel = %frame.channel, %error, "dropping record");
            }
        }
    }

    async fn disseminate(&mut self, frame: &ChannelFrame) {
        let Some(disseminator) = self.disseminator.as_ref() else {
            warn!("dissemination not prepared, frame dropped");
            return;
        };
        match disseminator.disseminate(frame).await {
            Ok(report) => {
                self.stats.delivery(report.delivered, report.failed_count());
                for recipient in &report.failed {
                    self.stats.recipient_failure(recipient);
                }
            }
            Err(error) => warn!(%error, "dissemination pass skipped"),
        }
    }

    async fn back_off(&mut self, shutdown: &mut watch::Receiver<bool>) {
        self.enter(BridgeState::Backoff);
        self.stats.reconnect();
        if !sleep_or_shutdown(self.source.backoff(), shutdown).await {
            debug!("backoff complete, reconnecting");
        }
    }

    fn enter(&mut self, state: BridgeState) {
        if self.state == state {
            return;
        }
        debug!(from = self.state.name(), to = state.name(), "state transition");
        record_state_transition(state.name());
        self.state = state;
    }
}

/// Sleeps for `pause`, returning true early when shutdown is requested.
async fn sleep_or_shutdown(pause: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow_and_update() {
        return true;
    }
    tokio::select! {
        biased;
        _ = shutdown.changed() => true,
        _ = tokio::time::sleep(pause) => false,
    }
}
