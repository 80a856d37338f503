//! Scripted upstream client for unit tests.

use std::collections::VecDeque;

use contracts::{
    BridgeError, ChannelFrame, ChannelName, FetchMode, FetchOutcome, ServerAddress,
    UpstreamClient,
};

/// Plays back queued fetch outcomes and open failures in order.
///
/// An exhausted fetch queue keeps answering `NoData`.
pub(crate) struct ScriptedClient {
    name: String,
    open: bool,
    fetches: VecDeque<Result<FetchOutcome, BridgeError>>,
    open_errors: VecDeque<BridgeError>,
}

impl ScriptedClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            open: false,
            fetches: VecDeque::new(),
            open_errors: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, outcome: Result<FetchOutcome, BridgeError>) {
        self.fetches.push_back(outcome);
    }

    pub fn enqueue_open_error(&mut self, error: BridgeError) {
        self.open_errors.push_back(error);
    }
}

impl UpstreamClient for ScriptedClient {
    fn client_name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self, _server: &ServerAddress) -> Result<(), BridgeError> {
        if let Some(error) = self.open_errors.pop_front() {
            return Err(error);
        }
        self.open = true;
        Ok(())
    }

    async fn publish(&mut self, _frame: ChannelFrame) -> Result<(), BridgeError> {
        if !self.open {
            return Err(BridgeError::ingest_io("client is not connected"));
        }
        Ok(())
    }

    async fn fetch(
        &mut self,
        _channel: &ChannelName,
        _mode: FetchMode,
    ) -> Result<FetchOutcome, BridgeError> {
        if !self.open {
            return Err(BridgeError::ingest_io("client is not connected"));
        }
        self.fetches.pop_front().unwrap_or(Ok(FetchOutcome::NoData))
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.open = false;
        Ok(())
    }
}
