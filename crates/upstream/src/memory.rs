//! In-process managed-channel hub.
//!
//! Backs [`UpstreamServer`](crate::UpstreamServer) and, through
//! [`MemoryUpstreamClient`], lets a bridge run against an upstream service
//! without any network at all.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use contracts::{
    BridgeError, ChannelFrame, ChannelName, FetchMode, FetchOutcome, ServerAddress,
    UpstreamClient,
};

/// Frames retained per channel before the oldest are evicted.
pub const DEFAULT_RETAINED: usize = 256;

#[derive(Debug)]
struct Retained {
    seq: u64,
    frame: ChannelFrame,
}

#[derive(Debug, Default)]
struct Channel {
    next_seq: u64,
    frames: VecDeque<Retained>,
}

#[derive(Debug, Default)]
struct HubState {
    channels: HashMap<ChannelName, Channel>,
    /// Next sequence each (client, channel) pair will consume in
    /// oldest-sequential mode
    cursors: HashMap<(String, ChannelName), u64>,
    terminated: Option<String>,
}

/// Shared in-memory channel store with bounded per-channel history.
///
/// Clones share state. `terminate` flips the hub into a state where every
/// further operation is refused as terminal, which is how tests exercise the
/// fatal-upstream path.
#[derive(Debug, Clone)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
    capacity: usize,
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new(DEFAULT_RETAINED)
    }
}

impl MemoryHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            capacity: capacity.max(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_alive(state: &HubState) -> Result<(), BridgeError> {
        match &state.terminated {
            Some(message) => Err(BridgeError::fatal_upstream(message.clone())),
            None => Ok(()),
        }
    }

    /// Append one frame to its channel, evicting the oldest beyond capacity.
    pub fn publish(&self, frame: ChannelFrame) -> Result<(), BridgeError> {
        let mut state = self.state();
        Self::check_alive(&state)?;
        let capacity = self.capacity;
        let channel = state.channels.entry(frame.channel.clone()).or_default();
        let seq = channel.next_seq;
        channel.next_seq += 1;
        channel.frames.push_back(Retained { seq, frame });
        while channel.frames.len() > capacity {
            channel.frames.pop_front();
        }
        Ok(())
    }

    /// Serve one fetch for `client`.
    pub fn fetch(
        &self,
        client: &str,
        channel: &ChannelName,
        mode: FetchMode,
    ) -> Result<FetchOutcome, BridgeError> {
        let mut state = self.state();
        Self::check_alive(&state)?;
        match mode {
            FetchMode::Newest => Ok(state
                .channels
                .get(channel)
                .and_then(|chan| chan.frames.back())
                .map(|r| FetchOutcome::Data(r.frame.clone()))
                .unwrap_or(FetchOutcome::NoData)),
            FetchMode::OldestSequential => {
                let key = (client.to_string(), channel.clone());
                let cursor = state.cursors.get(&key).copied().unwrap_or(0);
                let next = state
                    .channels
                    .get(channel)
                    .and_then(|chan| chan.frames.iter().find(|r| r.seq >= cursor))
                    .map(|r| (r.seq, r.frame.clone()));
                match next {
                    Some((seq, frame)) => {
                        state.cursors.insert(key, seq + 1);
                        Ok(FetchOutcome::Data(frame))
                    }
                    None => Ok(FetchOutcome::NoData),
                }
            }
        }
    }

    /// Refuse all further service; every subsequent operation fails as
    /// terminal.
    pub fn terminate(&self, message: impl Into<String>) {
        self.state().terminated = Some(message.into());
    }

    pub fn is_terminated(&self) -> bool {
        self.termination().is_some()
    }

    /// The terminal message, if service has been withdrawn.
    pub fn termination(&self) -> Option<String> {
        self.state().terminated.clone()
    }

    /// Retained frame count for `channel`.
    pub fn frame_count(&self, channel: &ChannelName) -> usize {
        self.state()
            .channels
            .get(channel)
            .map(|c| c.frames.len())
            .unwrap_or(0)
    }
}

/// [`UpstreamClient`] served directly by a [`MemoryHub`].
pub struct MemoryUpstreamClient {
    name: String,
    hub: MemoryHub,
    open: bool,
}

impl MemoryUpstreamClient {
    pub fn new(name: impl Into<String>, hub: MemoryHub) -> Self {
        Self {
            name: name.into(),
            hub,
            open: false,
        }
    }

    fn ensure_open(&self) -> Result<(), BridgeError> {
        if self.open {
            Ok(())
        } else {
            Err(BridgeError::ingest_io("client is not connected"))
        }
    }
}

impl UpstreamClient for MemoryUpstreamClient {
    fn client_name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self, server: &ServerAddress) -> Result<(), BridgeError> {
        MemoryHub::check_alive(&self.hub.state())?;
        self.open = true;
        debug!(client = %self.name, server = %server, "memory client opened");
        Ok(())
    }

    async fn publish(&mut self, frame: ChannelFrame) -> Result<(), BridgeError> {
        self.ensure_open()?;
        self.hub.publish(frame)
    }

    async fn fetch(
        &mut self,
        channel: &ChannelName,
        mode: FetchMode,
    ) -> Result<FetchOutcome, BridgeError> {
        self.ensure_open()?;
        self.hub.fetch(&self.name, channel, mode)
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.open = false;
        Ok(())
    }
}
