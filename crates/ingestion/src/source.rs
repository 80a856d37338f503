//! IngestSource - one capability, two cadences

use std::time::Duration;

use contracts::{BridgeError, ChannelFrame, UpstreamClient};

use crate::pull::PeriodicPull;
use crate::tail::TailReader;

/// What one ingest cycle produced.
///
/// `Idle` is an ordinary outcome; callers must never treat it as a failure.
#[derive(Debug)]
pub enum Cycle {
    /// One assembled frame, ready for admission and dissemination
    Data(ChannelFrame),
    /// Nothing available this cycle
    Idle,
}

impl Cycle {
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }
}

/// The two ingestion cadences behind one polling surface.
///
/// Both variants produce one [`Cycle`] per poll and share the same open,
/// close, and pacing contract.
pub enum IngestSource<C: UpstreamClient> {
    /// Continuous tailing of a growing byte stream
    Tail(TailReader),
    /// Periodic request/response pulls from the managed-channel service
    Pull(PeriodicPull<C>),
}

impl<C: UpstreamClient> IngestSource<C> {
    pub fn source_name(&self) -> &'static str {
        match self {
            Self::Tail(_) => "tail",
            Self::Pull(_) => "pull",
        }
    }

    pub fn is_open(&self) -> bool {
        match self {
            Self::Tail(tail) => tail.is_open(),
            Self::Pull(pull) => pull.is_open(),
        }
    }

    pub async fn open(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Tail(tail) => tail.open().await,
            Self::Pull(pull) => pull.open().await,
        }
    }

    pub async fn close(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Tail(tail) => tail.close().await,
            Self::Pull(pull) => pull.close().await,
        }
    }

    /// Produce one cycle's data or signal an idle cycle.
    pub async fn poll_cycle(&mut self) -> Result<Cycle, BridgeError> {
        match self {
            Self::Tail(tail) => tail.poll_cycle().await,
            Self::Pull(pull) => pull.poll_cycle().await,
        }
    }

    /// How long the loop should sleep before the next poll, if at all.
    ///
    /// Tailing loops again immediately after data to keep push latency low
    /// and idles briefly after an empty cycle. Pulling sleeps its fetch
    /// period either way; a zero period polls as fast as the collaborator
    /// allows.
    pub fn pace(&self, had_data: bool) -> Option<Duration> {
        match self {
            Self::Tail(tail) => (!had_data).then(|| tail.idle_interval()),
            Self::Pull(pull) => {
                let period = pull.fetch_period();
                (!period.is_zero()).then_some(period)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedClient;
    use contracts::{FetchMode, ServerAddress, TailEndpoint};

    fn tail_source(idle_ms: u64) -> IngestSource<ScriptedClient> {
        IngestSource::Tail(TailReader::new(
            "met/wind",
            TailEndpoint::File {
                path: "/tmp/stream.dat".into(),
            },
            false,
            Duration::from_millis(idle_ms),
        ))
    }

    fn pull_source(period_ms: u64) -> IngestSource<ScriptedClient> {
        IngestSource::Pull(PeriodicPull::new(
            ScriptedClient::new("pull"),
            ServerAddress::default(),
            "met/wind",
            FetchMode::Newest,
            Duration::from_millis(period_ms),
        ))
    }

    #[test]
    fn test_tail_pacing() {
        let source = tail_source(100);
        // Data: loop again immediately
        assert_eq!(source.pace(true), None);
        // Idle: wait out the idle interval
        assert_eq!(source.pace(false), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_pull_pacing() {
        let source = pull_source(250);
        assert_eq!(source.pace(true), Some(Duration::from_millis(250)));
        assert_eq!(source.pace(false), Some(Duration::from_millis(250)));

        let eager = pull_source(0);
        assert_eq!(eager.pace(true), None);
        assert_eq!(eager.pace(false), None);
    }

    #[test]
    fn test_source_names() {
        assert_eq!(tail_source(100).source_name(), "tail");
        assert_eq!(pull_source(0).source_name(), "pull");
    }
}
