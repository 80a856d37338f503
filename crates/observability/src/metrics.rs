//! Bridge run metrics.
//!
//! Process-wide counters and gauges go to the installed `metrics`
//! recorder; [`BridgeStats`] additionally aggregates a run in memory so
//! a summary can be printed at shutdown.

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// Records one ingested frame.
///
/// Called for every frame the source produces, before admission.
pub fn record_frame_ingested(channel: &str, bytes: usize, timestamp: f64) {
    counter!("streamcast_frames_ingested_total", "channel" => channel.to_string()).increment(1);
    histogram!("streamcast_frame_payload_bytes").record(bytes as f64);
    gauge!("streamcast_last_frame_timestamp").set(timestamp);
}

/// Records a frame that passed admission and was handed to delivery.
pub fn record_frame_admitted(channel: &str) {
    counter!("streamcast_frames_admitted_total", "channel" => channel.to_string()).increment(1);
}

/// Records a frame the bridge dropped, with the reason as a label.
///
/// Reasons in use: `filtered`, `malformed`, `not_numeric`.
pub fn record_frame_rejected(channel: &str, reason: &'static str) {
    counter!(
        "streamcast_frames_rejected_total",
        "channel" => channel.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// Records a cycle that found no data waiting.
pub fn record_idle_cycle() {
    counter!("streamcast_idle_cycles_total").increment(1);
}

/// Records a bridge state transition.
pub fn record_state_transition(state: &'static str) {
    counter!("streamcast_state_transitions_total", "state" => state).increment(1);
}

/// In-memory aggregation of one bridge run.
///
/// Updated from the run loop and rendered once at shutdown.
#[derive(Debug, Clone, Default)]
pub struct BridgeStats {
    /// Frames produced by the source
    pub frames_ingested: u64,

    /// Frames that passed admission
    pub frames_admitted: u64,

    /// Frames vetoed by a range filter
    pub frames_filtered: u64,

    /// Records dropped as malformed or non-numeric
    pub records_malformed: u64,

    /// Datagrams that reached a recipient
    pub datagrams_delivered: u64,

    /// Datagram sends that failed
    pub datagrams_failed: u64,

    /// Cycles with nothing to read
    pub idle_cycles: u64,

    /// Times the bridge re-entered CONNECTING after a fault
    pub reconnects: u64,

    /// Payload size statistics
    pub payload_bytes: RunningStats,

    /// Delivery failures per recipient
    pub recipient_failures: HashMap<String, u64>,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_ingested(&mut self, bytes: usize) {
        self.frames_ingested += 1;
        self.payload_bytes.push(bytes as f64);
    }

    pub fn frame_admitted(&mut self) {
        self.frames_admitted += 1;
    }

    pub fn frame_filtered(&mut self) {
        self.frames_filtered += 1;
    }

    pub fn record_malformed(&mut self) {
        self.records_malformed += 1;
    }

    pub fn delivery(&mut self, delivered: usize, failed: usize) {
        self.datagrams_delivered += delivered as u64;
        self.datagrams_failed += failed as u64;
    }

    pub fn recipient_failure(&mut self, identity: &str) {
        *self.recipient_failures.entry(identity.to_string()).or_insert(0) += 1;
    }

    pub fn idle(&mut self) {
        self.idle_cycles += 1;
    }

    pub fn reconnect(&mut self) {
        self.reconnects += 1;
    }

    /// Produces the shutdown summary.
    pub fn summary(&self) -> BridgeSummary {
        let sends = self.datagrams_delivered + self.datagrams_failed;
        BridgeSummary {
            frames_ingested: self.frames_ingested,
            frames_admitted: self.frames_admitted,
            frames_filtered: self.frames_filtered,
            records_malformed: self.records_malformed,
            admit_rate: if self.frames_ingested > 0 {
                self.frames_admitted as f64 / self.frames_ingested as f64 * 100.0
            } else {
                0.0
            },
            datagrams_delivered: self.datagrams_delivered,
            datagrams_failed: self.datagrams_failed,
            delivery_failure_rate: if sends > 0 {
                self.datagrams_failed as f64 / sends as f64 * 100.0
            } else {
                0.0
            },
            idle_cycles: self.idle_cycles,
            reconnects: self.reconnects,
            payload_bytes: StatsSummary::from(&self.payload_bytes),
            recipient_failures: self.recipient_failures.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Printable summary of a bridge run.
#[derive(Debug, Clone, Default)]
pub struct BridgeSummary {
    pub frames_ingested: u64,
    pub frames_admitted: u64,
    pub frames_filtered: u64,
    pub records_malformed: u64,
    pub admit_rate: f64,
    pub datagrams_delivered: u64,
    pub datagrams_failed: u64,
    pub delivery_failure_rate: f64,
    pub idle_cycles: u64,
    pub reconnects: u64,
    pub payload_bytes: StatsSummary,
    pub recipient_failures: HashMap<String, u64>,
}

impl std::fmt::Display for BridgeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bridge Summary ===")?;
        writeln!(f, "Frames ingested: {}", self.frames_ingested)?;
        writeln!(
            f,
            "Frames admitted: {} ({:.2}%)",
            self.frames_admitted, self.admit_rate
        )?;
        writeln!(f, "Frames filtered out: {}", self.frames_filtered)?;
        writeln!(f, "Malformed records dropped: {}", self.records_malformed)?;
        writeln!(
            f,
            "Datagrams delivered: {} (failures: {}, {:.2}%)",
            self.datagrams_delivered, self.datagrams_failed, self.delivery_failure_rate
        )?;
        writeln!(f, "Idle cycles: {}", self.idle_cycles)?;
        writeln!(f, "Reconnects: {}", self.reconnects)?;
        writeln!(f, "Payload bytes: {}", self.payload_bytes)?;

        if !self.recipient_failures.is_empty() {
            writeln!(f, "Failures per recipient:")?;
            for (recipient, count) in &self.recipient_failures {
                writeln!(f, "  {}: {}", recipient, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics snapshot.
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm).
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
