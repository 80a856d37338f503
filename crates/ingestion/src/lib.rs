//! # Ingestion
//!
//! Resilient data ingestion for the bridge.
//!
//! Two cadences behind one polling surface:
//! - [`TailReader`] continuously drains a growing byte stream (TCP or file)
//! - [`PeriodicPull`] issues one fetch per cycle against the
//!   managed-channel service
//!
//! [`ResilienceController`] wraps either source and turns recoverable I/O
//! failure into backoff-and-reconnect instead of letting it end the bridge.

mod pull;
mod resilience;
mod source;
mod tail;

#[cfg(test)]
pub(crate) mod test_support;

pub use pull::PeriodicPull;
pub use resilience::{CycleOutcome, ResilienceController};
pub use source::{Cycle, IngestSource};
pub use tail::{TailReader, DEFAULT_CHUNK_SIZE};
