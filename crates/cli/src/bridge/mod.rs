//! Bridge orchestration module.

mod controller;
mod stats;

pub use controller::{Bridge, BridgeState};
pub use stats::RunReport;
