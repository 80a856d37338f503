//! Bridge run statistics.

use std::time::Duration;

use observability::BridgeStats;

/// Statistics from one bridge run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Aggregated counters for the run
    pub stats: BridgeStats,

    /// Total duration of the run
    pub duration: Duration,
}

impl RunReport {
    /// Ingested frames per second over the whole run
    pub fn frames_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.stats.frames_ingested as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print the detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Bridge Run Statistics                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Frames/s: {:.2}", self.frames_per_second());
        println!("   └─ Reconnects: {}", self.stats.reconnects);

        println!();
        print!("{}", self.stats.summary());
        println!();
    }
}
