pub mod controller;
pub mod epoch_stats;
pub mod metrics;
pub mod reporter;

pub use controller::{LoopConfig, TrainingLoop};
pub use epoch_stats::EpochStats;
pub use metrics::{count_correct, RunningMetrics};
pub use reporter::{ConsoleReporter, JsonReporter, RecordingReporter, Reporter};
