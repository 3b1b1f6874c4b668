pub mod categorize;
pub mod ceiling;
pub mod runner;
pub mod shortlist;

pub use categorize::{Categorizer, Thresholds};
pub use ceiling::TierCalibrator;
pub use runner::{CalibrationMetrics, CalibrationRunner, CalibrationSample, ReliabilityBin, TierSummary};
pub use shortlist::{dedupe, select_balanced};
