//! Episode statistics and the periodic status snapshot handed to the UI.

pub mod status;
pub mod tracker;

pub use status::{StatusReport, StatusTicker};
pub use tracker::{EpisodeStats, MetricsTracker, TrainingMetrics};
