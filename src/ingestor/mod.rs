pub mod aggregator;
pub mod scheduler;

pub use aggregator::{AggregationResult, Aggregator};
pub use scheduler::{RefreshScheduler, SchedulerEvent, SchedulerHandle};
