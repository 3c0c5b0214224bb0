mod spike_scheduler;

pub use spike_scheduler::{SpikeConfig, SpikeScheduler};
