mod aggregator;
mod batcher;
mod runner;
mod worker;

pub use runner::{DEFAULT_FLUSH_INTERVAL, Engine, EngineConfig};
