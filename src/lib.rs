//! Concurrent HTTP burst engine.
//!
//! An [`Engine`] fires a fixed number of simultaneous requests at one target,
//! records each request's outcome and keeps running metrics while the burst
//! is in flight. Callers issue `start`/`stop` and observe `logs`, `metrics`
//! and the run state.

pub mod engine;
pub mod error;
pub mod http;
pub mod types;

pub use engine::{Engine, EngineConfig};
pub use error::StartError;
pub use types::{
    ErrorKind, HttpMethod, MAX_CONCURRENCY, Metrics, RequestId, RequestLog, RequestOutcome,
    RequestStatus, RunState,
};
