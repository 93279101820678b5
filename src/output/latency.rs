use hdrhistogram::Histogram;
use serde::Serialize;
use stressburst::{RequestLog, RequestStatus};

/// Upper bound of the histogram: one hour in microseconds.
const MAX_LATENCY_US: u64 = 3_600_000_000;

/// Latency distribution of the successful requests of a finished run, in
/// microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
}

impl LatencySummary {
    /// Returns `None` when no request succeeded.
    pub fn from_logs(logs: &[RequestLog]) -> Option<Self> {
        let mut histogram = Histogram::<u64>::new_with_bounds(1, MAX_LATENCY_US, 3).ok()?;

        for duration in logs
            .iter()
            .filter(|log| log.status == RequestStatus::Success)
            .filter_map(|log| log.duration)
        {
            let micros = u64::try_from(duration.as_micros()).unwrap_or(MAX_LATENCY_US);
            let _ = histogram.record(micros.clamp(1, MAX_LATENCY_US));
        }

        if histogram.len() == 0 {
            return None;
        }

        Some(Self {
            min: histogram.min(),
            max: histogram.max(),
            mean: histogram.mean(),
            p50: histogram.value_at_percentile(50.0),
            p90: histogram.value_at_percentile(90.0),
            p95: histogram.value_at_percentile(95.0),
            p99: histogram.value_at_percentile(99.0),
        })
    }
}
