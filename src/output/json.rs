use crate::config::LoadConfig;
use crate::output::LatencySummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use stressburst::{Metrics, RequestLog, RunState};

#[derive(Serialize)]
pub struct JsonOutput {
    pub metadata: Metadata,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_us: Option<LatencySummary>,
    pub requests: Vec<RequestEntry>,
}

#[derive(Serialize, Deserialize)]
pub struct Metadata {
    pub tool: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub target: Target,
    pub load: Load,
}

#[derive(Serialize, Deserialize)]
pub struct Target {
    pub url: String,
    pub method: String,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Load {
    pub concurrency: u32,
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

#[derive(Serialize, Deserialize)]
pub struct Summary {
    pub outcome: RunState,
    pub total_requests: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub error_rate: f64,
    pub avg_duration_secs: f64,
    pub total_testing_time_secs: f64,
}

#[derive(Serialize, Deserialize)]
pub struct RequestEntry {
    pub id: u64,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub status: String,
    pub url: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&RequestLog> for RequestEntry {
    fn from(log: &RequestLog) -> Self {
        Self {
            id: log.id.0,
            start_time: log.start_time,
            end_time: log.end_time,
            duration_secs: log.duration.map(|d| d.as_secs_f64()),
            status: log.status.as_str().to_string(),
            url: log.url.clone(),
            method: log.method.to_string(),
            status_code: log.status_code,
            response_body: log.response_body.clone(),
            error_kind: log.error_kind.map(|kind| kind.as_str().to_string()),
            error_message: log.error_message.clone(),
        }
    }
}

pub fn create_output(
    metrics: &Metrics,
    state: RunState,
    logs: &[RequestLog],
    config: &LoadConfig,
) -> JsonOutput {
    let now = Utc::now();
    let started_at =
        now - chrono::Duration::from_std(metrics.total_testing_time).unwrap_or_default();

    JsonOutput {
        metadata: Metadata {
            tool: "stressburst".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at,
            ended_at: now,
            target: Target {
                url: config.url.clone(),
                method: config.method.to_string(),
            },
            load: Load {
                concurrency: config.concurrency,
                timeout_ms: u64::try_from(config.engine.timeout.as_millis()).unwrap_or(u64::MAX),
                connect_timeout_ms: u64::try_from(config.engine.connect_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            },
        },
        summary: Summary {
            outcome: state,
            total_requests: metrics.total_requests,
            succeeded: metrics.succeeded,
            failed: metrics.failed,
            error_rate: metrics.error_rate(),
            avg_duration_secs: metrics.avg_duration.as_secs_f64(),
            total_testing_time_secs: metrics.total_testing_time.as_secs_f64(),
        },
        latency_us: LatencySummary::from_logs(logs),
        requests: logs.iter().map(RequestEntry::from).collect(),
    }
}

pub fn write_json(
    metrics: &Metrics,
    state: RunState,
    logs: &[RequestLog],
    config: &LoadConfig,
    path: &Path,
) -> io::Result<()> {
    let output = create_output(metrics, state, logs, config);
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stressburst::{EngineConfig, ErrorKind, HttpMethod, RequestId, RequestOutcome};

    fn config() -> LoadConfig {
        LoadConfig {
            url: "http://x/ok".to_string(),
            method: HttpMethod::Post,
            body: "{}".to_string(),
            concurrency: 2,
            engine: EngineConfig::default(),
        }
    }

    #[test]
    fn test_output_shape() {
        let mut ok = RequestLog::pending(RequestId(0), "http://x/ok", HttpMethod::Post);
        ok.apply(RequestOutcome::Success {
            end_time: Utc::now(),
            duration: Duration::from_millis(25),
            status_code: 201,
            response_body: Some("{\"id\":1}".to_string()),
        });
        let mut failed = RequestLog::pending(RequestId(1), "http://x/ok", HttpMethod::Post);
        failed.fail(ErrorKind::Cancelled, "request cancelled");

        let metrics = Metrics {
            total_requests: 2,
            succeeded: 1,
            failed: 1,
            avg_duration: Duration::from_millis(25),
            total_testing_time: Duration::from_millis(100),
        };

        let output = create_output(&metrics, RunState::Stopped, &[ok, failed], &config());
        let json = serde_json::to_value(&output).unwrap();

        assert_eq!(json["metadata"]["target"]["method"], "POST");
        assert_eq!(json["summary"]["outcome"], "stopped");
        assert_eq!(json["summary"]["failed"], 1);
        assert_eq!(json["requests"][0]["status_code"], 201);
        assert!(json["requests"][0].get("error_message").is_none());
        assert_eq!(json["requests"][1]["error_kind"], "cancelled");
        assert!(json["requests"][1].get("duration_secs").is_none());
        assert!(json["latency_us"]["p50"].as_u64().is_some());
    }

    #[test]
    fn test_oversized_timeout_saturates() {
        let mut config = config();
        config.engine.timeout = Duration::MAX;

        let output = create_output(&Metrics::default(), RunState::Completed, &[], &config);
        assert_eq!(output.metadata.load.timeout_ms, u64::MAX);
        assert_eq!(output.metadata.load.connect_timeout_ms, 10_000);
    }
}
