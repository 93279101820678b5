use crate::output::LatencySummary;
use std::io::{self, Write};
use std::time::Duration;
use stressburst::{Metrics, RequestLog, RequestStatus, RunState};

const BODY_PREVIEW_CHARS: usize = 200;

/// Rewrites the live status line on stderr.
pub fn print_progress(metrics: &Metrics, elapsed: Duration) {
    let mut stderr = io::stderr().lock();
    let _ = write!(
        stderr,
        "\r[{:>6.1}s] total {:>5}  ok {:>5}  failed {:>5}  in flight {:>5}  avg {:>8.3}s",
        elapsed.as_secs_f64(),
        metrics.total_requests,
        metrics.succeeded,
        metrics.failed,
        metrics.in_flight(),
        metrics.avg_duration.as_secs_f64()
    );
    let _ = stderr.flush();
}

pub fn print_requests(logs: &[RequestLog], show_body: bool) {
    if logs.is_empty() {
        return;
    }

    println!("\nRequests:");
    for log in logs {
        println!("  {}", format_request_row(log));

        if log.status == RequestStatus::Failed {
            if let Some(message) = &log.error_message {
                println!("      error: {}", message);
            }
        }

        if show_body {
            if let Some(body) = log.response_body.as_deref().filter(|b| !b.is_empty()) {
                println!("      body: {}", preview(body));
            }
        }
    }
}

fn format_request_row(log: &RequestLog) -> String {
    let status_code = log
        .status_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "---".to_string());
    let duration = log
        .duration
        .map(|d| format!("{:.3}s", d.as_secs_f64()))
        .unwrap_or_else(|| "---".to_string());

    format!(
        "{} {:>6} {:<4} {:>3} {:>9} {:<7} {}",
        log.start_time.format("%H:%M:%S%.3f"),
        log.id.to_string(),
        log.method,
        status_code,
        duration,
        log.status.as_str(),
        log.url
    )
}

fn preview(body: &str) -> String {
    let flat = body.replace(['\r', '\n'], " ");
    if flat.chars().count() > BODY_PREVIEW_CHARS {
        let cut: String = flat.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

pub fn print_summary(metrics: &Metrics, state: RunState, latency: Option<&LatencySummary>) {
    println!("\n{}", "=".repeat(50));
    println!("{:^50}", "Burst Results");
    println!("{}", "=".repeat(50));

    println!("\nRun:");
    println!("  Outcome:         {:>12}", state.as_str());
    println!(
        "  Total Time (s):  {:>12.2}",
        metrics.total_testing_time.as_secs_f64()
    );

    println!("\nRequests:");
    println!("  Total Requests:  {:>12}", metrics.total_requests);
    println!("  Succeeded:       {:>12}", metrics.succeeded);
    println!("  Failed:          {:>12}", metrics.failed);
    println!("  Error Rate:      {:>11.2}%", metrics.error_rate() * 100.0);
    println!(
        "  Avg Duration (s):{:>12.3}",
        metrics.avg_duration.as_secs_f64()
    );

    if let Some(latency) = latency {
        println!("\nLatency (ms):");
        println!("  Min:             {:>12.2}", latency.min as f64 / 1000.0);
        println!("  Max:             {:>12.2}", latency.max as f64 / 1000.0);
        println!("  Mean:            {:>12.2}", latency.mean / 1000.0);
        println!("  p50:             {:>12.2}", latency.p50 as f64 / 1000.0);
        println!("  p90:             {:>12.2}", latency.p90 as f64 / 1000.0);
        println!("  p95:             {:>12.2}", latency.p95 as f64 / 1000.0);
        println!("  p99:             {:>12.2}", latency.p99 as f64 / 1000.0);
    }

    println!("\n{}", "=".repeat(50));
}

#[cfg(test)]
mod tests {
    use super::*;
    use stressburst::{ErrorKind, HttpMethod, RequestId};

    #[test]
    fn test_row_for_pending_request() {
        let log = RequestLog::pending(RequestId(7), "http://x/ok", HttpMethod::Get);
        let row = format_request_row(&log);

        assert!(row.contains("#7"));
        assert!(row.contains("GET"));
        assert!(row.contains("pending"));
        assert!(row.contains("---"));
        assert!(row.ends_with("http://x/ok"));
    }

    #[test]
    fn test_row_for_failed_request() {
        let mut log = RequestLog::pending(RequestId(1), "http://x/ok", HttpMethod::Post);
        log.fail(ErrorKind::Cancelled, "request cancelled");
        let row = format_request_row(&log);

        assert!(row.contains("POST"));
        assert!(row.contains("failed"));
    }

    #[test]
    fn test_preview_truncates_and_flattens() {
        assert_eq!(preview("a\nb"), "a b");

        let long = "x".repeat(BODY_PREVIEW_CHARS + 10);
        let out = preview(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), BODY_PREVIEW_CHARS + 3);
    }
}
