use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound on the number of requests a single run may fire.
pub const MAX_CONCURRENCY: u32 = 10_000;

// ============================================================================
// Request Identity & Method
// ============================================================================

/// Identifier assigned to a request when it is dispatched.
///
/// Ids are allocated in dispatch order within a run, so ordering by id is
/// ordering by dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            other => Err(format!(
                "Unsupported HTTP method: {} (expected GET or POST)",
                other
            )),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    Dns,
    Connect,
    Tls,
    Refused,
    Reset,
    Http,
    Body,
    Cancelled,
    Other,
}

impl ErrorKind {
    pub fn from_reqwest_error(err: &reqwest::Error) -> Self {
        let text = err.to_string().to_lowercase();
        if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            if text.contains("dns") || text.contains("resolve") {
                ErrorKind::Dns
            } else if text.contains("refused") {
                ErrorKind::Refused
            } else if text.contains("reset") {
                ErrorKind::Reset
            } else {
                ErrorKind::Connect
            }
        } else if err.is_body() || err.is_decode() {
            ErrorKind::Body
        } else if err.is_request() {
            ErrorKind::Http
        } else if text.contains("tls") || text.contains("certificate") {
            ErrorKind::Tls
        } else {
            ErrorKind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Dns => "dns",
            ErrorKind::Connect => "connect",
            ErrorKind::Tls => "tls",
            ErrorKind::Refused => "refused",
            ErrorKind::Reset => "reset",
            ErrorKind::Http => "http",
            ErrorKind::Body => "body",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Other => "other",
        }
    }
}

/// Describes the full reqwest error chain, which is where the useful detail
/// ("connection refused", "operation timed out") usually lives.
pub fn describe_reqwest_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// ============================================================================
// Request Log
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Success,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Success => "success",
            RequestStatus::Failed => "failed",
        }
    }
}

/// Terminal result reported by a single request execution.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success {
        end_time: DateTime<Utc>,
        duration: Duration,
        status_code: u16,
        response_body: Option<String>,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success { .. })
    }
}

/// One entry per dispatched request.
///
/// `duration`, `end_time`, `status_code` and `response_body` are only ever set
/// together with [`RequestStatus::Success`]; `error_kind` and `error_message`
/// only with [`RequestStatus::Failed`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLog {
    pub id: RequestId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub status: RequestStatus,
    pub url: String,
    pub method: HttpMethod,
    pub status_code: Option<u16>,
    pub response_body: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl RequestLog {
    pub fn pending(id: RequestId, url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            id,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            status: RequestStatus::Pending,
            url: url.into(),
            method,
            status_code: None,
            response_body: None,
            error_kind: None,
            error_message: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Moves a pending entry into the terminal state described by `outcome`.
    pub fn apply(&mut self, outcome: RequestOutcome) {
        match outcome {
            RequestOutcome::Success {
                end_time,
                duration,
                status_code,
                response_body,
            } => {
                self.status = RequestStatus::Success;
                self.end_time = Some(end_time);
                self.duration = Some(duration);
                self.status_code = Some(status_code);
                self.response_body = response_body;
                self.error_kind = None;
                self.error_message = None;
            }
            RequestOutcome::Failure { kind, message } => self.fail(kind, message),
        }
    }

    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.status = RequestStatus::Failed;
        self.end_time = None;
        self.duration = None;
        self.status_code = None;
        self.response_body = None;
        self.error_kind = Some(kind);
        self.error_message = Some(message.into());
    }
}

// ============================================================================
// Metrics & Run State
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_requests: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Mean duration of succeeded requests only.
    #[serde(with = "humantime_serde")]
    pub avg_duration: Duration,
    /// Only stable once the run is no longer active.
    #[serde(with = "humantime_serde")]
    pub total_testing_time: Duration,
}

impl Metrics {
    pub fn in_flight(&self) -> u64 {
        self.total_requests
            .saturating_sub(self.succeeded.saturating_add(self.failed))
    }

    pub fn error_rate(&self) -> f64 {
        if self.total_requests > 0 {
            self.failed as f64 / self.total_requests as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run has been started yet.
    #[default]
    Idle,
    Running,
    Stopping,
    /// Idle after every request of the last run reported back.
    Completed,
    /// Idle after the last run was stopped explicitly.
    Stopped,
}

impl RunState {
    pub fn is_active(&self) -> bool {
        matches!(self, RunState::Running | RunState::Stopping)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Stopping => "stopping",
            RunState::Completed => "completed",
            RunState::Stopped => "stopped",
        }
    }
}

/// Mean duration of every successful entry, computed by a full scan.
///
/// The engine maintains the same figure incrementally; this is the slow path
/// used to cross-check it.
pub fn mean_success_duration<'a>(logs: impl IntoIterator<Item = &'a RequestLog>) -> Duration {
    let (sum, count) = logs
        .into_iter()
        .filter(|log| log.status == RequestStatus::Success)
        .filter_map(|log| log.duration)
        .fold((Duration::ZERO, 0u32), |(sum, count), d| {
            (sum.saturating_add(d), count.saturating_add(1))
        });

    if count == 0 { Duration::ZERO } else { sum / count }
}
