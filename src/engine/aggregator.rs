use crate::engine::batcher::LogBatcher;
use crate::types::{
    ErrorKind, Metrics, RequestId, RequestLog, RequestOutcome, RunState, mean_success_duration,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};

const CANCELLED_MESSAGE: &str = "request cancelled";
const ABANDONED_MESSAGE: &str = "request ended without reporting an outcome";

/// Messages sent to the aggregator task.
#[derive(Debug)]
pub enum Event {
    Completed {
        id: RequestId,
        outcome: RequestOutcome,
    },
    /// Every worker of the fan-out has returned.
    FanOutComplete,
    Stop {
        ack: oneshot::Sender<()>,
    },
}

/// Watch channels through which a run's state is observed.
///
/// They outlive individual runs; each run resets them when it starts.
pub struct Published {
    pub state: watch::Sender<RunState>,
    pub metrics: watch::Sender<Metrics>,
    pub logs: watch::Sender<Arc<Vec<RequestLog>>>,
}

impl Published {
    pub fn new() -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        let (metrics, _) = watch::channel(Metrics::default());
        let (logs, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            state,
            metrics,
            logs,
        }
    }
}

impl Default for Published {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one run records: the two-tier log and the counters.
///
/// Counters move as soon as an event is applied; only log entries wait for
/// the next flush.
#[derive(Debug)]
pub struct RunLedger {
    logs: LogBatcher,
    metrics: Metrics,
    duration_sum: Duration,
    duration_count: u32,
    started: Instant,
}

impl RunLedger {
    pub fn new() -> Self {
        Self {
            logs: LogBatcher::new(),
            metrics: Metrics::default(),
            duration_sum: Duration::ZERO,
            duration_count: 0,
            started: Instant::now(),
        }
    }

    /// Records a freshly dispatched request.
    pub fn dispatch(&mut self, log: RequestLog) {
        self.logs.stage(log);
        self.metrics.total_requests += 1;
    }

    /// Applies a request's terminal outcome.
    ///
    /// Returns `false` when the outcome was discarded: the id is unknown or its
    /// entry already reached a terminal state (for instance a request that was
    /// force-failed by a stop and completed afterwards).
    pub fn complete(&mut self, id: RequestId, outcome: RequestOutcome) -> bool {
        let mut log = match self.logs.get(id) {
            Some(log) if log.is_pending() => log.clone(),
            Some(_) => {
                tracing::debug!("Discarding late outcome for terminal request {}", id);
                return false;
            }
            None => {
                tracing::warn!("Discarding outcome for unknown request {}", id);
                return false;
            }
        };

        if let RequestOutcome::Success { duration, .. } = &outcome {
            self.metrics.succeeded += 1;
            self.record_duration(*duration);
        } else {
            self.metrics.failed += 1;
        }

        log.apply(outcome);
        self.logs.stage(log);
        true
    }

    fn record_duration(&mut self, duration: Duration) {
        self.duration_sum = self.duration_sum.saturating_add(duration);
        self.duration_count = self.duration_count.saturating_add(1);
        self.metrics.avg_duration = self.duration_sum / self.duration_count;
    }

    /// Forces every still-pending entry to `failed` as cancelled.
    pub fn cancel_pending(&mut self) -> u64 {
        self.fail_pending(ErrorKind::Cancelled, CANCELLED_MESSAGE)
    }

    fn fail_pending(&mut self, kind: ErrorKind, message: &str) -> u64 {
        let overridden = self.logs.fail_pending(kind, message);
        self.metrics.failed += overridden;
        overridden
    }

    pub fn flush(&mut self) -> bool {
        self.logs.flush()
    }

    /// Closes the run: a final flush, the total run time and a cross-check of
    /// the incremental average against a full scan.
    pub fn finalize(&mut self) {
        let abandoned = self.fail_pending(ErrorKind::Other, ABANDONED_MESSAGE);
        if abandoned > 0 {
            tracing::warn!("{} requests never reported an outcome", abandoned);
        }

        self.logs.flush();
        self.metrics.total_testing_time = self.started.elapsed();

        let scanned = mean_success_duration(self.logs.canonical());
        if scanned != self.metrics.avg_duration {
            tracing::warn!(
                "Incremental average {:?} disagrees with scanned average {:?}",
                self.metrics.avg_duration,
                scanned
            );
        }
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn logs(&self) -> &[RequestLog] {
        self.logs.canonical()
    }
}

impl Default for RunLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Single owner of a run's ledger.
///
/// Applies worker outcomes as they arrive, publishes the log sequence on each
/// flush tick and closes the run on fan-out completion or stop. The flush
/// interval lives exactly as long as this task.
pub struct Aggregator {
    ledger: RunLedger,
    events_rx: mpsc::Receiver<Event>,
    published: Arc<Published>,
    flush_interval: Duration,
}

impl Aggregator {
    pub fn new(
        ledger: RunLedger,
        events_rx: mpsc::Receiver<Event>,
        published: Arc<Published>,
        flush_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            events_rx,
            published,
            flush_interval,
        }
    }

    pub async fn run(mut self) {
        let mut flush_interval = tokio::time::interval(self.flush_interval);
        flush_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                // Flush ticks take priority over completions
                _ = flush_interval.tick() => {
                    if self.ledger.flush() {
                        self.publish_logs();
                    }
                }

                event = self.events_rx.recv() => {
                    match event {
                        Some(Event::Completed { id, outcome }) => {
                            if self.ledger.complete(id, outcome) {
                                self.publish_metrics();
                            }
                        }
                        Some(Event::FanOutComplete) | None => {
                            // A stop is already underway; its event may still be queued
                            if *self.published.state.borrow() == RunState::Stopping {
                                self.stop();
                            } else {
                                self.finish(RunState::Completed);
                            }
                            break;
                        }
                        Some(Event::Stop { ack }) => {
                            self.stop();
                            let _ = ack.send(());
                            break;
                        }
                    }
                }
            }
        }
    }

    fn stop(&mut self) {
        let cancelled = self.ledger.cancel_pending();
        tracing::info!("Run stopped, {} pending requests marked failed", cancelled);
        self.finish(RunState::Stopped);
    }

    fn finish(&mut self, state: RunState) {
        self.ledger.finalize();
        self.publish_logs();
        self.publish_metrics();
        self.published.state.send_replace(state);

        let metrics = self.ledger.metrics();
        tracing::info!(
            "Run {}: {} requests, {} succeeded, {} failed in {:?}",
            state.as_str(),
            metrics.total_requests,
            metrics.succeeded,
            metrics.failed,
            metrics.total_testing_time
        );
    }

    fn publish_logs(&self) {
        self.published
            .logs
            .send_replace(Arc::new(self.ledger.logs().to_vec()));
    }

    fn publish_metrics(&self) {
        self.published.metrics.send_replace(self.ledger.metrics());
    }
}
