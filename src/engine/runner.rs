use crate::engine::aggregator::{Aggregator, Event, Published, RunLedger};
use crate::engine::worker::Worker;
use crate::error::StartError;
use crate::http::create_client;
use crate::types::{HttpMethod, MAX_CONCURRENCY, Metrics, RequestId, RequestLog, RunState};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

const EVENT_CHANNEL_SIZE: usize = 10_000;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub insecure: bool,
    /// How often buffered log entries are merged and republished.
    pub flush_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            insecure: false,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// Handles kept for the run in progress.
struct ActiveRun {
    cancel_token: CancellationToken,
    events_tx: mpsc::Sender<Event>,
}

/// Runs one burst at a time and exposes its state.
///
/// `start` and `stop` are the only commands; everything else observes. Logs
/// are refreshed on the flush interval, metrics and run state as soon as they
/// change.
pub struct Engine {
    config: EngineConfig,
    published: Arc<Published>,
    active: Arc<Mutex<Option<ActiveRun>>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            published: Arc::new(Published::new()),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Fires `concurrency` simultaneous requests at `url`.
    ///
    /// Returns as soon as the burst is dispatched; the run continues in the
    /// background. A `POST` sends `body` verbatim as JSON, a `GET` ignores it.
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Nothing starts when the URL does not parse or is not http(s), when
    /// `concurrency` is outside `1..=MAX_CONCURRENCY`, when a run is already
    /// active, or when the HTTP client cannot be built.
    pub fn start(
        &self,
        url: &str,
        concurrency: u32,
        method: HttpMethod,
        body: &str,
    ) -> Result<(), StartError> {
        let target = Url::parse(url).map_err(|source| StartError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        if !matches!(target.scheme(), "http" | "https") {
            return Err(StartError::UnsupportedScheme {
                scheme: target.scheme().to_string(),
            });
        }
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(StartError::InvalidConcurrency {
                value: concurrency,
                max: MAX_CONCURRENCY,
            });
        }

        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if self.published.state.borrow().is_active() {
            return Err(StartError::AlreadyRunning);
        }

        let client = create_client(
            concurrency,
            self.config.timeout,
            self.config.connect_timeout,
            self.config.insecure,
        )
        .map_err(|source| StartError::Client { source })?;

        // Every request is pending and counted before any worker is spawned
        let mut ledger = RunLedger::new();
        let ids: Vec<RequestId> = (0..u64::from(concurrency)).map(RequestId).collect();
        for &id in &ids {
            ledger.dispatch(RequestLog::pending(id, target.as_str(), method));
        }

        self.published.logs.send_replace(Arc::new(Vec::new()));
        self.published.metrics.send_replace(ledger.metrics());
        self.published.state.send_replace(RunState::Running);

        let cancel_token = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::channel::<Event>(EVENT_CHANNEL_SIZE);

        let aggregator = Aggregator::new(
            ledger,
            events_rx,
            self.published.clone(),
            self.config.flush_interval,
        );
        let slot = self.active.clone();
        let run_tx = events_tx.clone();
        tokio::spawn(async move {
            aggregator.run().await;
            clear_finished_run(&slot, &run_tx);
        });

        let target = Arc::new(target);
        let body: Option<Arc<str>> = match method {
            HttpMethod::Post => Some(Arc::from(body)),
            HttpMethod::Get => None,
        };
        let workers = ids
            .into_iter()
            .map(|id| {
                Worker::new(
                    id,
                    client.clone(),
                    target.clone(),
                    method,
                    body.clone(),
                    events_tx.clone(),
                    cancel_token.clone(),
                )
            })
            .collect();
        tokio::spawn(fan_out(workers, events_tx.clone()));

        tracing::info!(
            "Started run: {} x {} {}",
            concurrency,
            method,
            target.as_str()
        );

        *active = Some(ActiveRun {
            cancel_token,
            events_tx,
        });

        Ok(())
    }

    /// Cancels the run in progress.
    ///
    /// Requests that already reported keep their outcome; everything still
    /// pending ends as failed. Returns once the final state is published.
    /// Calling it with no active run does nothing.
    pub async fn stop(&self) {
        let run = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(run) = run else {
            return;
        };

        let stopping = self.published.state.send_if_modified(|state| {
            if *state == RunState::Running {
                *state = RunState::Stopping;
                true
            } else {
                false
            }
        });
        if !stopping {
            return;
        }

        tracing::info!("Stop requested, cancelling in-flight requests");

        // Stop must be queued ahead of any fan-out completion the cancel triggers
        let (ack_tx, ack_rx) = oneshot::channel();
        let queued = run.events_tx.send(Event::Stop { ack: ack_tx }).await.is_ok();
        run.cancel_token.cancel();

        if queued {
            // A dropped ack means the run completed on its own first
            let _ = ack_rx.await;
        }
    }

    /// Resolves once no run is active, with the state the engine settled in.
    pub async fn wait(&self) -> RunState {
        let mut state_rx = self.published.state.subscribe();
        match state_rx.wait_for(|state| !state.is_active()).await {
            Ok(state) => *state,
            Err(_) => *self.published.state.borrow(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    pub fn state(&self) -> RunState {
        *self.published.state.borrow()
    }

    pub fn metrics(&self) -> Metrics {
        *self.published.metrics.borrow()
    }

    /// Canonical log sequence as of the last flush.
    pub fn logs(&self) -> Arc<Vec<RequestLog>> {
        self.published.logs.borrow().clone()
    }

    pub fn state_rx(&self) -> watch::Receiver<RunState> {
        self.published.state.subscribe()
    }

    pub fn metrics_rx(&self) -> watch::Receiver<Metrics> {
        self.published.metrics.subscribe()
    }

    pub fn logs_rx(&self) -> watch::Receiver<Arc<Vec<RequestLog>>> {
        self.published.logs.subscribe()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Empties the active slot once its run has closed, unless a newer run has
/// already taken it.
fn clear_finished_run(slot: &Mutex<Option<ActiveRun>>, run_tx: &mpsc::Sender<Event>) {
    let mut active = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if active
        .as_ref()
        .is_some_and(|run| run.events_tx.same_channel(run_tx))
    {
        *active = None;
    }
}

/// Runs every worker of the burst at once and reports back when all of them
/// have returned, whatever their outcome.
async fn fan_out(workers: Vec<Worker>, events_tx: mpsc::Sender<Event>) {
    let handles: Vec<JoinHandle<()>> = workers
        .into_iter()
        .map(|worker| tokio::spawn(worker.run()))
        .collect();

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!("Worker task failed: {}", e);
        }
    }

    let _ = events_tx.send(Event::FanOutComplete).await;
}
