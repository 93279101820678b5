use crate::engine::aggregator::Event;
use crate::http::execute_request;
use crate::types::{HttpMethod, RequestId};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Executes exactly one request of a burst and reports its outcome.
pub struct Worker {
    id: RequestId,
    client: Client,
    url: Arc<Url>,
    method: HttpMethod,
    body: Option<Arc<str>>,
    events_tx: mpsc::Sender<Event>,
    cancel_token: CancellationToken,
}

impl Worker {
    pub fn new(
        id: RequestId,
        client: Client,
        url: Arc<Url>,
        method: HttpMethod,
        body: Option<Arc<str>>,
        events_tx: mpsc::Sender<Event>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            id,
            client,
            url,
            method,
            body,
            events_tx,
            cancel_token,
        }
    }

    /// A cancelled worker returns without reporting; its entry stays pending
    /// until the stop that cancelled it marks it failed.
    pub async fn run(self) {
        if self.cancel_token.is_cancelled() {
            tracing::debug!("Worker {} cancelled before sending", self.id);
            return;
        }

        let outcome = tokio::select! {
            biased;

            _ = self.cancel_token.cancelled() => {
                tracing::debug!("Worker {} abandoned its request", self.id);
                return;
            }

            outcome = execute_request(&self.client, &self.url, self.method, self.body.as_deref()) => outcome,
        };

        let event = Event::Completed {
            id: self.id,
            outcome,
        };
        if self.events_tx.send(event).await.is_err() {
            tracing::debug!("Worker {} finished after the run closed", self.id);
        }
    }
}
