//! Outbound delivery of the finished session. Fire-and-forget: nothing is
//! returned to the caller and failures never reach the participant.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use reqwest::Client;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{info, warn};
use url::Url;

use crate::assembler::FormPayload;

pub trait SubmissionSink: Send + Sync {
    /// Hands the payload off for delivery. Must not block.
    fn deliver(&self, payload: FormPayload);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SubmissionSink for LogSink {
    fn deliver(&self, payload: FormPayload) {
        info!(
            fields = payload.fields().len(),
            query = %payload.encoded_query(),
            "dry run: submission not sent"
        );
    }
}

pub struct HttpFormSink {
    client: Client,
    endpoint: Url,
    runtime: Handle,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl HttpFormSink {
    pub fn new(endpoint: Url, runtime: Handle) -> Self {
        Self::with_client(Client::new(), endpoint, runtime)
    }

    pub fn with_client(client: Client, endpoint: Url, runtime: Handle) -> Self {
        Self {
            client,
            endpoint,
            runtime,
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Waits up to `timeout` for requests still in flight so a short-lived
    /// process does not cut them off. Returns `false` if the wait timed out.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let pending = std::mem::take(
            &mut *self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        if pending.is_empty() {
            return true;
        }

        let wait_all = async {
            for request in pending {
                let _ = request.await;
            }
        };
        let finished = tokio::time::timeout(timeout, wait_all).await.is_ok();
        if !finished {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "submission still in flight at shutdown"
            );
        }
        finished
    }
}

impl SubmissionSink for HttpFormSink {
    fn deliver(&self, payload: FormPayload) {
        let url = payload.url_for(&self.endpoint);
        let client = self.client.clone();
        let host = self.endpoint.host_str().unwrap_or_default().to_string();
        let fields = payload.fields().len();

        let request = self.runtime.spawn(async move {
            match client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    info!(%host, fields, status = %response.status(), "submission delivered");
                }
                Ok(response) => {
                    warn!(%host, fields, status = %response.status(), "submission rejected by endpoint");
                }
                Err(error) => {
                    warn!(%host, fields, %error, "submission failed; not retrying");
                }
            }
        });

        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }
}

#[cfg(test)]
#[path = "tests/sink_tests.rs"]
mod tests;
