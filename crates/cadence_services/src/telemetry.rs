//! Best-effort telemetry push
//!
//! Samples are queued with `try_push` and POSTed as JSON from a tokio task.
//! A slow or dead endpoint only ever costs dropped samples.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telemetry endpoint answered {0}")]
    Status(reqwest::StatusCode),
}

pub struct TelemetryClient<T> {
    tx: mpsc::Sender<T>,
}

impl<T> TelemetryClient<T>
where
    T: Serialize + Send + Sync + 'static,
{
    /// Start the sender task for `endpoint`. The task ends when the client
    /// is dropped and the queue drains.
    pub fn spawn(runtime: &Handle, endpoint: String, queue_depth: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<T>(queue_depth.max(1));
        let task = runtime.spawn(async move {
            let client = Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new());
            while let Some(sample) = rx.recv().await {
                if let Err(err) = post(&client, &endpoint, &sample).await {
                    warn!(endpoint = %endpoint, %err, "telemetry push failed");
                }
            }
        });
        (Self { tx }, task)
    }

    /// Queue a sample. Returns false if it was dropped.
    pub fn try_push(&self, sample: T) -> bool {
        match self.tx.try_send(sample) {
            Ok(()) => true,
            Err(err) => {
                trace!(%err, "telemetry sample dropped");
                false
            }
        }
    }
}

pub async fn post<T: Serialize>(client: &Client, endpoint: &str, sample: &T) -> Result<(), TelemetryError> {
    let response = client.post(endpoint).json(sample).send().await?;
    if !response.status().is_success() {
        return Err(TelemetryError::Status(response.status()));
    }
    Ok(())
}
