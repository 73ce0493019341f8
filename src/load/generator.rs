//! HTTP Load Generator
//!
//! Issues one GET request at a time against a fixed endpoint, pausing a
//! fixed interval between requests, until its cancellation token fires.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Client;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::LoadError;

/// Time given to the target to start listening before the first request.
pub const WARMUP_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for a single request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Endpoint and pacing for the peak phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    /// Full URL to GET
    pub endpoint: Url,
    /// Pause between two consecutive requests
    pub interval: Duration,
}

/// Request counters reported when the generator stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub sent: u64,
    pub failed: u64,
}

impl LoadStats {
    pub fn succeeded(&self) -> u64 {
        self.sent.saturating_sub(self.failed)
    }
}

/// Fixed-interval request loop.
pub struct LoadGenerator {
    client: Client,
    target: LoadTarget,
    warmup: Duration,
}

impl LoadGenerator {
    /// Creates a generator with the default warm-up delay.
    pub fn new(target: LoadTarget) -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(LoadError::Client)?;

        Ok(Self {
            client,
            target,
            warmup: WARMUP_DELAY,
        })
    }

    /// Overrides the warm-up delay.
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Runs the loop on its own task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<LoadStats> {
        tokio::spawn(self.run(cancel))
    }

    /// Runs the request loop until `cancel` fires.
    ///
    /// Failed requests are logged and otherwise ignored. Cancellation
    /// also abandons a request that is still in flight.
    pub async fn run(self, cancel: CancellationToken) -> LoadStats {
        let mut stats = LoadStats::default();

        tokio::select! {
            _ = cancel.cancelled() => return stats,
            _ = sleep(self.warmup) => {}
        }

        info!(
            "Starting to hammer {} every {:?}",
            self.target.endpoint, self.target.interval
        );

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.hit() => outcome,
            };

            stats.sent += 1;
            if let Err(e) = outcome {
                stats.failed += 1;
                warn!("Request to {} failed: {}", self.target.endpoint, e);
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.target.interval) => {}
            }
        }

        debug!(
            "Load generator stopped after {} requests ({} failed)",
            stats.sent, stats.failed
        );
        stats
    }

    /// Issues a single GET, discarding the body.
    async fn hit(&self) -> Result<(), reqwest::Error> {
        self.client
            .get(self.target.endpoint.clone())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
