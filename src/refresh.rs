//! Background zone refresh
//!
//! The refresh loop keeps a [`ZoneTable`] eventually consistent with the catalogue.
//! Each iteration fetches the full zone set and reconciles it into the table; a failed
//! fetch leaves the previous snapshot in place and is retried after the same interval.
//! Iterations never overlap, and the loop exits promptly when its cancellation token
//! fires, whether it is sleeping or waiting on the catalogue.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::catalog::{CatalogError, ZoneReader};
use crate::zones::ZoneTable;

/// Periodically pulls the zone set from a [`ZoneReader`] into a [`ZoneTable`].
pub struct RefreshLoop {
    reader: Arc<dyn ZoneReader>,
    table: Arc<ZoneTable>,
    interval: Duration,
    fetch_timeout: Option<Duration>,
    shutdown: CancellationToken,
}

impl fmt::Debug for RefreshLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshLoop")
            .field("interval", &self.interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("table", &self.table)
            .finish()
    }
}

impl RefreshLoop {
    /// Create a refresh loop for an already seeded table.
    pub fn new(reader: Arc<dyn ZoneReader>, table: Arc<ZoneTable>, interval: Duration) -> Self {
        Self {
            reader,
            table,
            interval,
            fetch_timeout: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Give up on a fetch which takes longer than `timeout`, counting it as a failure.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Use an externally owned cancellation token, e.g. one shared with the server.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single fetch-and-reconcile iteration.
    ///
    /// Returns whether the table changed. On error the table is not touched.
    pub async fn refresh_once(&self) -> Result<bool, CatalogError> {
        let zones = match self.fetch_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.reader.fetch_zones())
                .await
                .map_err(|_| CatalogError::Timeout(timeout))??,
            None => self.reader.fetch_zones().await?,
        };
        trace!(zones = zones.len(), "fetched zones");
        Ok(self.table.replace_all(zones))
    }

    /// Start the loop on the current tokio runtime.
    pub fn spawn(self) -> RefreshHandle {
        let token = self.shutdown.clone();
        let task = tokio::spawn(self.run());
        RefreshHandle {
            token,
            task: Some(task),
        }
    }

    async fn run(self) {
        info!(interval = ?self.interval, "starting zone refresh loop");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.refresh_once() => match result {
                    Ok(true) => debug!(zones = self.table.len(), "zone table updated"),
                    Ok(false) => trace!("zone table unchanged"),
                    Err(error) => warn!(%error, "zone refresh failed, keeping previous zones"),
                },
            }
        }
        info!("zone refresh loop shutting down");
    }
}

/// Owner handle for a spawned [`RefreshLoop`].
///
/// Dropping the handle cancels the loop without waiting for it.
#[derive(Debug)]
pub struct RefreshHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Signal the loop to stop without waiting.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the loop and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                error!(%error, "zone refresh task failed");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
