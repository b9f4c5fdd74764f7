//! Periodic backend status poll.
//!
//! Re-checks backend reachability on a fixed interval for the lifetime
//! of the session. The poll only ever touches the status field, so it
//! interleaves freely with send/receive flows. The spawned task is owned
//! by a handle with an explicit stop, and is aborted when the handle is
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::controller::SessionController;

/// Spawns the status poll loop.
pub struct StatusPoller;

impl StatusPoller {
    /// Starts polling on the given interval. The first check runs
    /// immediately, covering the startup status probe.
    pub fn start(controller: Arc<SessionController>, interval: Duration) -> PollerHandle {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            tracing::info!(target: "status_poll", "Poller started ({:?} interval)", interval);

            loop {
                ticker.tick().await;
                let status = controller.check_backend_status().await;
                tracing::debug!(target: "status_poll", "Backend status: {}", status);
            }
        });

        PollerHandle { handle }
    }
}

/// Owns the poll task. Stopping (or dropping) the handle aborts the
/// loop; an in-flight status request is simply discarded.
pub struct PollerHandle {
    handle: JoinHandle<()>,
}

impl PollerHandle {
    /// Stops the poll loop.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
