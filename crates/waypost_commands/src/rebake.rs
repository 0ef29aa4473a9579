//! # Rebake Scheduler
//!
//! Outfit changes ask for an appearance rebake, but several changes in a
//! row should cost one rebake. Each request restarts a quiet period; the
//! rebake goes out once the period passes with no new request.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};
use waypost_core::Grid;

/// Debounced rebake requests.
pub struct RebakeScheduler {
    requests: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl RebakeScheduler {
    /// Starts the scheduler thread.
    #[must_use]
    pub fn start(grid: Arc<dyn Grid>, delay: Duration) -> Self {
        let (tx, rx) = unbounded();
        let worker = thread::Builder::new()
            .name("waypost-rebake".to_string())
            .spawn(move || debounce(grid.as_ref(), &rx, delay))
            .map_err(|error| warn!(%error, "could not start rebake thread"))
            .ok();
        Self {
            requests: Some(tx),
            worker,
        }
    }

    /// Asks for a rebake after the quiet period.
    pub fn schedule(&self) {
        let sent = self
            .requests
            .as_ref()
            .is_some_and(|requests| requests.send(()).is_ok());
        if !sent {
            warn!("rebake scheduler stopped; request dropped");
        }
    }
}

impl Drop for RebakeScheduler {
    fn drop(&mut self) {
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("rebake thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for RebakeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebakeScheduler")
            .field("running", &self.worker.is_some())
            .finish()
    }
}

fn debounce(grid: &dyn Grid, requests: &Receiver<()>, delay: Duration) {
    while requests.recv().is_ok() {
        loop {
            match requests.recv_timeout(delay) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Timeout) => {
                    debug!("rebaking appearance");
                    grid.request_rebake();
                    break;
                }
                // Pending rebake is abandoned at shutdown.
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }
}
