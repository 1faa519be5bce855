//! Deadline-bounded graceful shutdown, shared by the event hub, the health
//! supervisor and the memory monitor (§5: shutdown within 10-30s).

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Broadcasts a shutdown signal to every background task via a `watch`
/// channel, then waits for each registered task to report completion
/// within a deadline.
pub struct ShutdownCoordinator {
    tx: watch::Sender<bool>,
    deadline: Duration,
    tasks: std::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl ShutdownCoordinator {
    #[must_use]
    pub fn new(deadline: Duration) -> Arc<Self> {
        let (tx, _rx) = watch::channel(false);
        Arc::new(Self {
            tx,
            deadline,
            tasks: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// A receiver background tasks should select on alongside their own
    /// work loop.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Register a task's join handle so `shutdown` can wait for it.
    pub fn track(&self, handle: tokio::task::JoinHandle<()>) {
        self.tasks.lock().unwrap().push(handle);
    }

    /// Signal shutdown and wait up to `deadline` for every tracked task to
    /// finish. Tasks still running past the deadline are abandoned (their
    /// handles dropped, not aborted) and a warning is logged, per §5's
    /// "best-effort drain" framing.
    pub async fn shutdown(&self) {
        info!("initiating graceful shutdown");
        let _ = self.tx.send(true);

        let handles: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        let joined = tokio::time::timeout(self.deadline, futures_util::future::join_all(handles)).await;

        match joined {
            Ok(_) => info!("shutdown completed within deadline"),
            Err(_) => warn!(deadline_secs = self.deadline.as_secs(), "shutdown deadline exceeded, abandoning remaining tasks"),
        }
    }
}
