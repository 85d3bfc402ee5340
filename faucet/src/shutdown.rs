//! Coordinated shutdown for the faucet's background tasks.
//!
//! The daemon runs a fixed set of long-lived tasks: the queue tick, the
//! wallet refresh and reload listeners, the refill timer and the keepalive
//! pinger. Each selects on a receiver from here. The controller also keeps
//! the join handles of those tasks so the daemon can wait for every one of
//! them to wind down before exiting, instead of racing the runtime drop.

use std::sync::Mutex;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Broadcasts the stop signal and tracks the tasks that listen for it.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Track a background task so [`ShutdownController::drain`] can wait
    /// for it. The name only shows up in shutdown logs.
    pub fn register(&self, name: &'static str, handle: JoinHandle<()>) {
        self.tasks.lock().unwrap().push((name, handle));
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        #[cfg(unix)]
        let terminate = sigterm.recv();

        #[cfg(not(unix))]
        let terminate = std::future::pending::<Option<()>>();

        let reason = tokio::select! {
            _ = signal::ctrl_c() => "SIGINT",
            _ = terminate => "SIGTERM",
        };
        tracing::info!(%reason, "shutdown signal received");
        self.shutdown();
    }

    /// Broadcast shutdown and wait for every registered task to stop.
    pub async fn drain(&self) {
        self.shutdown();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap());
        for (name, handle) in tasks {
            match handle.await {
                Ok(()) => tracing::debug!(task = name, "background task stopped"),
                Err(e) => {
                    tracing::warn!(task = name, error = %e, "background task did not stop cleanly");
                }
            }
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn programmatic_shutdown_notifies_subscribers() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        controller.shutdown();
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn drain_waits_for_registered_tasks() {
        let controller = ShutdownController::new();
        let stopped = Arc::new(AtomicBool::new(false));

        let mut rx = controller.subscribe();
        let flag = stopped.clone();
        let handle = tokio::spawn(async move {
            let _ = rx.recv().await;
            flag.store(true, Ordering::SeqCst);
        });
        controller.register("listener", handle);

        controller.drain().await;
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn drain_tolerates_already_finished_tasks() {
        let controller = ShutdownController::new();
        controller.register("done", tokio::spawn(async {}));
        controller.drain().await;
        assert!(controller.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn multiple_subscribers_all_notified() {
        let controller = ShutdownController::new();
        let mut rx1 = controller.subscribe();
        let mut rx2 = controller.subscribe();
        controller.shutdown();
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
