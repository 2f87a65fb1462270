//! Shutdown coordination.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks (server loop, health monitor, admission sampler)
/// subscribe and exit when the signal fires.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Spawn a task that triggers shutdown on Ctrl+C.
    pub fn trigger_on_ctrl_c(&self) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                let _ = tx.send(());
            }
        });
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
