//! Task-level cancellation

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation flag shared between the CLI and the executor
#[derive(Clone, Debug)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Request cancellation; later calls are no-ops
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives as long as any token, so this never resolves.
            std::future::pending::<()>().await;
        }
    }

    /// Cancel automatically after the given duration
    pub fn cancel_after(&self, after: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            tracing::warn!("Task timeout of {}s reached, cancelling run", after.as_secs());
            token.cancel();
        })
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
