//! Shutdown coordination for the gateway.

use std::time::Duration;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Debug, Clone)]
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

    /// Number of tasks still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait until every subscriber dropped its receiver, at most `deadline`.
    /// Returns false when tasks were still running at the deadline.
    pub async fn drained(&self, deadline: Duration) -> bool {
        let wait = async {
            while self.receiver_count() > 0 {
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        };
        tokio::time::timeout(deadline, wait).await.is_ok()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut a = shutdown.subscribe();
        let mut b = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[tokio::test]
    async fn drained_waits_for_receivers() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let task = tokio::spawn(async move {
            let _ = rx.recv().await;
        });

        assert!(!shutdown.drained(Duration::from_millis(50)).await);
        shutdown.trigger();
        task.await.unwrap();
        assert!(shutdown.drained(Duration::from_secs(1)).await);
    }
}
