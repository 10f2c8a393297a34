//! Process-level shutdown handling

use feedlink::ShutdownSignal;
use tokio::signal;
use tracing::info;

/// Ties Ctrl+C to the [`ShutdownSignal`] the SDK runs under
#[derive(Debug, Clone, Default)]
pub struct ShutdownManager {
    signal: ShutdownSignal,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a Ctrl+C handler; it exits early once shutdown is triggered
    pub fn spawn_signal_handler(&self) {
        let shutdown = self.signal.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = signal::ctrl_c() => {
                    if result.is_ok() {
                        info!("Received shutdown signal (Ctrl+C), shutting down gracefully...");
                        shutdown.trigger();
                    }
                }
                _ = shutdown.cancelled() => {}
            }
        });
    }

    /// Clone of the signal for passing to the SDK and tasks
    pub fn signal(&self) -> ShutdownSignal {
        self.signal.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_handler_exits_on_shutdown() {
        let manager = ShutdownManager::new();
        manager.spawn_signal_handler();

        let signal = manager.signal();
        signal.trigger();
        assert!(manager.signal().is_triggered());
        assert!(!signal.sleep(Duration::from_secs(10)).await);
    }
}
