//! Cooperative stop signal shared by every agent task

use tokio::sync::watch;

/// Fires the stop signal
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Observes the stop signal; cheap to clone into each agent
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger and signal pair
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // send_replace succeeds even when every receiver is gone
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the trigger fires.
    ///
    /// A trigger dropped without firing never resolves this future.
    pub async fn triggered(&mut self) {
        let closed = self.rx.wait_for(|stop| *stop).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_every_signal() {
        let (trigger, signal) = shutdown_channel();
        let mut first = signal.clone();
        let mut second = trigger.signal();
        assert!(!signal.is_triggered());

        trigger.trigger();
        first.triggered().await;
        second.triggered().await;
        assert!(signal.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trigger_does_not_fire() {
        let (trigger, mut signal) = shutdown_channel();
        drop(trigger);

        let waited = tokio::time::timeout(Duration::from_secs(60), signal.triggered()).await;
        assert!(waited.is_err());
        assert!(!signal.is_triggered());
    }
}
