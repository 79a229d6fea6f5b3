//! Cancellation signal for bounded waits.

use std::time::Duration;
use tokio::sync::watch;

/// Cooperative shutdown signal threaded into every bounded wait.
///
/// Wraps a `watch` channel carrying a boolean; `true` means shut down. An
/// executor built without a channel never cancels.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl ShutdownSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn none() -> Self {
        Self { rx: None }
    }

    /// Wraps a caller-owned watch receiver.
    #[must_use]
    pub fn from_watch(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Sleeps for `duration`, waking early on cancellation.
    ///
    /// Returns `true` when the sleep was cut short by cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let Some(rx) = &self.rx else {
            tokio::time::sleep(duration).await;
            return false;
        };

        let mut rx = rx.clone();
        if *rx.borrow() {
            return true;
        }

        tokio::select! {
            () = tokio::time::sleep(duration) => false,
            () = async {
                loop {
                    if rx.changed().await.is_err() {
                        // Sender gone; no further signal can arrive.
                        std::future::pending::<()>().await;
                    }
                    if *rx.borrow() {
                        return;
                    }
                }
            } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn none_signal_sleeps_fully() {
        let signal = ShutdownSignal::none();
        assert!(!signal.sleep(Duration::from_secs(5)).await);
        assert!(!signal.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn pre_cancelled_signal_returns_immediately() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let signal = ShutdownSignal::from_watch(rx);
        assert!(signal.is_cancelled());
        assert!(signal.sleep(Duration::from_secs(3600)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_cuts_sleep_short() {
        let (tx, rx) = watch::channel(false);
        let signal = ShutdownSignal::from_watch(rx);

        let sleeper = tokio::spawn({
            let signal = signal.clone();
            async move { signal.sleep(Duration::from_secs(3600)).await }
        });
        tokio::task::yield_now().await;
        tx.send(true).unwrap();

        assert!(sleeper.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_does_not_cancel() {
        let (tx, rx) = watch::channel(false);
        let signal = ShutdownSignal::from_watch(rx);
        drop(tx);
        assert!(!signal.sleep(Duration::from_secs(1)).await);
    }
}
