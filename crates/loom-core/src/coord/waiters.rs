//! Waiter bookkeeping and the shutdown flag.
//!
//! The outstanding-waiter count is owned by a single accumulator task that
//! applies signed deltas in arrival order. Callers never touch the counter
//! directly; they send deltas over a channel and read the published value
//! from a `watch`.
//!
//! Entering is acknowledged, so a waiter is already counted by the time it
//! first looks at the shutdown flag. Leaving is fire-and-forget from `Drop`,
//! which runs on every exit path (success, error, shutdown, or the caller
//! dropping the future).

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

struct Delta {
    amount: i64,
    ack: Option<oneshot::Sender<()>>,
}

pub(crate) struct WaiterTracker {
    deltas: mpsc::UnboundedSender<Delta>,
    count: watch::Receiver<usize>,
    shutdown: watch::Sender<bool>,
}

impl WaiterTracker {
    /// Start the accumulator task. Must be called inside a Tokio runtime.
    /// The task ends when the tracker and every guard are dropped.
    pub(crate) fn spawn() -> Self {
        let (deltas, mut rx) = mpsc::unbounded_channel::<Delta>();
        let (count_tx, count) = watch::channel(0usize);

        tokio::spawn(async move {
            let mut current: i64 = 0;
            while let Some(delta) = rx.recv().await {
                current += delta.amount;
                if current < 0 {
                    warn!(current, "waiter count went negative; clamping to zero");
                    current = 0;
                }
                count_tx.send_replace(current as usize);
                if let Some(ack) = delta.ack {
                    // the entering waiter may have been dropped already
                    let _ = ack.send(());
                }
            }
        });

        let (shutdown, _) = watch::channel(false);
        Self {
            deltas,
            count,
            shutdown,
        }
    }

    /// Register one waiter. The returned guard deregisters it on drop.
    pub(crate) async fn enter(&self) -> WaiterGuard {
        let (ack_tx, ack_rx) = oneshot::channel();
        let sent = self
            .deltas
            .send(Delta {
                amount: 1,
                ack: Some(ack_tx),
            })
            .is_ok();
        // Built before awaiting the ack so cancellation still sends the -1.
        let guard = WaiterGuard {
            deltas: sent.then(|| self.deltas.clone()),
        };
        if sent {
            let _ = ack_rx.await;
        }
        guard
    }

    pub(crate) fn count(&self) -> usize {
        *self.count.borrow()
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Raise the flag, then poll until every registered waiter has left.
    pub(crate) async fn shutdown(&self, poll_interval: Duration) {
        let already = self.shutdown.send_replace(true);
        if !already {
            info!(waiters = self.count(), "shutdown requested");
        }

        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            let outstanding = self.count();
            if outstanding == 0 {
                break;
            }
            debug!(outstanding, "waiting for waiters to exit");
        }
        info!("all waiters exited");
    }
}

pub(crate) struct WaiterGuard {
    deltas: Option<mpsc::UnboundedSender<Delta>>,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        if let Some(deltas) = self.deltas.take() {
            let _ = deltas.send(Delta {
                amount: -1,
                ack: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn settle(tracker: &WaiterTracker, expected: usize) {
        let mut rx = tracker.count.clone();
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|n| *n == expected))
            .await
            .expect("count did not settle")
            .unwrap();
    }

    #[tokio::test]
    async fn enter_is_counted_before_it_returns() {
        let tracker = WaiterTracker::spawn();
        let _a = tracker.enter().await;
        let _b = tracker.enter().await;

        assert_eq!(tracker.count(), 2);
    }

    #[tokio::test]
    async fn dropping_guards_drains_count() {
        let tracker = WaiterTracker::spawn();
        let a = tracker.enter().await;
        let b = tracker.enter().await;

        drop(a);
        settle(&tracker, 1).await;
        drop(b);
        settle(&tracker, 0).await;
    }

    #[tokio::test]
    async fn shutdown_waits_for_outstanding_guard() {
        let tracker = Arc::new(WaiterTracker::spawn());
        let guard = tracker.enter().await;

        let shutdown = tokio::spawn({
            let tracker = Arc::clone(&tracker);
            async move { tracker.shutdown(Duration::from_millis(5)).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(tracker.is_shut_down());
        assert!(!shutdown.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), shutdown)
            .await
            .expect("shutdown did not return")
            .unwrap();
    }

    #[tokio::test]
    async fn shutdown_with_no_waiters_returns_immediately() {
        let tracker = WaiterTracker::spawn();
        tokio::time::timeout(
            Duration::from_millis(200),
            tracker.shutdown(Duration::from_millis(5)),
        )
        .await
        .unwrap();
        assert!(tracker.is_shut_down());
    }
}
