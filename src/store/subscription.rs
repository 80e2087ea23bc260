use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Producer half of a snapshot feed.
#[derive(Debug)]
pub struct Publisher<T> {
    tx: mpsc::UnboundedSender<T>,
    released: CancellationToken,
}

impl<T> Publisher<T> {
    /// Deliver a snapshot; returns `false` once the subscriber is gone.
    pub fn publish(&self, snapshot: T) -> bool {
        !self.is_released() && self.tx.send(snapshot).is_ok()
    }

    pub fn is_released(&self) -> bool {
        self.released.is_cancelled() || self.tx.is_closed()
    }

    /// Resolves once the subscriber unsubscribes.
    pub async fn released(&self) {
        self.released.cancelled().await
    }
}

/// Consumer half: an endless sequence of snapshots, each replacing the one before.
///
/// Dropping the subscription unsubscribes, on every exit path.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
    _release: DropGuard,
}

impl<T> Subscription<T> {
    /// Next snapshot, or `None` when the producer went away.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Newest already-delivered snapshot, skipping stale ones, without waiting.
    pub fn latest(&mut self) -> Option<T> {
        let mut newest = None;
        while let Ok(snapshot) = self.rx.try_recv() {
            newest = Some(snapshot);
        }
        newest
    }

    pub fn unsubscribe(self) {}
}

pub fn subscription<T>() -> (Publisher<T>, Subscription<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let released = CancellationToken::new();
    (
        Publisher {
            tx,
            released: released.clone(),
        },
        Subscription {
            rx,
            _release: released.drop_guard(),
        },
    )
}

#[cfg(test)]
#[path = "../../tests/unit/store/subscription.rs"]
mod tests;
