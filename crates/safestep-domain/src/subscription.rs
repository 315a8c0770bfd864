use tokio::sync::mpsc;

/// One delivery on a standing collection subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent<T> {
    /// The complete, internally consistent result set at one point in time.
    /// Consumers replace their cache with it wholesale.
    Snapshot(Vec<T>),
    /// The subscription failed (store unreachable, permission denied).
    /// Consumers freeze at last-known-good; the stream ends after this.
    Error(String),
}

/// Sender half handed to store implementations.
pub type SnapshotSender<T> = mpsc::UnboundedSender<SnapshotEvent<T>>;

/// A cancellable stream of full-snapshot events for one owner-filtered
/// collection query.
///
/// Cancelling (explicitly or by drop) detaches the subscriber from the
/// store: no event is observable afterwards, including events that were
/// already queued.
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<SnapshotEvent<T>>,
    canceller: Option<Box<dyn FnOnce() + Send>>,
}

impl<T> Subscription<T> {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<SnapshotEvent<T>>,
        canceller: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            canceller: Some(Box::new(canceller)),
        }
    }

    /// Awaits the next event. Returns `None` once the stream is closed or
    /// the subscription has been cancelled.
    pub async fn recv(&mut self) -> Option<SnapshotEvent<T>> {
        if self.canceller.is_none() {
            return None;
        }
        self.receiver.recv().await
    }

    /// Detaches from the store. Idempotent; also runs on drop.
    pub fn cancel(&mut self) {
        if let Some(canceller) = self.canceller.take() {
            canceller();
            self.receiver.close();
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
