use tokio::sync::mpsc::{self, Receiver, Sender};

/// A bounded FIFO where every trainer enqueues one token once it's done.
///
/// The server dequeues exactly one token per expected trainer before shutting
/// down. Enqueueing waits while the queue is full.
pub struct WorkerDoneQueue {
    tx: Sender<()>,
    rx: Receiver<()>,
}

/// The enqueueing end handed to every connection.
#[derive(Clone)]
pub struct DoneSender(Sender<()>);

impl WorkerDoneQueue {
    /// Creates a new `WorkerDoneQueue`.
    ///
    /// # Arguments
    /// * `capacity` - The amount of tokens the queue can hold, at least one.
    ///
    /// # Returns
    /// A new `WorkerDoneQueue` instance.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self { tx, rx }
    }

    pub fn sender(&self) -> DoneSender {
        DoneSender(self.tx.clone())
    }

    /// Waits until a token is available and takes it.
    pub async fn dequeue(&mut self) {
        // The queue owns a sender, so the channel never closes while `self` lives.
        let _ = self.rx.recv().await;
    }
}

impl DoneSender {
    /// Enqueues a token, waiting while the queue is full.
    ///
    /// # Returns
    /// `false` if the queue was already dropped.
    pub async fn enqueue(&self) -> bool {
        self.0.send(()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time;

    use super::*;

    #[tokio::test]
    async fn dequeues_what_was_enqueued() {
        let mut queue = WorkerDoneQueue::new(2);
        let sender = queue.sender();

        assert!(sender.enqueue().await);
        assert!(sender.enqueue().await);

        queue.dequeue().await;
        queue.dequeue().await;
    }

    #[tokio::test]
    async fn dequeue_waits_for_a_token() {
        let mut queue = WorkerDoneQueue::new(1);
        let res = time::timeout(Duration::from_millis(50), queue.dequeue()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn enqueue_waits_while_full() {
        let mut queue = WorkerDoneQueue::new(1);
        let sender = queue.sender();
        assert!(sender.enqueue().await);

        let blocked = time::timeout(Duration::from_millis(50), sender.enqueue()).await;
        assert!(blocked.is_err());

        queue.dequeue().await;
        assert!(sender.enqueue().await);
    }

    #[tokio::test]
    async fn enqueue_after_drop_reports_failure() {
        let queue = WorkerDoneQueue::new(1);
        let sender = queue.sender();
        drop(queue);

        assert!(!sender.enqueue().await);
    }
}
