use shared::models::OrderNotify;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast channel capacity for committed notifies
pub const DEFAULT_NOTIFY_CAPACITY: usize = 1024;

/// Fan-out of committed notifies to in-process subscribers
#[derive(Clone)]
pub struct NotifyHub {
    tx: broadcast::Sender<Arc<OrderNotify>>,
}

impl std::fmt::Debug for NotifyHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyHub")
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

impl NotifyHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<OrderNotify>> {
        self.tx.subscribe()
    }

    /// Publish a committed notify. Having no subscriber is not an error:
    /// the row is already persisted and can be listed later.
    pub fn publish(&self, notify: OrderNotify) -> usize {
        let (id, order_id, kind) = (notify.id, notify.order_id, notify.kind);
        match self.tx.send(Arc::new(notify)) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(notify_id = id, order_id, kind = ?kind, "No notify subscribers");
                0
            }
        }
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{NotifyKind, NotifyStatus};

    fn notify(id: i64) -> OrderNotify {
        OrderNotify {
            id,
            order_id: 1,
            org_id: 5,
            kind: NotifyKind::Signup,
            content: "signed".into(),
            author_id: 3,
            status: NotifyStatus::Unread,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let hub = NotifyHub::new(4);
        assert_eq!(hub.publish(notify(1)), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_in_order() {
        let hub = NotifyHub::new(4);
        let mut rx = hub.subscribe();
        hub.publish(notify(1));
        hub.publish(notify(2));
        assert_eq!(rx.recv().await.unwrap().id, 1);
        assert_eq!(rx.recv().await.unwrap().id, 2);
    }
}
