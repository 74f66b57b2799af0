use super::NotifyHub;
use async_trait::async_trait;
use shared::models::OrderNotify;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

/// Delivery sink for committed notifies (push channel, webhook, ...)
#[async_trait]
pub trait NotifyDelivery: Send + Sync {
    async fn deliver(&self, notify: &OrderNotify) -> anyhow::Result<()>;
}

/// Writes each notify to the `audit` log target
#[derive(Debug, Default)]
pub struct LogDelivery;

#[async_trait]
impl NotifyDelivery for LogDelivery {
    async fn deliver(&self, notify: &OrderNotify) -> anyhow::Result<()> {
        crate::audit_log!(
            notify.author_id,
            "notify",
            notify.order_id,
            format!(
                "notify_id={} org_id={} kind={:?} content={}",
                notify.id, notify.org_id, notify.kind, notify.content
            )
        );
        Ok(())
    }
}

/// Background task draining the hub into a delivery sink
pub struct NotifyWorker {
    hub: NotifyHub,
    delivery: Arc<dyn NotifyDelivery>,
    shutdown: CancellationToken,
}

impl NotifyWorker {
    pub fn new(hub: NotifyHub, delivery: Arc<dyn NotifyDelivery>, shutdown: CancellationToken) -> Self {
        Self {
            hub,
            delivery,
            shutdown,
        }
    }

    /// Run until shutdown or until every sender is gone
    pub async fn run(self) {
        let mut rx = self.hub.subscribe();
        drop(self.hub);
        tracing::info!("Notify worker started");

        loop {
            let received = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(notify) => {
                    if let Err(e) = self.delivery.deliver(&notify).await {
                        tracing::warn!(notify_id = notify.id, error = %e, "Notify delivery failed");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Rows are persisted; lagging only loses the push
                    tracing::warn!(skipped, "Notify worker lagged, pushes dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }

        tracing::info!("Notify worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{NotifyKind, NotifyStatus};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<i64>>);

    #[async_trait]
    impl NotifyDelivery for Collect {
        async fn deliver(&self, notify: &OrderNotify) -> anyhow::Result<()> {
            self.0.lock().await.push(notify.id);
            if notify.id == 2 {
                anyhow::bail!("sink unavailable");
            }
            Ok(())
        }
    }

    fn notify(id: i64) -> OrderNotify {
        OrderNotify {
            id,
            order_id: 1,
            org_id: 5,
            kind: NotifyKind::Deposit,
            content: String::new(),
            author_id: 3,
            status: NotifyStatus::Unread,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn delivers_until_shutdown_and_survives_sink_errors() {
        let hub = NotifyHub::new(16);
        let sink = Arc::new(Collect::default());
        let shutdown = CancellationToken::new();
        let worker = NotifyWorker::new(hub.clone(), sink.clone(), shutdown.clone());
        // Subscribe before publishing
        let handle = tokio::spawn(worker.run());
        while hub.publish(notify(0)) == 0 {
            tokio::task::yield_now().await;
        }

        for id in 1..=3 {
            hub.publish(notify(id));
        }
        for _ in 0..100 {
            if sink.0.lock().await.len() >= 4 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();

        let seen = sink.0.lock().await.clone();
        assert!(seen.ends_with(&[1, 2, 3]), "{seen:?}");
    }

    #[tokio::test]
    async fn stops_when_hub_is_dropped() {
        let hub = NotifyHub::new(4);
        let worker = NotifyWorker::new(hub.clone(), Arc::new(LogDelivery), CancellationToken::new());
        let handle = tokio::spawn(worker.run());
        drop(hub);
        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
