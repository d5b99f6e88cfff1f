use crate::domain::notification::WelcomeNotification;
use crate::{CoreError, NotificationDispatcher, NotificationQueue};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// In-memory implementation of the NotificationQueue port using a Tokio channel.
/// Enqueueing never blocks; a worker task drains the receiving side.
#[derive(Debug, Clone)]
pub struct InMemoryNotificationQueue {
    sender: UnboundedSender<WelcomeNotification>,
}

impl InMemoryNotificationQueue {
    /// Creates the queue together with the receiver a worker should consume.
    pub fn channel() -> (Self, UnboundedReceiver<WelcomeNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationQueue for InMemoryNotificationQueue {
    fn enqueue(&self, job: WelcomeNotification) -> Result<(), CoreError> {
        self.sender
            .send(job)
            .map_err(|e| CoreError::Internal(format!("Notification worker is gone: {}", e)))
    }
}

/// Drains the queue until every sender is dropped. A failed dispatch only affects
/// that one notification.
pub async fn run_notification_worker(
    mut receiver: UnboundedReceiver<WelcomeNotification>,
    dispatcher: Arc<dyn NotificationDispatcher>,
) {
    while let Some(job) = receiver.recv().await {
        match dispatcher.dispatch(&job).await {
            Ok(()) => info!(tenant_id = %job.tenant_id, "Welcome notification dispatched"),
            Err(e) => warn!(
                tenant_id = %job.tenant_id,
                "Welcome notification dropped: {}", e
            ),
        }
    }
    info!("Notification worker stopped");
}

pub fn spawn_notification_worker(
    receiver: UnboundedReceiver<WelcomeNotification>,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> JoinHandle<()> {
    tokio::spawn(run_notification_worker(receiver, dispatcher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingDispatcher {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingDispatcher {
        async fn dispatch(&self, job: &WelcomeNotification) -> Result<(), CoreError> {
            if job.tenant_id == "broken" {
                return Err(CoreError::Internal("smtp down".into()));
            }
            self.seen.lock().await.push(job.tenant_id.clone());
            Ok(())
        }
    }

    fn job(tenant_id: &str) -> WelcomeNotification {
        WelcomeNotification {
            tenant_id: tenant_id.to_string(),
            tenant_name: "Acme Co".to_string(),
            admin_email: "a@acme.io".to_string(),
            subscription_expiry: Utc::now(),
            site_url: "https://prod.abcd.com/acme-co".to_string(),
        }
    }

    #[tokio::test]
    async fn test_worker_dispatches_and_survives_failures() {
        let (queue, receiver) = InMemoryNotificationQueue::channel();
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let handle = spawn_notification_worker(receiver, dispatcher.clone());

        queue.enqueue(job("acme")).unwrap();
        queue.enqueue(job("broken")).unwrap();
        queue.enqueue(job("globex")).unwrap();
        drop(queue);

        handle.await.unwrap();
        assert_eq!(*dispatcher.seen.lock().await, vec!["acme", "globex"]);
    }

    #[tokio::test]
    async fn test_enqueue_without_worker_fails() {
        let (queue, receiver) = InMemoryNotificationQueue::channel();
        drop(receiver);
        let result = queue.enqueue(job("acme"));
        assert!(matches!(result, Err(CoreError::Internal(_))));
    }
}
