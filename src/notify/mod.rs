//! Outbound notifications.
//!
//! Services enqueue [`EmailMessage`]s on a bounded channel and return
//! immediately; a background worker delivers them with retry. A full queue
//! drops the message with a warning rather than blocking the request.

mod email;
mod retry;
pub mod templates;

pub use email::{EmailError, EmailMessage, EmailSender, LogSender, SendGridSender};
pub use retry::{retry_with_backoff, RetryPolicy};

use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Handle for enqueueing email; cheap to clone
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<EmailMessage>,
}

impl Notifier {
    /// Start the delivery worker on the current runtime.
    pub fn spawn(
        sender: Arc<dyn EmailSender>,
        capacity: usize,
        policy: RetryPolicy,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(rx, sender, policy));
        (Self { tx }, handle)
    }

    /// A notifier whose messages go nowhere.
    pub fn disabled() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }

    pub fn enqueue(&self, message: EmailMessage) {
        match self.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                tracing::warn!(
                    to = %message.to,
                    subject = %message.subject,
                    "Notification queue full, dropping email"
                );
            }
            Err(TrySendError::Closed(message)) => {
                tracing::debug!(
                    to = %message.to,
                    subject = %message.subject,
                    "Notification worker not running, dropping email"
                );
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<EmailMessage>,
    sender: Arc<dyn EmailSender>,
    policy: RetryPolicy,
) {
    tracing::info!("Notification worker started");

    while let Some(message) = rx.recv().await {
        let result = retry_with_backoff(&policy, || sender.send(&message)).await;
        if let Err(e) = result {
            tracing::error!(
                error = %e,
                to = %message.to,
                subject = %message.subject,
                attempts = policy.max_retries + 1,
                "Email delivery failed"
            );
        }
    }

    tracing::info!("Notification worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FlakySender {
        failures_left: AtomicU32,
        delivered: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailSender for FlakySender {
        async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(EmailError::InvalidRecipient("flaky".into()));
            }
            self.delivered.lock().await.push(message.clone());
            Ok(())
        }
    }

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "subject".to_string(),
            text: "text".to_string(),
            html: "<p>html</p>".to_string(),
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_worker_retries_until_delivered() {
        let sender = Arc::new(FlakySender {
            failures_left: AtomicU32::new(2),
            ..Default::default()
        });
        let (notifier, handle) = Notifier::spawn(sender.clone(), 8, fast_policy());

        notifier.enqueue(message("a@example.com"));
        notifier.enqueue(message("b@example.com"));
        drop(notifier);
        handle.await.unwrap();

        let delivered = sender.delivered.lock().await;
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].to, "a@example.com");
    }

    #[tokio::test]
    async fn test_disabled_notifier_never_blocks() {
        let notifier = Notifier::disabled();
        for i in 0..10 {
            notifier.enqueue(message(&format!("user{i}@example.com")));
        }
    }
}
