//! Mock mail sender for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::notify::{MailError, MailMessage, MailSender};

/// Mock implementation of the MailSender trait.
///
/// Records delivered messages; can be switched to fail every send.
#[derive(Debug)]
pub struct MockMailSender {
    sent: Arc<RwLock<Vec<MailMessage>>>,
    attempts: Arc<RwLock<usize>>,
    failing: Arc<RwLock<bool>>,
}

impl Default for MockMailSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMailSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
            attempts: Arc::new(RwLock::new(0)),
            failing: Arc::new(RwLock::new(false)),
        }
    }

    /// Make every following send fail.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    /// Messages delivered successfully.
    pub async fn sent_messages(&self) -> Vec<MailMessage> {
        self.sent.read().await.clone()
    }

    /// Send calls, successful or not.
    pub async fn attempt_count(&self) -> usize {
        *self.attempts.read().await
    }
}

#[async_trait]
impl MailSender for MockMailSender {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        *self.attempts.write().await += 1;

        if *self.failing.read().await {
            return Err(MailError::Api {
                status: 503,
                message: "mock mail failure".to_string(),
            });
        }

        self.sent.write().await.push(message.clone());
        Ok(())
    }
}
