use crate::domain::SigningSession;
use crate::foundation::{SessionId, TetherError};
use crate::infrastructure::transport::ProposalBroadcast;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// In-process broadcast recorder for tests.
///
/// Records every published session id and can be armed to fail the next
/// publication, to exercise the "broadcast failed, state unchanged" path.
pub struct MockBroadcast {
    published: Mutex<Vec<SessionId>>,
    fail_next: AtomicBool,
}

impl MockBroadcast {
    pub fn new() -> Self {
        Self { published: Mutex::new(Vec::new()), fail_next: AtomicBool::new(false) }
    }

    pub fn fail_next_publish(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub async fn published_sessions(&self) -> Vec<SessionId> {
        self.published.lock().await.clone()
    }
}

impl Default for MockBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProposalBroadcast for MockBroadcast {
    async fn publish_proposal(&self, session: &SigningSession) -> Result<(), TetherError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TetherError::NetworkError {
                operation: "publish_proposal".to_string(),
                details: "mock transport failure".to_string(),
            });
        }
        self.published.lock().await.push(session.session_id);
        Ok(())
    }
}
