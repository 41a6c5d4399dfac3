use crate::domain::SigningSession;
use crate::foundation::TetherError;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, TetherError>;

/// Outbound seam to the P2P layer.
///
/// The wire protocol (gossip topics, envelopes, signatures) is owned by the
/// network layer; this core hands over the session and only cares whether
/// publication succeeded. On timeout the caller fails the specific session,
/// never retries at an unbounded rate.
#[async_trait]
pub trait ProposalBroadcast: Send + Sync {
    async fn publish_proposal(&self, session: &SigningSession) -> Result<()>;
}
