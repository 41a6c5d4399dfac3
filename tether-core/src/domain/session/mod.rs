mod state;

pub use state::{ensure_valid_transition, is_valid_transition, SessionState};

use crate::domain::model::{SharedWallet, SpendProposal};
use crate::domain::presence::PresenceStatus;
use crate::foundation::{PublicKeyHex, SessionId, TetherError, WalletId};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Per-participant signature bookkeeping within one session.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SessionParticipant {
    pub public_key: PublicKeyHex,
    pub has_partial_signature: bool,
    pub signed_at_nanos: Option<u64>,
}

/// Result of submitting a partial signature to a session.
///
/// Protocol-level rejections are outcomes, not errors: they are recorded on
/// the session for later observation by presentation layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureOutcome {
    Accepted { completed: bool },
    /// Duplicate submission; signatures are idempotent per participant.
    AlreadyRecorded,
    /// The session has not been broadcast yet.
    NotCollecting,
    /// Late arrival after a terminal state; the signature is discarded.
    DiscardedTerminal,
    /// Expiry was observed at submission time.
    Expired,
}

/// Whether a spend proposal is worth broadcasting right now.
///
/// With a unanimous policy (threshold == N) every participant must be
/// `Online`; otherwise at least `threshold` participants must be. This is a
/// warning surface, not a hard gate: callers may still create the session.
pub fn can_propose(threshold: u16, participant_count: usize, online_count: usize) -> bool {
    if usize::from(threshold) >= participant_count {
        online_count == participant_count
    } else {
        online_count >= usize::from(threshold)
    }
}

/// One in-flight attempt to authorize a spend from a shared wallet.
///
/// Participants and threshold are copied from the wallet at creation time so
/// the session stays self-contained even if the wallet is later deleted.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SigningSession {
    pub session_id: SessionId,
    pub wallet_id: WalletId,
    pub proposal: SpendProposal,
    pub participants: Vec<SessionParticipant>,
    pub threshold: u16,
    pub state: SessionState,
    pub created_at_nanos: u64,
    pub expires_at_nanos: u64,
}

impl SigningSession {
    pub fn new(session_id: SessionId, wallet: &SharedWallet, proposal: SpendProposal, now_nanos: u64, expires_at_nanos: u64) -> Self {
        let participants = wallet
            .participants
            .iter()
            .map(|key| SessionParticipant { public_key: key.clone(), has_partial_signature: false, signed_at_nanos: None })
            .collect();
        Self {
            session_id,
            wallet_id: wallet.wallet_id,
            proposal,
            participants,
            threshold: wallet.threshold,
            state: SessionState::Proposed,
            created_at_nanos: now_nanos,
            expires_at_nanos,
        }
    }

    pub fn is_expired(&self, now_nanos: u64) -> bool {
        now_nanos > self.expires_at_nanos
    }

    pub fn participant(&self, key: &PublicKeyHex) -> Option<&SessionParticipant> {
        self.participants.iter().find(|p| &p.public_key == key)
    }

    pub fn participant_mut(&mut self, key: &PublicKeyHex) -> Option<&mut SessionParticipant> {
        self.participants.iter_mut().find(|p| &p.public_key == key)
    }

    pub fn signed_count(&self) -> usize {
        self.participants.iter().filter(|p| p.has_partial_signature).count()
    }

    /// Count signatures from participants who are reachable *right now*.
    ///
    /// Presence is re-validated at the moment of threshold evaluation; a
    /// partial signature from a peer that has since dropped off is retained
    /// but does not count until connectivity is re-established.
    pub fn reachable_signed_count(&self, presence_of: impl Fn(&PublicKeyHex) -> PresenceStatus) -> usize {
        self.participants
            .iter()
            .filter(|p| p.has_partial_signature && presence_of(&p.public_key).is_reachable())
            .count()
    }

    pub fn threshold_met(&self, presence_of: impl Fn(&PublicKeyHex) -> PresenceStatus) -> bool {
        self.reachable_signed_count(presence_of) >= usize::from(self.threshold)
    }

    /// Apply a state transition, enforcing the transition table.
    pub fn transition(&mut self, next: SessionState) -> Result<(), TetherError> {
        if let Err(err) = ensure_valid_transition(&self.state, &next) {
            warn!(
                "invalid session state transition session_id={} from_state={} to_state={} error={}",
                self.session_id, self.state, next, err
            );
            return Err(err);
        }
        info!("session state transition session_id={} from_state={} to_state={}", self.session_id, self.state, next);
        self.state = next;
        Ok(())
    }
}
