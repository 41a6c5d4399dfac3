use crate::application::lifecycle::LifecycleObserver;
use crate::application::registry::IdentityRegistry;
use crate::domain::{
    can_propose, presence_status, PresenceStatus, SessionState, SharedWallet, SignatureOutcome, SigningSession,
    SpendProposal,
};
use crate::foundation::{
    now_nanos, PublicKeyHex, Result, SessionId, TetherError, WalletId, MAX_WALLET_PARTICIPANTS, MIN_THRESHOLD,
};
use crate::infrastructure::rpc::ChainQuery;
use crate::infrastructure::storage::Storage;
use crate::infrastructure::transport::ProposalBroadcast;
use log::{debug, info, warn};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;

/// A freshly created session plus the advisory broadcast gate.
///
/// `can_propose` is a warning surface for presentation layers: the session
/// exists either way, but broadcasting while participants are unreachable is
/// certain to stall.
#[derive(Clone, Debug)]
pub struct ProposedSpend {
    pub session: SigningSession,
    pub can_propose: bool,
}

/// Outcome of one periodic session sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    /// Sessions whose threshold held once presence was re-checked, typically
    /// after a signer reconnected with all signatures already in.
    pub completed: usize,
}

/// Owns shared wallets and the in-flight signing sessions over them.
///
/// All session state transitions are synchronous in-memory updates persisted
/// through `Storage`; the only suspending operations are the balance fetch
/// and the proposal broadcast, both delegated to collaborator traits.
pub struct SharedWalletCoordinator {
    storage: Arc<dyn Storage>,
    registry: Arc<IdentityRegistry>,
    chain: Arc<dyn ChainQuery>,
    broadcast: Arc<dyn ProposalBroadcast>,
    observer: Arc<dyn LifecycleObserver>,
    session_timeout_nanos: u64,
}

impl SharedWalletCoordinator {
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: Arc<IdentityRegistry>,
        chain: Arc<dyn ChainQuery>,
        broadcast: Arc<dyn ProposalBroadcast>,
        observer: Arc<dyn LifecycleObserver>,
        session_timeout_nanos: u64,
    ) -> Self {
        Self { storage, registry, chain, broadcast, observer, session_timeout_nanos }
    }

    /// Creates a wallet after validating the participant set.
    ///
    /// The participant set is immutable afterwards; changing membership
    /// means creating a new wallet. Every participant key is registered so
    /// later presence lookups resolve.
    pub fn create(&self, participants: Vec<String>, threshold: u16) -> Result<SharedWallet> {
        if participants.is_empty() {
            return Err(TetherError::EmptyParticipants);
        }
        if participants.len() > MAX_WALLET_PARTICIPANTS {
            return Err(TetherError::InvalidThreshold { threshold, participants: participants.len() });
        }
        if threshold < MIN_THRESHOLD || usize::from(threshold) > participants.len() {
            return Err(TetherError::InvalidThreshold { threshold, participants: participants.len() });
        }

        let mut keys: Vec<PublicKeyHex> = Vec::with_capacity(participants.len());
        for raw in &participants {
            let key = PublicKeyHex::parse(raw)?;
            if keys.contains(&key) {
                return Err(TetherError::DuplicateParticipant(key.to_string()));
            }
            keys.push(key);
        }
        for key in &keys {
            self.registry.find_or_create(key.as_str())?;
        }

        let now = now_nanos();
        let wallet = SharedWallet {
            wallet_id: new_wallet_id(&keys, threshold),
            network: self.registry.network(),
            participants: keys,
            threshold,
            balance_sompi: 0,
            created_at_nanos: now,
            updated_at_nanos: now,
        };
        self.storage.upsert_wallet(wallet.clone())?;
        self.observer.on_wallet_created(&wallet);
        Ok(wallet)
    }

    pub fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<SharedWallet>> {
        self.storage.get_wallet(wallet_id)
    }

    pub fn list_wallets(&self) -> Result<Vec<SharedWallet>> {
        self.storage.list_wallets(self.registry.network())
    }

    /// Fetches the aggregated on-chain balance and caches it on the wallet.
    ///
    /// Advisory only; a stale or failed balance never gates signing. A fetch
    /// error is returned to the caller with the stored balance untouched.
    pub async fn refresh_balance(&self, wallet_id: &WalletId) -> Result<u64> {
        let mut wallet = self.require_wallet(wallet_id)?;
        let balance = self.chain.wallet_balance_sompi(&wallet).await?;
        wallet.balance_sompi = balance;
        wallet.updated_at_nanos = now_nanos();
        self.storage.upsert_wallet(wallet)?;
        debug!("wallet balance refreshed wallet_id={} balance_sompi={}", wallet_id, balance);
        Ok(balance)
    }

    /// Removes the wallet and cancels every non-terminal session on it.
    ///
    /// Cancellation is recorded as `failed`, so a late partial signature for
    /// a cancelled session is discarded by the terminal-state check.
    pub fn delete(&self, wallet_id: &WalletId) -> Result<usize> {
        self.require_wallet(wallet_id)?;
        let mut cascaded = 0;
        for mut session in self.storage.list_sessions_for_wallet(wallet_id)? {
            if session.state.is_terminal() {
                continue;
            }
            let old_state = session.state.clone();
            session.transition(SessionState::Failed { reason: "wallet deleted".to_string() })?;
            self.storage.update_session(&session)?;
            self.observer.on_state_changed(&session.session_id, &old_state, &session.state);
            self.observer.on_session_failed(&session.session_id, "wallet deleted");
            cascaded += 1;
        }
        self.storage.delete_wallet(wallet_id)?;
        self.observer.on_wallet_deleted(wallet_id, cascaded);
        Ok(cascaded)
    }

    /// Creates a signing session in `proposed` state.
    ///
    /// Participants and threshold are copied from the wallet. The returned
    /// `can_propose` flag reports whether enough participants are `Online`
    /// right now: all of them under a unanimous policy, at least `threshold`
    /// otherwise.
    pub fn propose_spend(&self, wallet_id: &WalletId, proposal: SpendProposal) -> Result<ProposedSpend> {
        let wallet = self.require_wallet(wallet_id)?;
        let now = now_nanos();
        let session = SigningSession::new(
            new_session_id(wallet_id, now),
            &wallet,
            proposal,
            now,
            now.saturating_add(self.session_timeout_nanos),
        );
        self.storage.insert_session(session.clone())?;
        self.observer.on_session_created(&session);

        let online_count = self.online_participant_count(&wallet)?;
        let can_propose = can_propose(wallet.threshold, wallet.participants.len(), online_count);
        if !can_propose {
            warn!(
                "proposal gated by presence session_id={} online_count={} participants={} threshold={}",
                session.session_id,
                online_count,
                wallet.participants.len(),
                wallet.threshold
            );
        }
        Ok(ProposedSpend { session, can_propose })
    }

    /// Publishes the proposal to participants and moves the session to
    /// `collecting`. A broadcast failure is returned to the caller with the
    /// session left in `proposed`; a transient network blip is never a
    /// destructive failure.
    pub async fn broadcast_proposal(&self, session_id: &SessionId) -> Result<SigningSession> {
        let mut session = self.require_session(session_id)?;
        if session.state != SessionState::Proposed {
            return Err(TetherError::InvalidStateTransition {
                from: session.state.name().to_string(),
                to: SessionState::Collecting.name().to_string(),
            });
        }
        let now = now_nanos();
        if session.is_expired(now) {
            let expired_at = session.expires_at_nanos;
            self.expire_session(&mut session)?;
            return Err(TetherError::SessionExpired { expired_at, current_time: now });
        }
        self.broadcast.publish_proposal(&session).await?;
        let old_state = session.state.clone();
        session.transition(SessionState::Collecting)?;
        self.storage.update_session(&session)?;
        self.observer.on_state_changed(session_id, &old_state, &session.state);
        Ok(session)
    }

    /// Records a partial signature from one participant.
    ///
    /// Protocol-level rejections (duplicate, late, pre-broadcast) come back
    /// as `SignatureOutcome` rather than errors. Completion re-validates
    /// presence at this very moment: the session completes only when at
    /// least `threshold` signatures belong to participants currently
    /// `online` or `recently_online`. A duplicate submission records
    /// nothing but still re-evaluates completion, since the signer's
    /// reachability may have changed since the first copy arrived.
    pub fn record_partial_signature(&self, session_id: &SessionId, signer: &PublicKeyHex) -> Result<SignatureOutcome> {
        let mut session = self.require_session(session_id)?;
        if session.state.is_terminal() {
            debug!("signature discarded for terminal session session_id={} signer={}", session_id, signer);
            return Ok(SignatureOutcome::DiscardedTerminal);
        }
        let now = now_nanos();
        if session.is_expired(now) {
            self.expire_session(&mut session)?;
            return Ok(SignatureOutcome::Expired);
        }
        if session.state == SessionState::Proposed {
            return Ok(SignatureOutcome::NotCollecting);
        }

        {
            let participant = session
                .participant_mut(signer)
                .ok_or_else(|| TetherError::UnknownParticipant(signer.to_string()))?;
            if participant.has_partial_signature {
                self.evaluate_session(&mut session)?;
                return Ok(SignatureOutcome::AlreadyRecorded);
            }
            participant.has_partial_signature = true;
            participant.signed_at_nanos = Some(now);
        }
        self.storage.update_session(&session)?;
        self.observer.on_signature_recorded(session_id, signer, session.signed_count());

        let completed = self.evaluate_session(&mut session)?;
        Ok(SignatureOutcome::Accepted { completed })
    }

    /// Explicit rejection by a participant. Terminal.
    pub fn reject(&self, session_id: &SessionId, signer: &PublicKeyHex, reason: &str) -> Result<SigningSession> {
        let session = self.require_session(session_id)?;
        if session.participant(signer).is_none() {
            return Err(TetherError::UnknownParticipant(signer.to_string()));
        }
        self.fail(session_id, &format!("rejected by {}: {}", signer, reason))
    }

    /// Moves a non-terminal session to `failed`. Terminal.
    pub fn fail(&self, session_id: &SessionId, reason: &str) -> Result<SigningSession> {
        let mut session = self.require_session(session_id)?;
        if session.state.is_terminal() {
            return Err(TetherError::SessionTerminal { state: session.state.name().to_string() });
        }
        let old_state = session.state.clone();
        session.transition(SessionState::Failed { reason: reason.to_string() })?;
        self.storage.update_session(&session)?;
        self.observer.on_state_changed(session_id, &old_state, &session.state);
        self.observer.on_session_failed(session_id, reason);
        Ok(session)
    }

    /// Reads a session, re-evaluating it first: lazy expiry, and completion
    /// in case a signer became reachable again since the last signature.
    pub fn get_session(&self, session_id: &SessionId) -> Result<Option<SigningSession>> {
        let Some(mut session) = self.storage.get_session(session_id)? else {
            return Ok(None);
        };
        self.evaluate_session(&mut session)?;
        Ok(Some(session))
    }

    pub fn list_sessions_for_wallet(&self, wallet_id: &WalletId) -> Result<Vec<SigningSession>> {
        self.storage.list_sessions_for_wallet(wallet_id)
    }

    /// Periodic sweep over open sessions: marks overdue ones `expired` and
    /// completes any whose threshold holds under current presence.
    ///
    /// The same evaluation runs lazily on every read; the sweep keeps
    /// observers current without requiring one.
    pub fn sweep_sessions(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        for mut session in self.storage.list_open_sessions()? {
            if self.evaluate_session(&mut session)? {
                report.completed += 1;
            } else if session.state == SessionState::Expired {
                report.expired += 1;
            }
        }
        if report != SweepReport::default() {
            info!("session sweep expired={} completed={}", report.expired, report.completed);
        }
        Ok(report)
    }

    /// Re-evaluates one session against the clock and current presence.
    ///
    /// Expiry wins over completion. Returns whether the session moved to
    /// `completed` during this call; a session a signer walked away from
    /// with all signatures in completes here once that signer is reachable
    /// again.
    fn evaluate_session(&self, session: &mut SigningSession) -> Result<bool> {
        if session.state.is_terminal() {
            return Ok(false);
        }
        if session.is_expired(now_nanos()) {
            self.expire_session(session)?;
            return Ok(false);
        }
        if session.state != SessionState::Collecting {
            return Ok(false);
        }
        let presences = self.presence_snapshot(session)?;
        if !session.threshold_met(|key| presences.get(key).copied().unwrap_or(PresenceStatus::Unknown)) {
            return Ok(false);
        }
        let old_state = session.state.clone();
        session.transition(SessionState::Completed)?;
        self.storage.update_session(session)?;
        self.observer.on_threshold_met(&session.session_id, session.signed_count(), usize::from(session.threshold));
        self.observer.on_state_changed(&session.session_id, &old_state, &session.state);
        Ok(true)
    }

    fn expire_session(&self, session: &mut SigningSession) -> Result<()> {
        let old_state = session.state.clone();
        session.transition(SessionState::Expired)?;
        self.storage.update_session(session)?;
        self.observer.on_state_changed(&session.session_id, &old_state, &session.state);
        self.observer.on_session_expired(&session.session_id);
        Ok(())
    }

    fn online_participant_count(&self, wallet: &SharedWallet) -> Result<usize> {
        let mut online = 0;
        for key in &wallet.participants {
            if self.registry.online_status(key)? == PresenceStatus::Online {
                online += 1;
            }
        }
        Ok(online)
    }

    fn presence_snapshot(&self, session: &SigningSession) -> Result<HashMap<PublicKeyHex, PresenceStatus>> {
        let now = now_nanos();
        let mut snapshot = HashMap::with_capacity(session.participants.len());
        for participant in &session.participants {
            let identity = self.registry.get(&participant.public_key)?;
            snapshot.insert(participant.public_key.clone(), presence_status(identity.as_ref(), now));
        }
        Ok(snapshot)
    }

    fn require_wallet(&self, wallet_id: &WalletId) -> Result<SharedWallet> {
        let wallet =
            self.storage.get_wallet(wallet_id)?.ok_or_else(|| TetherError::WalletNotFound(wallet_id.to_string()))?;
        if wallet.network != self.registry.network() {
            return Err(TetherError::NetworkMismatch {
                expected: self.registry.network().to_string(),
                actual: wallet.network.to_string(),
            });
        }
        Ok(wallet)
    }

    fn require_session(&self, session_id: &SessionId) -> Result<SigningSession> {
        self.storage.get_session(session_id)?.ok_or_else(|| TetherError::SessionNotFound(session_id.to_string()))
    }
}

fn new_wallet_id(participants: &[PublicKeyHex], threshold: u16) -> WalletId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"tether.wallet.v1");
    hasher.update(&threshold.to_le_bytes());
    for key in participants {
        hasher.update(key.as_str().as_bytes());
    }
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);
    hasher.update(&nonce);
    WalletId::new(*hasher.finalize().as_bytes())
}

fn new_session_id(wallet_id: &WalletId, now_nanos: u64) -> SessionId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"tether.session.v1");
    hasher.update(wallet_id.as_ref());
    hasher.update(&now_nanos.to_le_bytes());
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);
    hasher.update(&nonce);
    SessionId::new(*hasher.finalize().as_bytes())
}
