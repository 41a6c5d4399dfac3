use crate::domain::{SessionState, SharedWallet, SigningSession};
use crate::foundation::{NetworkId, PublicKeyHex, SessionId, WalletId};
use log::{debug, info, trace, warn};
use std::sync::Arc;

/// Hooks for wallet and session lifecycle events.
///
/// All methods have no-op defaults so observers implement only what they
/// care about. Observers run synchronously on the mutating path and must
/// not block.
pub trait LifecycleObserver: Send + Sync {
    fn on_identity_registered(&self, _public_key: &PublicKeyHex, _network: NetworkId) {}
    fn on_presence_changed(&self, _public_key: &PublicKeyHex, _is_online: bool) {}
    fn on_wallet_created(&self, _wallet: &SharedWallet) {}
    fn on_wallet_deleted(&self, _wallet_id: &WalletId, _cascaded_sessions: usize) {}
    fn on_session_created(&self, _session: &SigningSession) {}
    fn on_state_changed(&self, _session_id: &SessionId, _old_state: &SessionState, _new_state: &SessionState) {}
    fn on_signature_recorded(&self, _session_id: &SessionId, _signer: &PublicKeyHex, _signed_count: usize) {}
    fn on_threshold_met(&self, _session_id: &SessionId, _signature_count: usize, _threshold: usize) {}
    fn on_session_expired(&self, _session_id: &SessionId) {}
    fn on_session_failed(&self, _session_id: &SessionId, _reason: &str) {}
}

pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {}

pub struct CompositeObserver {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self { observers: Vec::new() }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }
}

impl Default for CompositeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for CompositeObserver {
    fn on_identity_registered(&self, public_key: &PublicKeyHex, network: NetworkId) {
        trace!(
            "on_identity_registered dispatch observer_count={} public_key={} network={}",
            self.observers.len(),
            public_key,
            network
        );
        for observer in &self.observers {
            observer.on_identity_registered(public_key, network);
        }
    }

    fn on_presence_changed(&self, public_key: &PublicKeyHex, is_online: bool) {
        trace!("presence changed public_key={} is_online={}", public_key, is_online);
        for observer in &self.observers {
            observer.on_presence_changed(public_key, is_online);
        }
    }

    fn on_wallet_created(&self, wallet: &SharedWallet) {
        info!(
            "shared wallet created wallet_id={} threshold={} participants={}",
            wallet.wallet_id,
            wallet.threshold,
            wallet.participants.len()
        );
        for observer in &self.observers {
            observer.on_wallet_created(wallet);
        }
    }

    fn on_wallet_deleted(&self, wallet_id: &WalletId, cascaded_sessions: usize) {
        info!("shared wallet deleted wallet_id={} cascaded_sessions={}", wallet_id, cascaded_sessions);
        for observer in &self.observers {
            observer.on_wallet_deleted(wallet_id, cascaded_sessions);
        }
    }

    fn on_session_created(&self, session: &SigningSession) {
        info!(
            "signing session created session_id={} wallet_id={} threshold={}",
            session.session_id, session.wallet_id, session.threshold
        );
        for observer in &self.observers {
            observer.on_session_created(session);
        }
    }

    fn on_state_changed(&self, session_id: &SessionId, old_state: &SessionState, new_state: &SessionState) {
        info!(
            "session state changed session_id={} old_state={} new_state={}",
            session_id,
            old_state.name(),
            new_state.name()
        );
        for observer in &self.observers {
            observer.on_state_changed(session_id, old_state, new_state);
        }
    }

    fn on_signature_recorded(&self, session_id: &SessionId, signer: &PublicKeyHex, signed_count: usize) {
        debug!("partial signature recorded session_id={} signer={} signed_count={}", session_id, signer, signed_count);
        for observer in &self.observers {
            observer.on_signature_recorded(session_id, signer, signed_count);
        }
    }

    fn on_threshold_met(&self, session_id: &SessionId, signature_count: usize, threshold: usize) {
        info!(
            "signature threshold met session_id={} signature_count={} threshold={}",
            session_id, signature_count, threshold
        );
        for observer in &self.observers {
            observer.on_threshold_met(session_id, signature_count, threshold);
        }
    }

    fn on_session_expired(&self, session_id: &SessionId) {
        warn!("session expired session_id={}", session_id);
        for observer in &self.observers {
            observer.on_session_expired(session_id);
        }
    }

    fn on_session_failed(&self, session_id: &SessionId, reason: &str) {
        warn!("session failed session_id={} reason={}", session_id, reason);
        for observer in &self.observers {
            observer.on_session_failed(session_id, reason);
        }
    }
}
