use crate::domain::{Contact, Identity, SharedWallet, SigningSession};
use crate::foundation::TetherError;
use crate::foundation::{ContactId, NetworkId, PeerId, PublicKeyHex, SessionId, WalletId};
use crate::infrastructure::storage::{Storage, StorageStats};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct MemoryInner {
    identities: HashMap<(u8, PublicKeyHex), Identity>,
    wallets: HashMap<WalletId, SharedWallet>,
    sessions: HashMap<SessionId, SigningSession>,
    contacts: HashMap<ContactId, Contact>,
}

impl MemoryInner {
    fn new() -> Self {
        Self { identities: HashMap::new(), wallets: HashMap::new(), sessions: HashMap::new(), contacts: HashMap::new() }
    }
}

pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryInner::new())) }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, MemoryInner>, TetherError> {
        self.inner.lock().map_err(|_| TetherError::StorageLockPoisoned { operation: "memory storage lock".to_string() })
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn upsert_identity(&self, identity: Identity) -> Result<(), TetherError> {
        let key = (identity.network.tag(), identity.public_key.clone());
        self.lock_inner()?.identities.insert(key, identity);
        Ok(())
    }

    fn get_identity(&self, network: NetworkId, public_key: &PublicKeyHex) -> Result<Option<Identity>, TetherError> {
        Ok(self.lock_inner()?.identities.get(&(network.tag(), public_key.clone())).cloned())
    }

    fn find_identity_by_peer(&self, network: NetworkId, peer_id: &PeerId) -> Result<Option<Identity>, TetherError> {
        let inner = self.lock_inner()?;
        Ok(inner
            .identities
            .values()
            .find(|identity| identity.network == network && identity.peer_id.as_ref() == Some(peer_id))
            .cloned())
    }

    fn list_identities(&self, network: NetworkId) -> Result<Vec<Identity>, TetherError> {
        let inner = self.lock_inner()?;
        let mut identities: Vec<Identity> = inner.identities.values().filter(|i| i.network == network).cloned().collect();
        identities.sort_by(|a, b| a.public_key.cmp(&b.public_key));
        Ok(identities)
    }

    fn upsert_wallet(&self, wallet: SharedWallet) -> Result<(), TetherError> {
        self.lock_inner()?.wallets.insert(wallet.wallet_id, wallet);
        Ok(())
    }

    fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<SharedWallet>, TetherError> {
        Ok(self.lock_inner()?.wallets.get(wallet_id).cloned())
    }

    fn delete_wallet(&self, wallet_id: &WalletId) -> Result<bool, TetherError> {
        Ok(self.lock_inner()?.wallets.remove(wallet_id).is_some())
    }

    fn list_wallets(&self, network: NetworkId) -> Result<Vec<SharedWallet>, TetherError> {
        let inner = self.lock_inner()?;
        let mut wallets: Vec<SharedWallet> = inner.wallets.values().filter(|w| w.network == network).cloned().collect();
        wallets.sort_by_key(|w| w.created_at_nanos);
        Ok(wallets)
    }

    fn insert_session(&self, session: SigningSession) -> Result<(), TetherError> {
        self.lock_inner()?.sessions.insert(session.session_id, session);
        Ok(())
    }

    fn update_session(&self, session: &SigningSession) -> Result<(), TetherError> {
        let mut inner = self.lock_inner()?;
        if !inner.sessions.contains_key(&session.session_id) {
            return Err(TetherError::SessionNotFound(session.session_id.to_string()));
        }
        inner.sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    fn get_session(&self, session_id: &SessionId) -> Result<Option<SigningSession>, TetherError> {
        Ok(self.lock_inner()?.sessions.get(session_id).cloned())
    }

    fn list_sessions_for_wallet(&self, wallet_id: &WalletId) -> Result<Vec<SigningSession>, TetherError> {
        let inner = self.lock_inner()?;
        let mut sessions: Vec<SigningSession> = inner.sessions.values().filter(|s| &s.wallet_id == wallet_id).cloned().collect();
        sessions.sort_by_key(|s| s.created_at_nanos);
        Ok(sessions)
    }

    fn list_open_sessions(&self) -> Result<Vec<SigningSession>, TetherError> {
        let inner = self.lock_inner()?;
        let mut sessions: Vec<SigningSession> = inner.sessions.values().filter(|s| !s.state.is_terminal()).cloned().collect();
        sessions.sort_by_key(|s| s.created_at_nanos);
        Ok(sessions)
    }

    fn upsert_contact(&self, contact: Contact) -> Result<(), TetherError> {
        self.lock_inner()?.contacts.insert(contact.contact_id.clone(), contact);
        Ok(())
    }

    fn get_contact(&self, contact_id: &ContactId) -> Result<Option<Contact>, TetherError> {
        Ok(self.lock_inner()?.contacts.get(contact_id).cloned())
    }

    fn list_contacts(&self) -> Result<Vec<Contact>, TetherError> {
        let inner = self.lock_inner()?;
        let mut contacts: Vec<Contact> = inner.contacts.values().cloned().collect();
        contacts.sort_by(|a, b| a.contact_id.as_str().cmp(b.contact_id.as_str()));
        Ok(contacts)
    }

    fn storage_stats(&self) -> Result<StorageStats, TetherError> {
        let inner = self.lock_inner()?;
        Ok(StorageStats {
            identities: inner.identities.len() as u64,
            wallets: inner.wallets.len() as u64,
            sessions: inner.sessions.len() as u64,
            open_sessions: inner.sessions.values().filter(|s| !s.state.is_terminal()).count() as u64,
            contacts: inner.contacts.len() as u64,
        })
    }
}
