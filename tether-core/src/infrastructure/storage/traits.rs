use crate::domain::{Contact, Identity, SharedWallet, SigningSession};
use crate::foundation::TetherError;
use crate::foundation::{ContactId, NetworkId, PeerId, PublicKeyHex, SessionId, WalletId};

pub type Result<T> = std::result::Result<T, TetherError>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub identities: u64,
    pub wallets: u64,
    pub sessions: u64,
    pub open_sessions: u64,
    pub contacts: u64,
}

/// Durable record store for the core.
///
/// Identities are keyed by `(network, normalized public key)`, wallets and
/// sessions by their ids, contacts by contact id. All records survive
/// process restart when backed by `RocksStorage`.
pub trait Storage: Send + Sync {
    fn upsert_identity(&self, identity: Identity) -> Result<()>;
    fn get_identity(&self, network: NetworkId, public_key: &PublicKeyHex) -> Result<Option<Identity>>;
    /// Peer ids are transport-scoped and reusable; this resolves only
    /// identities whose current binding matches.
    fn find_identity_by_peer(&self, network: NetworkId, peer_id: &PeerId) -> Result<Option<Identity>>;
    fn list_identities(&self, network: NetworkId) -> Result<Vec<Identity>>;

    fn upsert_wallet(&self, wallet: SharedWallet) -> Result<()>;
    fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<SharedWallet>>;
    /// Returns `Ok(true)` if the wallet existed and was removed.
    fn delete_wallet(&self, wallet_id: &WalletId) -> Result<bool>;
    fn list_wallets(&self, network: NetworkId) -> Result<Vec<SharedWallet>>;

    fn insert_session(&self, session: SigningSession) -> Result<()>;
    fn update_session(&self, session: &SigningSession) -> Result<()>;
    fn get_session(&self, session_id: &SessionId) -> Result<Option<SigningSession>>;
    fn list_sessions_for_wallet(&self, wallet_id: &WalletId) -> Result<Vec<SigningSession>>;
    /// Sessions in a non-terminal state, for sweeps and cascade cancellation.
    fn list_open_sessions(&self) -> Result<Vec<SigningSession>>;

    fn upsert_contact(&self, contact: Contact) -> Result<()>;
    fn get_contact(&self, contact_id: &ContactId) -> Result<Option<Contact>>;
    fn list_contacts(&self) -> Result<Vec<Contact>>;

    fn storage_stats(&self) -> Result<StorageStats>;

    fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
