use crate::application::registry::IdentityRegistry;
use crate::domain::{can_propose, presence_status, Contact, Identity, PresenceStatus, SharedWallet};
use crate::foundation::{now_nanos, ContactId, PublicKeyHex, Result, TetherError, WalletId};
use crate::infrastructure::storage::Storage;
use std::sync::Arc;

/// External ledger collaborator used to annotate contact views with how
/// many transactions involve a given key.
pub trait TransactionLedger: Send + Sync {
    fn transaction_count(&self, public_key: &PublicKeyHex) -> Result<u64>;
}

/// Ledger stub for hosts without transaction history.
pub struct EmptyLedger;

impl TransactionLedger for EmptyLedger {
    fn transaction_count(&self, _public_key: &PublicKeyHex) -> Result<u64> {
        Ok(0)
    }
}

/// Contact with its resolved identity and live presence.
#[derive(Clone, Debug)]
pub struct ContactView {
    pub contact: Contact,
    pub identity: Option<Identity>,
    pub presence: PresenceStatus,
    /// Shared wallets whose participant set includes this contact's identity.
    pub shared_wallets: Vec<SharedWallet>,
    pub transaction_count: u64,
}

/// One resolved participant within a shared-wallet view.
#[derive(Clone, Debug)]
pub struct ParticipantView {
    pub public_key: PublicKeyHex,
    pub identity: Option<Identity>,
    pub contact: Option<Contact>,
    pub presence: PresenceStatus,
    pub is_local: bool,
}

/// Shared wallet with resolved, presence-annotated participants.
#[derive(Clone, Debug)]
pub struct SharedWalletView {
    pub wallet: SharedWallet,
    pub participants: Vec<ParticipantView>,
    pub online_count: usize,
    pub can_propose: bool,
}

/// Directory entry for an advertised signer.
#[derive(Clone, Debug)]
pub struct SignerView {
    pub identity: Identity,
    pub contact: Option<Contact>,
    pub presence: PresenceStatus,
}

/// Read-only projections over the registry, wallet store and contact store.
///
/// Facades hold no state of their own and re-derive on every read, so they
/// can never drift from their sources. They never mutate the registry or the
/// coordinator; all writes flow through the named entry points on those
/// components.
pub struct Views {
    storage: Arc<dyn Storage>,
    registry: Arc<IdentityRegistry>,
    ledger: Arc<dyn TransactionLedger>,
    /// Public key of the local user, when known, for `is_local` annotation.
    local_key: Option<PublicKeyHex>,
}

impl Views {
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: Arc<IdentityRegistry>,
        ledger: Arc<dyn TransactionLedger>,
        local_key: Option<PublicKeyHex>,
    ) -> Self {
        Self { storage, registry, ledger, local_key }
    }

    pub fn contact_view(&self, contact_id: &ContactId) -> Result<ContactView> {
        let contact = self
            .storage
            .get_contact(contact_id)?
            .ok_or_else(|| TetherError::ContactNotFound(contact_id.to_string()))?;
        self.project_contact(contact)
    }

    pub fn contact_views(&self) -> Result<Vec<ContactView>> {
        self.storage.list_contacts()?.into_iter().map(|contact| self.project_contact(contact)).collect()
    }

    pub fn wallet_view(&self, wallet_id: &WalletId) -> Result<SharedWalletView> {
        let wallet =
            self.storage.get_wallet(wallet_id)?.ok_or_else(|| TetherError::WalletNotFound(wallet_id.to_string()))?;
        self.project_wallet(wallet)
    }

    pub fn wallet_views(&self) -> Result<Vec<SharedWalletView>> {
        self.storage
            .list_wallets(self.registry.network())?
            .into_iter()
            .map(|wallet| self.project_wallet(wallet))
            .collect()
    }

    /// Every identity currently advertising signer capabilities.
    pub fn signer_views(&self) -> Result<Vec<SignerView>> {
        let now = now_nanos();
        let contacts = self.storage.list_contacts()?;
        let mut views = Vec::new();
        for identity in self.registry.list_identities()? {
            if identity.signer.is_none() {
                continue;
            }
            let presence = presence_status(Some(&identity), now);
            let contact = contact_for(&contacts, &identity.public_key);
            views.push(SignerView { identity, contact, presence });
        }
        Ok(views)
    }

    fn project_contact(&self, contact: Contact) -> Result<ContactView> {
        let now = now_nanos();
        let identity = match contact.identity_key.as_ref() {
            Some(key) => self.registry.get(key)?,
            None => None,
        };
        let presence = presence_status(identity.as_ref(), now);
        let (shared_wallets, transaction_count) = match contact.identity_key.as_ref() {
            Some(key) => {
                let wallets = self
                    .storage
                    .list_wallets(self.registry.network())?
                    .into_iter()
                    .filter(|wallet| wallet.participants.contains(key))
                    .collect();
                (wallets, self.ledger.transaction_count(key)?)
            }
            None => (Vec::new(), 0),
        };
        Ok(ContactView { contact, identity, presence, shared_wallets, transaction_count })
    }

    fn project_wallet(&self, wallet: SharedWallet) -> Result<SharedWalletView> {
        let now = now_nanos();
        let contacts = self.storage.list_contacts()?;
        let mut participants = Vec::with_capacity(wallet.participants.len());
        let mut online_count = 0;
        for key in &wallet.participants {
            let identity = self.registry.get(key)?;
            let presence = presence_status(identity.as_ref(), now);
            if presence == PresenceStatus::Online {
                online_count += 1;
            }
            participants.push(ParticipantView {
                public_key: key.clone(),
                identity,
                contact: contact_for(&contacts, key),
                presence,
                is_local: self.local_key.as_ref() == Some(key),
            });
        }
        let can_propose = can_propose(wallet.threshold, wallet.participants.len(), online_count);
        Ok(SharedWalletView { wallet, participants, online_count, can_propose })
    }
}

fn contact_for(contacts: &[Contact], key: &PublicKeyHex) -> Option<Contact> {
    contacts.iter().find(|contact| contact.identity_key.as_ref() == Some(key)).cloned()
}
