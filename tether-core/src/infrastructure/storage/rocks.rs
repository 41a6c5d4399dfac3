//! RocksDB-backed storage.
//!
//! # Column Families
//!
//! - `metadata`: schema version cell.
//! - `identity`: key = network tag byte + normalized public key bytes.
//! - `wallet`:   key = 32-byte wallet id.
//! - `session`:  key = 32-byte session id.
//! - `contact`:  key = contact id bytes.
//!
//! Values are bincode-encoded records. The schema version is checked on open
//! and a mismatch is refused rather than silently migrated.

use crate::domain::{Contact, Identity, SharedWallet, SigningSession};
use crate::foundation::{ContactId, NetworkId, PeerId, PublicKeyHex, SessionId, TetherError, WalletId, STORAGE_SCHEMA_VERSION};
use crate::infrastructure::storage::{Storage, StorageStats};
use crate::storage_err;
use log::{debug, info};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const CF_METADATA: &str = "metadata";
const CF_IDENTITY: &str = "identity";
const CF_WALLET: &str = "wallet";
const CF_SESSION: &str = "session";
const CF_CONTACT: &str = "contact";

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

const ALL_CFS: &[&str] = &[CF_METADATA, CF_IDENTITY, CF_WALLET, CF_SESSION, CF_CONTACT];

pub struct RocksStorage {
    db: Arc<DB>,
}

impl RocksStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TetherError> {
        let path = path.as_ref();
        debug!("opening RocksStorage path={}", path.display());

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors: Vec<ColumnFamilyDescriptor> =
            ALL_CFS.iter().map(|name| ColumnFamilyDescriptor::new(*name, Options::default())).collect();
        let db = DB::open_cf_descriptors(&opts, path, descriptors)
            .map_err(|err| TetherError::RocksDbOpenError { details: err.to_string() })?;

        let storage = Self { db: Arc::new(db) };
        storage.check_schema_version()?;
        info!("RocksStorage opened path={}", path.display());
        Ok(storage)
    }

    /// Open (creating if needed) under `data_dir/tether-registry`.
    pub fn open_in_dir(data_dir: impl AsRef<Path>) -> Result<Self, TetherError> {
        let dir = data_dir.as_ref();
        fs::create_dir_all(dir).map_err(|err| storage_err!("fs::create_dir_all open_in_dir", err))?;
        Self::open(dir.join("tether-registry"))
    }

    fn check_schema_version(&self) -> Result<(), TetherError> {
        let cf = self.cf(CF_METADATA)?;
        match self.db.get_cf(cf, SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let stored: u32 = bincode::deserialize(&bytes)?;
                if stored != STORAGE_SCHEMA_VERSION {
                    return Err(TetherError::SchemaMismatch { stored, current: STORAGE_SCHEMA_VERSION });
                }
            }
            None => {
                let encoded = bincode::serialize(&STORAGE_SCHEMA_VERSION)?;
                self.db.put_cf(cf, SCHEMA_VERSION_KEY, encoded)?;
            }
        }
        Ok(())
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, TetherError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| TetherError::StorageError { operation: "cf_handle".to_string(), details: name.to_string() })
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<(), TetherError> {
        let cf = self.cf(cf_name)?;
        let encoded = bincode::serialize(value)?;
        self.db.put_cf(cf, key, encoded)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>, TetherError> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>, TetherError> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = entry?;
            records.push(bincode::deserialize(&value)?);
        }
        Ok(records)
    }

    fn count(&self, cf_name: &str) -> Result<u64, TetherError> {
        let cf = self.cf(cf_name)?;
        let mut count = 0u64;
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    fn identity_key(network: NetworkId, public_key: &PublicKeyHex) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + public_key.as_str().len());
        key.push(network.tag());
        key.extend_from_slice(public_key.as_str().as_bytes());
        key
    }
}

impl Storage for RocksStorage {
    fn upsert_identity(&self, identity: Identity) -> Result<(), TetherError> {
        let key = Self::identity_key(identity.network, &identity.public_key);
        self.put(CF_IDENTITY, &key, &identity)
    }

    fn get_identity(&self, network: NetworkId, public_key: &PublicKeyHex) -> Result<Option<Identity>, TetherError> {
        self.get(CF_IDENTITY, &Self::identity_key(network, public_key))
    }

    fn find_identity_by_peer(&self, network: NetworkId, peer_id: &PeerId) -> Result<Option<Identity>, TetherError> {
        for identity in self.list_identities(network)? {
            if identity.peer_id.as_ref() == Some(peer_id) {
                return Ok(Some(identity));
            }
        }
        Ok(None)
    }

    fn list_identities(&self, network: NetworkId) -> Result<Vec<Identity>, TetherError> {
        let cf = self.cf(CF_IDENTITY)?;
        let prefix = [network.tag()];
        let mut identities = Vec::new();
        for entry in self.db.iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward)) {
            let (key, value) = entry?;
            if key.first() != Some(&network.tag()) {
                break;
            }
            identities.push(bincode::deserialize(&value)?);
        }
        Ok(identities)
    }

    fn upsert_wallet(&self, wallet: SharedWallet) -> Result<(), TetherError> {
        self.put(CF_WALLET, wallet.wallet_id.as_ref(), &wallet)
    }

    fn get_wallet(&self, wallet_id: &WalletId) -> Result<Option<SharedWallet>, TetherError> {
        self.get(CF_WALLET, wallet_id.as_ref())
    }

    fn delete_wallet(&self, wallet_id: &WalletId) -> Result<bool, TetherError> {
        let cf = self.cf(CF_WALLET)?;
        let existed = self.db.get_cf(cf, wallet_id.as_ref())?.is_some();
        if existed {
            self.db.delete_cf(cf, wallet_id.as_ref())?;
        }
        Ok(existed)
    }

    fn list_wallets(&self, network: NetworkId) -> Result<Vec<SharedWallet>, TetherError> {
        let mut wallets: Vec<SharedWallet> = self.scan(CF_WALLET)?;
        wallets.retain(|w: &SharedWallet| w.network == network);
        wallets.sort_by_key(|w| w.created_at_nanos);
        Ok(wallets)
    }

    fn insert_session(&self, session: SigningSession) -> Result<(), TetherError> {
        self.put(CF_SESSION, session.session_id.as_ref(), &session)
    }

    fn update_session(&self, session: &SigningSession) -> Result<(), TetherError> {
        let cf = self.cf(CF_SESSION)?;
        if self.db.get_cf(cf, session.session_id.as_ref())?.is_none() {
            return Err(TetherError::SessionNotFound(session.session_id.to_string()));
        }
        self.put(CF_SESSION, session.session_id.as_ref(), session)
    }

    fn get_session(&self, session_id: &SessionId) -> Result<Option<SigningSession>, TetherError> {
        self.get(CF_SESSION, session_id.as_ref())
    }

    fn list_sessions_for_wallet(&self, wallet_id: &WalletId) -> Result<Vec<SigningSession>, TetherError> {
        let mut sessions: Vec<SigningSession> = self.scan(CF_SESSION)?;
        sessions.retain(|s: &SigningSession| &s.wallet_id == wallet_id);
        sessions.sort_by_key(|s| s.created_at_nanos);
        Ok(sessions)
    }

    fn list_open_sessions(&self) -> Result<Vec<SigningSession>, TetherError> {
        let mut sessions: Vec<SigningSession> = self.scan(CF_SESSION)?;
        sessions.retain(|s: &SigningSession| !s.state.is_terminal());
        sessions.sort_by_key(|s| s.created_at_nanos);
        Ok(sessions)
    }

    fn upsert_contact(&self, contact: Contact) -> Result<(), TetherError> {
        self.put(CF_CONTACT, contact.contact_id.as_str().as_bytes(), &contact)
    }

    fn get_contact(&self, contact_id: &ContactId) -> Result<Option<Contact>, TetherError> {
        self.get(CF_CONTACT, contact_id.as_str().as_bytes())
    }

    fn list_contacts(&self) -> Result<Vec<Contact>, TetherError> {
        let mut contacts: Vec<Contact> = self.scan(CF_CONTACT)?;
        contacts.sort_by(|a, b| a.contact_id.as_str().cmp(b.contact_id.as_str()));
        Ok(contacts)
    }

    fn storage_stats(&self) -> Result<StorageStats, TetherError> {
        let open_sessions = self.list_open_sessions()?.len() as u64;
        Ok(StorageStats {
            identities: self.count(CF_IDENTITY)?,
            wallets: self.count(CF_WALLET)?,
            sessions: self.count(CF_SESSION)?,
            open_sessions,
            contacts: self.count(CF_CONTACT)?,
        })
    }

    fn health_check(&self) -> Result<(), TetherError> {
        self.cf(CF_METADATA).map(|_| ())
    }
}
