use crate::application::lifecycle::LifecycleObserver;
use crate::domain::{presence_status, Identity, PresenceStatus, PresenceUpdate, SignerAdvert, SignerInfo};
use crate::foundation::{
    now_nanos, ErrorContext, NetworkId, PeerId, PublicKeyHex, Result, TetherError, MAX_MULTIADDRS_PER_IDENTITY,
    MAX_NICKNAME_LENGTH,
};
use crate::infrastructure::storage::Storage;
use log::{debug, info, trace, warn};
use std::sync::Arc;

/// Outcome of a bulk presence reconciliation.
///
/// Entries are independent; failures carry the raw key that was rejected so
/// the broadcast source can be debugged without aborting the batch.
#[derive(Debug, Default)]
pub struct PresenceReport {
    pub applied: usize,
    pub failed: Vec<(String, ErrorContext)>,
}

/// Single source of truth for identity records on one network.
///
/// All identity mutation flows through the named entry points below; each
/// documents which fields it may touch. The three signal sources (connection
/// events, discovery heartbeats, presence broadcasts) therefore cannot
/// overwrite fields they do not own.
pub struct IdentityRegistry {
    storage: Arc<dyn Storage>,
    network: NetworkId,
    observer: Arc<dyn LifecycleObserver>,
}

impl IdentityRegistry {
    pub fn new(storage: Arc<dyn Storage>, network: NetworkId, observer: Arc<dyn LifecycleObserver>) -> Self {
        Self { storage, network, observer }
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Idempotent lookup-or-insert by public key.
    ///
    /// The key is normalized and validated before compare, so two spellings
    /// of the same key always resolve to the same record. Creates with
    /// defaults when absent; touches nothing when present.
    pub fn find_or_create(&self, public_key: &str) -> Result<Identity> {
        let key = PublicKeyHex::parse(public_key)?;
        if let Some(existing) = self.storage.get_identity(self.network, &key)? {
            trace!("find_or_create hit public_key={} network={}", key, self.network);
            return Ok(existing);
        }
        let identity = Identity::new(key.clone(), self.network, now_nanos());
        self.storage.upsert_identity(identity.clone())?;
        info!("identity registered public_key={} network={}", key, self.network);
        self.observer.on_identity_registered(&key, self.network);
        Ok(identity)
    }

    /// Returns `Ok(None)` when no record exists; never a placeholder.
    pub fn get(&self, public_key: &PublicKeyHex) -> Result<Option<Identity>> {
        self.storage.get_identity(self.network, public_key)
    }

    /// Resolves by the current transport binding. Peer ids are reusable and
    /// only meaningful while connected, so a miss here means the peer has no
    /// authenticated identity yet, not an error.
    pub fn find_by_peer_id(&self, peer_id: &PeerId) -> Result<Option<Identity>> {
        self.storage.find_identity_by_peer(self.network, peer_id)
    }

    pub fn list_identities(&self) -> Result<Vec<Identity>> {
        self.storage.list_identities(self.network)
    }

    /// Associates a transport peer id with a known public key.
    ///
    /// Called after the authenticated handshake proves the peer controls the
    /// key. This is the only entry point that writes `peer_id`; a bare
    /// connection never creates the binding.
    ///
    /// Fields touched: `peer_id`, `updated_at_nanos`.
    pub fn bind_peer(&self, public_key: &PublicKeyHex, peer_id: PeerId) -> Result<Identity> {
        let mut identity = self
            .storage
            .get_identity(self.network, public_key)?
            .ok_or_else(|| TetherError::IdentityNotFound(public_key.to_string()))?;
        debug!("binding peer public_key={} peer_id={}", public_key, peer_id);
        identity.peer_id = Some(peer_id);
        identity.updated_at_nanos = now_nanos();
        self.storage.upsert_identity(identity.clone())?;
        Ok(identity)
    }

    /// Folds in a peer-connected event from the network layer.
    ///
    /// Updates only identities whose peer binding is already established;
    /// a connection alone proves nothing about the public key behind it, so
    /// unknown peers are ignored and no record is created.
    ///
    /// Fields touched: `is_online`, `last_seen_at_nanos`, `multiaddrs`,
    /// `updated_at_nanos`.
    pub fn update_from_peer_connection(&self, peer_id: &PeerId, multiaddrs: Vec<String>) -> Result<Option<Identity>> {
        let Some(mut identity) = self.storage.find_identity_by_peer(self.network, peer_id)? else {
            debug!("peer connected without identity binding peer_id={}", peer_id);
            return Ok(None);
        };
        let now = now_nanos();
        let was_online = identity.is_online;
        identity.is_online = true;
        identity.last_seen_at_nanos = now;
        identity.multiaddrs = clamp_multiaddrs(multiaddrs);
        identity.updated_at_nanos = now;
        self.storage.upsert_identity(identity.clone())?;
        if !was_online {
            self.observer.on_presence_changed(&identity.public_key, true);
        }
        Ok(Some(identity))
    }

    /// Folds in a peer-disconnected event.
    ///
    /// No-op for unknown peer ids. Clears the signer availability flag
    /// since a disconnected signer cannot currently sign; the advertised
    /// capabilities themselves are kept.
    ///
    /// Fields touched: `is_online`, `last_seen_at_nanos`,
    /// `signer.available`, `updated_at_nanos`.
    pub fn mark_offline_by_peer_id(&self, peer_id: &PeerId) -> Result<()> {
        let Some(mut identity) = self.storage.find_identity_by_peer(self.network, peer_id)? else {
            trace!("disconnect for unknown peer peer_id={}", peer_id);
            return Ok(());
        };
        let now = now_nanos();
        let was_online = identity.is_online;
        identity.is_online = false;
        identity.last_seen_at_nanos = now;
        identity.updated_at_nanos = now;
        if let Some(signer) = identity.signer.as_mut() {
            signer.available = false;
        }
        self.storage.upsert_identity(identity.clone())?;
        if was_online {
            self.observer.on_presence_changed(&identity.public_key, false);
        }
        Ok(())
    }

    /// Folds in one signer-discovery heartbeat.
    ///
    /// A heartbeat is self-certifying (it carries the public key) and is
    /// itself evidence of reachability, so this entry point find-or-creates
    /// and marks the identity online.
    ///
    /// Fields touched: `peer_id`, `multiaddrs`, `nickname`, `signer`,
    /// `is_online`, `last_seen_at_nanos`, `updated_at_nanos`.
    pub fn update_from_signer_discovery(&self, advert: SignerAdvert) -> Result<Identity> {
        let mut identity = self.find_or_create(&advert.public_key)?;
        let now = now_nanos();
        let was_online = identity.is_online;
        if advert.peer_id.is_some() {
            identity.peer_id = advert.peer_id;
        }
        if !advert.multiaddrs.is_empty() {
            identity.multiaddrs = clamp_multiaddrs(advert.multiaddrs);
        }
        if let Some(nickname) = advert.nickname {
            identity.nickname = Some(clamp_nickname(nickname));
        }
        identity.signer = Some(SignerInfo {
            transaction_kinds: advert.transaction_kinds,
            fee_sompi: advert.fee_sompi,
            available: true,
        });
        identity.is_online = true;
        identity.last_seen_at_nanos = now;
        identity.updated_at_nanos = now;
        self.storage.upsert_identity(identity.clone())?;
        debug!("signer heartbeat folded public_key={} fee_sompi={}", identity.public_key, advert.fee_sompi);
        if !was_online {
            self.observer.on_presence_changed(&identity.public_key, true);
        }
        Ok(identity)
    }

    /// Applies a bulk presence reconciliation broadcast.
    ///
    /// Entries are independent: a malformed key or storage failure on one
    /// entry is recorded in the report and the rest still apply. Unknown
    /// keys are created first since a presence broadcast is keyed by public
    /// key and therefore self-certifying.
    ///
    /// Fields touched per entry: `is_online`, `last_seen_at_nanos`,
    /// `updated_at_nanos`.
    pub fn batch_update_presence(&self, updates: Vec<PresenceUpdate>) -> PresenceReport {
        let mut report = PresenceReport::default();
        for update in updates {
            let raw_key = update.public_key.clone();
            match self.apply_presence_update(update) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    warn!("presence update rejected public_key={} error={}", raw_key, err);
                    report.failed.push((raw_key, err.context()));
                }
            }
        }
        debug!("presence batch applied={} failed={}", report.applied, report.failed.len());
        report
    }

    fn apply_presence_update(&self, update: PresenceUpdate) -> Result<()> {
        let mut identity = self.find_or_create(&update.public_key)?;
        let now = now_nanos();
        let was_online = identity.is_online;
        identity.is_online = update.is_online;
        identity.last_seen_at_nanos = update.last_seen_at_nanos.unwrap_or(now);
        identity.updated_at_nanos = now;
        self.storage.upsert_identity(identity.clone())?;
        if was_online != identity.is_online {
            self.observer.on_presence_changed(&identity.public_key, identity.is_online);
        }
        Ok(())
    }

    /// Current reachability of the given key, recomputed on every call.
    pub fn online_status(&self, public_key: &PublicKeyHex) -> Result<PresenceStatus> {
        let identity = self.storage.get_identity(self.network, public_key)?;
        Ok(presence_status(identity.as_ref(), now_nanos()))
    }
}

fn clamp_nickname(nickname: String) -> String {
    if nickname.chars().count() <= MAX_NICKNAME_LENGTH {
        return nickname;
    }
    nickname.chars().take(MAX_NICKNAME_LENGTH).collect()
}

fn clamp_multiaddrs(mut multiaddrs: Vec<String>) -> Vec<String> {
    multiaddrs.truncate(MAX_MULTIADDRS_PER_IDENTITY);
    multiaddrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::lifecycle::NoopObserver;
    use crate::infrastructure::storage::MemoryStorage;

    // x-coordinates of small multiples of the secp256k1 generator.
    const KEY_A: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const KEY_B: &str = "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

    fn registry() -> IdentityRegistry {
        IdentityRegistry::new(Arc::new(MemoryStorage::new()), NetworkId::Mainnet, Arc::new(NoopObserver))
    }

    fn key(s: &str) -> PublicKeyHex {
        PublicKeyHex::parse(s).expect("valid key")
    }

    #[test]
    fn find_or_create_is_idempotent() {
        let registry = registry();
        let first = registry.find_or_create(KEY_A).expect("create");
        let second = registry.find_or_create(&format!("0x{}", KEY_A.to_uppercase())).expect("reuse");
        assert_eq!(first.public_key, second.public_key);
        assert_eq!(first.created_at_nanos, second.created_at_nanos);
        assert_eq!(registry.list_identities().expect("list").len(), 1);
    }

    #[test]
    fn find_or_create_rejects_malformed_key() {
        let registry = registry();
        let err = registry.find_or_create("not-a-key").expect_err("must reject");
        assert!(matches!(err, TetherError::InvalidPublicKey { .. }));
        assert!(registry.list_identities().expect("list").is_empty());
    }

    #[test]
    fn get_absent_identity_returns_none() {
        let registry = registry();
        assert!(registry.get(&key(KEY_A)).expect("get").is_none());
        assert_eq!(registry.online_status(&key(KEY_A)).expect("status"), PresenceStatus::Unknown);
    }

    #[test]
    fn peer_connection_never_creates_an_identity() {
        let registry = registry();
        let result = registry
            .update_from_peer_connection(&PeerId::from("p1"), vec!["/ip4/10.0.0.1/tcp/4001".to_string()])
            .expect("update");
        assert!(result.is_none());
        assert!(registry.list_identities().expect("list").is_empty());
    }

    #[test]
    fn bound_peer_connection_marks_online() {
        let registry = registry();
        registry.find_or_create(KEY_A).expect("create");
        registry.bind_peer(&key(KEY_A), PeerId::from("p1")).expect("bind");

        let identity = registry
            .update_from_peer_connection(&PeerId::from("p1"), vec!["/ip4/10.0.0.1/tcp/4001".to_string()])
            .expect("update")
            .expect("bound identity");
        assert!(identity.is_online);
        assert_eq!(identity.multiaddrs.len(), 1);
        assert_eq!(registry.online_status(&key(KEY_A)).expect("status"), PresenceStatus::Online);
    }

    #[test]
    fn bind_peer_requires_existing_identity() {
        let registry = registry();
        let err = registry.bind_peer(&key(KEY_A), PeerId::from("p1")).expect_err("must fail");
        assert!(matches!(err, TetherError::IdentityNotFound(_)));
    }

    #[test]
    fn mark_offline_unknown_peer_is_a_noop() {
        let registry = registry();
        registry.mark_offline_by_peer_id(&PeerId::from("ghost")).expect("noop");
        assert!(registry.list_identities().expect("list").is_empty());
    }

    #[test]
    fn disconnect_clears_signer_availability() {
        let registry = registry();
        registry
            .update_from_signer_discovery(SignerAdvert {
                public_key: KEY_A.to_string(),
                peer_id: Some(PeerId::from("p1")),
                multiaddrs: vec![],
                nickname: Some("alice".to_string()),
                transaction_kinds: vec!["transfer".to_string()],
                fee_sompi: 500,
            })
            .expect("discovery");

        registry.mark_offline_by_peer_id(&PeerId::from("p1")).expect("disconnect");

        let identity = registry.get(&key(KEY_A)).expect("get").expect("exists");
        assert!(!identity.is_online);
        let signer = identity.signer.expect("capabilities kept");
        assert!(!signer.available);
        assert_eq!(signer.fee_sompi, 500);
    }

    #[test]
    fn discovery_heartbeat_creates_and_marks_online() {
        let registry = registry();
        let identity = registry
            .update_from_signer_discovery(SignerAdvert {
                public_key: format!("0x{}", KEY_B.to_uppercase()),
                peer_id: None,
                multiaddrs: vec!["/dns4/signer.example/tcp/443".to_string()],
                nickname: None,
                transaction_kinds: vec!["transfer".to_string()],
                fee_sompi: 100,
            })
            .expect("discovery");

        assert!(identity.is_online);
        assert_eq!(identity.public_key, key(KEY_B));
        assert!(identity.signer.expect("signer").available);
    }

    #[test]
    fn batch_presence_isolates_bad_entries() {
        let registry = registry();
        let report = registry.batch_update_presence(vec![
            PresenceUpdate { public_key: KEY_A.to_string(), is_online: true, last_seen_at_nanos: None },
            PresenceUpdate { public_key: "garbage".to_string(), is_online: true, last_seen_at_nanos: None },
            PresenceUpdate { public_key: KEY_B.to_string(), is_online: false, last_seen_at_nanos: Some(1) },
        ]);

        assert_eq!(report.applied, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "garbage");
        assert_eq!(registry.online_status(&key(KEY_A)).expect("status"), PresenceStatus::Online);
        assert_eq!(registry.online_status(&key(KEY_B)).expect("status"), PresenceStatus::Offline);
    }
}
