//! Reconciliation of the three presence signal sources, plus durability of
//! the registry over the RocksDB store.

use std::sync::Arc;

use tempfile::TempDir;
use tether_core::application::{EmptyLedger, IdentityRegistry, NoopObserver, Views};
use tether_core::domain::{PresenceStatus, PresenceUpdate, SignerAdvert};
use tether_core::foundation::{NetworkId, PeerId, PublicKeyHex};
use tether_core::infrastructure::storage::{RocksStorage, Storage};

const KEY_A: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
const KEY_B: &str = "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";

fn key(s: &str) -> PublicKeyHex {
    PublicKeyHex::parse(s).expect("valid key")
}

fn registry(storage: Arc<dyn Storage>, network: NetworkId) -> IdentityRegistry {
    IdentityRegistry::new(storage, network, Arc::new(NoopObserver))
}

#[test]
fn connect_disconnect_cycle_drives_presence() {
    let dir = TempDir::new().expect("tempdir");
    let storage: Arc<dyn Storage> = Arc::new(RocksStorage::open(dir.path()).expect("open"));
    let registry = registry(storage, NetworkId::Mainnet);

    registry.find_or_create(KEY_A).expect("create");
    registry.bind_peer(&key(KEY_A), PeerId::from("p1")).expect("bind");

    registry
        .update_from_peer_connection(&PeerId::from("p1"), vec!["/ip4/10.0.0.1/tcp/4001".to_string()])
        .expect("connect")
        .expect("bound identity");
    assert_eq!(registry.online_status(&key(KEY_A)).expect("status"), PresenceStatus::Online);

    // Disconnect refreshes last-seen, so the identity is recently online,
    // not offline, when evaluated inside the five-minute window.
    registry.mark_offline_by_peer_id(&PeerId::from("p1")).expect("disconnect");
    assert_eq!(registry.online_status(&key(KEY_A)).expect("status"), PresenceStatus::RecentlyOnline);
}

#[test]
fn discovery_and_broadcast_sources_converge() {
    let dir = TempDir::new().expect("tempdir");
    let storage: Arc<dyn Storage> = Arc::new(RocksStorage::open(dir.path()).expect("open"));
    let registry = registry(storage.clone(), NetworkId::Mainnet);

    // Heartbeat creates the identity and marks it reachable.
    registry
        .update_from_signer_discovery(SignerAdvert {
            public_key: KEY_A.to_string(),
            peer_id: Some(PeerId::from("p1")),
            multiaddrs: vec!["/dns4/signer.example/tcp/443".to_string()],
            nickname: Some("alice".to_string()),
            transaction_kinds: vec!["transfer".to_string()],
            fee_sompi: 500,
        })
        .expect("discovery");

    // A later presence broadcast reports the same key offline with a stale
    // last-seen; the broadcast wins because it is the most recent signal.
    let report = registry.batch_update_presence(vec![PresenceUpdate {
        public_key: KEY_A.to_string(),
        is_online: false,
        last_seen_at_nanos: Some(1),
    }]);
    assert!(report.failed.is_empty());
    assert_eq!(registry.online_status(&key(KEY_A)).expect("status"), PresenceStatus::Offline);

    // Capabilities folded in by discovery survive the presence flip.
    let identity = registry.get(&key(KEY_A)).expect("get").expect("identity");
    let signer = identity.signer.expect("signer info");
    assert_eq!(signer.fee_sompi, 500);
    assert_eq!(identity.nickname.as_deref(), Some("alice"));

    let views = Views::new(storage, Arc::new(registry), Arc::new(EmptyLedger), None);
    let signers = views.signer_views().expect("signers");
    assert_eq!(signers.len(), 1);
    assert_eq!(signers[0].presence, PresenceStatus::Offline);
}

#[test]
fn identities_survive_process_restart() {
    let dir = TempDir::new().expect("tempdir");

    {
        let storage: Arc<dyn Storage> = Arc::new(RocksStorage::open(dir.path()).expect("open"));
        let registry = registry(storage, NetworkId::Mainnet);
        registry.find_or_create(KEY_A).expect("create");
        registry.bind_peer(&key(KEY_A), PeerId::from("p1")).expect("bind");
    }

    let storage: Arc<dyn Storage> = Arc::new(RocksStorage::open(dir.path()).expect("reopen"));
    let registry = registry(storage, NetworkId::Mainnet);
    let identity = registry.get(&key(KEY_A)).expect("get").expect("persisted");
    assert_eq!(identity.peer_id, Some(PeerId::from("p1")));
    // The peer binding survives too, so a reconnect resolves immediately.
    assert!(registry.find_by_peer_id(&PeerId::from("p1")).expect("find").is_some());
}

#[test]
fn networks_are_isolated() {
    let dir = TempDir::new().expect("tempdir");
    let storage: Arc<dyn Storage> = Arc::new(RocksStorage::open(dir.path()).expect("open"));

    let mainnet = registry(storage.clone(), NetworkId::Mainnet);
    let testnet = registry(storage, NetworkId::Testnet);

    mainnet.find_or_create(KEY_A).expect("mainnet identity");
    testnet.find_or_create(KEY_B).expect("testnet identity");

    assert!(mainnet.get(&key(KEY_B)).expect("get").is_none());
    assert!(testnet.get(&key(KEY_A)).expect("get").is_none());
    assert_eq!(mainnet.list_identities().expect("list").len(), 1);
    assert_eq!(testnet.list_identities().expect("list").len(), 1);
}
