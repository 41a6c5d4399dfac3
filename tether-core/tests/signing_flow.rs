//! End-to-end threshold-signing flow over the in-memory store.
//!
//! Exercises the full path: register identities, create a unanimous 3-of-3
//! wallet, gate proposal on presence, broadcast, collect partial signatures
//! and complete only when every signer is reachable at evaluation time.

use std::sync::Arc;

use tether_core::application::{
    migrate_legacy_contacts, IdentityRegistry, NoopObserver, SharedWalletCoordinator,
};
use tether_core::domain::{Contact, PresenceUpdate, SessionState, SignatureOutcome, SpendProposal};
use tether_core::foundation::{ContactId, NetworkId, PublicKeyHex, TetherError, DEFAULT_SESSION_TIMEOUT_NS};
use tether_core::infrastructure::rpc::StaticChainQuery;
use tether_core::infrastructure::storage::{MemoryStorage, Storage};
use tether_core::infrastructure::transport::MockBroadcast;

const KEY_A: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
const KEY_B: &str = "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";
const KEY_C: &str = "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";

struct Harness {
    storage: Arc<dyn Storage>,
    registry: Arc<IdentityRegistry>,
    broadcast: Arc<MockBroadcast>,
    coordinator: SharedWalletCoordinator,
}

fn harness(timeout_nanos: u64) -> Harness {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let observer = Arc::new(NoopObserver);
    let registry = Arc::new(IdentityRegistry::new(storage.clone(), NetworkId::Mainnet, observer.clone()));
    let broadcast = Arc::new(MockBroadcast::new());
    let coordinator = SharedWalletCoordinator::new(
        storage.clone(),
        registry.clone(),
        Arc::new(StaticChainQuery::new()),
        broadcast.clone(),
        observer,
        timeout_nanos,
    );
    Harness { storage, registry, broadcast, coordinator }
}

fn key(s: &str) -> PublicKeyHex {
    PublicKeyHex::parse(s).expect("valid key")
}

fn set_presence(registry: &IdentityRegistry, public_key: &str, is_online: bool) {
    let report = registry.batch_update_presence(vec![PresenceUpdate {
        public_key: public_key.to_string(),
        is_online,
        last_seen_at_nanos: if is_online { None } else { Some(1) },
    }]);
    assert!(report.failed.is_empty(), "presence update failed: {:?}", report.failed);
}

fn proposal() -> SpendProposal {
    SpendProposal {
        recipient: "tether:qq3k5...".to_string(),
        amount_sompi: 150_000_000,
        fee_sompi: 10_000,
        memo: Some("shared expenses".to_string()),
    }
}

#[tokio::test]
async fn unanimous_wallet_full_signing_flow() {
    let h = harness(DEFAULT_SESSION_TIMEOUT_NS);
    let wallet = h
        .coordinator
        .create(vec![KEY_A.to_string(), KEY_B.to_string(), KEY_C.to_string()], 3)
        .expect("create wallet");

    // C is offline: a session can be created but broadcasting is hopeless.
    set_presence(&h.registry, KEY_A, true);
    set_presence(&h.registry, KEY_B, true);
    let gated = h.coordinator.propose_spend(&wallet.wallet_id, proposal()).expect("propose");
    assert!(!gated.can_propose);

    // C reconnects, proposal is viable now.
    set_presence(&h.registry, KEY_C, true);
    let proposed = h.coordinator.propose_spend(&wallet.wallet_id, proposal()).expect("propose");
    assert!(proposed.can_propose);
    assert_eq!(proposed.session.state, SessionState::Proposed);
    assert_eq!(proposed.session.participants.len(), 3);

    let session_id = proposed.session.session_id;
    let session = h.coordinator.broadcast_proposal(&session_id).await.expect("broadcast");
    assert_eq!(session.state, SessionState::Collecting);
    assert_eq!(h.broadcast.published_sessions().await, vec![session_id]);

    assert_eq!(
        h.coordinator.record_partial_signature(&session_id, &key(KEY_A)).expect("sig a"),
        SignatureOutcome::Accepted { completed: false }
    );
    assert_eq!(
        h.coordinator.record_partial_signature(&session_id, &key(KEY_B)).expect("sig b"),
        SignatureOutcome::Accepted { completed: false }
    );
    assert_eq!(
        h.coordinator.record_partial_signature(&session_id, &key(KEY_C)).expect("sig c"),
        SignatureOutcome::Accepted { completed: true }
    );

    let session = h.coordinator.get_session(&session_id).expect("get").expect("session");
    assert_eq!(session.state, SessionState::Completed);
    assert_eq!(session.signed_count(), 3);

    // A signature submitted to a completed session is discarded.
    assert_eq!(
        h.coordinator.record_partial_signature(&session_id, &key(KEY_A)).expect("late"),
        SignatureOutcome::DiscardedTerminal
    );
}

#[tokio::test]
async fn completion_waits_for_reachability_not_just_signatures() {
    let h = harness(DEFAULT_SESSION_TIMEOUT_NS);
    let wallet = h
        .coordinator
        .create(vec![KEY_A.to_string(), KEY_B.to_string(), KEY_C.to_string()], 3)
        .expect("create wallet");
    for k in [KEY_A, KEY_B, KEY_C] {
        set_presence(&h.registry, k, true);
    }

    let proposed = h.coordinator.propose_spend(&wallet.wallet_id, proposal()).expect("propose");
    let session_id = proposed.session.session_id;
    h.coordinator.broadcast_proposal(&session_id).await.expect("broadcast");

    h.coordinator.record_partial_signature(&session_id, &key(KEY_A)).expect("sig a");
    h.coordinator.record_partial_signature(&session_id, &key(KEY_B)).expect("sig b");

    // A drops off with a stale last-seen before C signs. All three
    // signatures are present, yet only two belong to reachable peers.
    set_presence(&h.registry, KEY_A, false);
    assert_eq!(
        h.coordinator.record_partial_signature(&session_id, &key(KEY_C)).expect("sig c"),
        SignatureOutcome::Accepted { completed: false }
    );

    let session = h.coordinator.get_session(&session_id).expect("get").expect("session");
    assert_eq!(session.state, SessionState::Collecting);
    assert_eq!(session.signed_count(), 3);

    // A reconnects. No new signature arrives; the next read re-evaluates
    // and the session completes on the retained signatures.
    set_presence(&h.registry, KEY_A, true);
    let session = h.coordinator.get_session(&session_id).expect("get").expect("session");
    assert_eq!(session.state, SessionState::Completed);
}

#[tokio::test]
async fn expired_session_is_terminal() {
    let h = harness(0);
    let wallet = h.coordinator.create(vec![KEY_A.to_string(), KEY_B.to_string()], 2).expect("create wallet");
    let proposed = h.coordinator.propose_spend(&wallet.wallet_id, proposal()).expect("propose");
    let session_id = proposed.session.session_id;

    std::thread::sleep(std::time::Duration::from_millis(5));

    // Expiry is applied lazily on read.
    let session = h.coordinator.get_session(&session_id).expect("get").expect("session");
    assert_eq!(session.state, SessionState::Expired);

    assert_eq!(
        h.coordinator.record_partial_signature(&session_id, &key(KEY_A)).expect("late"),
        SignatureOutcome::DiscardedTerminal
    );
}

#[tokio::test]
async fn wallet_deletion_cancels_open_sessions() {
    let h = harness(DEFAULT_SESSION_TIMEOUT_NS);
    let wallet = h.coordinator.create(vec![KEY_A.to_string(), KEY_B.to_string()], 2).expect("create wallet");
    let open = h.coordinator.propose_spend(&wallet.wallet_id, proposal()).expect("propose");

    let cascaded = h.coordinator.delete(&wallet.wallet_id).expect("delete");
    assert_eq!(cascaded, 1);
    assert!(h.coordinator.get_wallet(&wallet.wallet_id).expect("get").is_none());
    assert!(matches!(
        h.coordinator.delete(&wallet.wallet_id).expect_err("already gone"),
        TetherError::WalletNotFound(_)
    ));

    let session = h.coordinator.get_session(&open.session.session_id).expect("get").expect("session");
    assert!(matches!(session.state, SessionState::Failed { .. }));
    assert_eq!(
        h.coordinator.record_partial_signature(&open.session.session_id, &key(KEY_A)).expect("late"),
        SignatureOutcome::DiscardedTerminal
    );
}

#[tokio::test]
async fn migration_then_signing_uses_the_same_identities() {
    let h = harness(DEFAULT_SESSION_TIMEOUT_NS);
    let legacy = Contact {
        contact_id: ContactId::from("old-friend"),
        name: "Old Friend".to_string(),
        notes: None,
        favorite: true,
        tags: vec!["legacy".to_string()],
        identity_key: None,
        legacy_public_key: Some(format!("0x{}", KEY_A.to_uppercase())),
        legacy_nickname: Some("of".to_string()),
        created_at_nanos: 1,
        updated_at_nanos: 1,
    };
    h.storage.upsert_contact(legacy).expect("seed contact");

    let report = migrate_legacy_contacts(&h.storage, &h.registry).expect("migrate");
    assert_eq!(report.migrated, 1);

    // Wallet creation reuses the migrated identity instead of duplicating.
    h.coordinator.create(vec![KEY_A.to_string(), KEY_B.to_string()], 2).expect("create wallet");
    assert_eq!(h.registry.list_identities().expect("list").len(), 2);
}
