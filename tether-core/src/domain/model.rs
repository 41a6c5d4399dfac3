use crate::foundation::{ContactId, NetworkId, PeerId, PublicKeyHex, WalletId};
use serde::{Deserialize, Serialize};

/// Canonical record for one public-key-addressable entity.
///
/// Exactly one `Identity` exists per `(public_key, network)` pair; lookups
/// normalize the key before compare. Mutation happens only through the named
/// entry points on `IdentityRegistry` - each entry point documents which
/// fields it may touch, so the three independent signal sources (connection
/// events, discovery heartbeats, presence broadcasts) cannot step on each
/// other's invariants.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Identity {
    /// Primary key, immutable, lowercase hex without prefix.
    pub public_key: PublicKeyHex,
    pub network: NetworkId,
    /// Current transport-layer identifier; only meaningful while connected
    /// and changes across reconnects. Bound to the public key by an
    /// authenticated handshake external to this core.
    pub peer_id: Option<PeerId>,
    /// Ordered current transport addresses (may be empty).
    pub multiaddrs: Vec<String>,
    /// Entity-supplied display label, untrusted.
    pub nickname: Option<String>,
    /// True only while a direct connection is currently established.
    pub is_online: bool,
    /// Most recent signal of any kind: connection, heartbeat or disconnect.
    pub last_seen_at_nanos: u64,
    /// Present only if the entity has advertised itself as a signer.
    pub signer: Option<SignerInfo>,
    pub created_at_nanos: u64,
    pub updated_at_nanos: u64,
}

impl Identity {
    pub fn new(public_key: PublicKeyHex, network: NetworkId, now_nanos: u64) -> Self {
        Self {
            public_key,
            network,
            peer_id: None,
            multiaddrs: Vec::new(),
            nickname: None,
            is_online: false,
            last_seen_at_nanos: 0,
            signer: None,
            created_at_nanos: now_nanos,
            updated_at_nanos: now_nanos,
        }
    }
}

/// Advertised signing capabilities, folded in from discovery heartbeats.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SignerInfo {
    /// Transaction kinds this signer is willing to co-sign.
    pub transaction_kinds: Vec<String>,
    /// Advertised co-signing fee.
    pub fee_sompi: u64,
    /// Cleared on disconnect: a disconnected signer cannot currently sign.
    pub available: bool,
}

/// One signer-discovery heartbeat as received from the network layer.
///
/// The public key arrives as a raw string and is validated by the registry;
/// a heartbeat is itself evidence of reachability.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SignerAdvert {
    pub public_key: String,
    pub peer_id: Option<PeerId>,
    pub multiaddrs: Vec<String>,
    pub nickname: Option<String>,
    pub transaction_kinds: Vec<String>,
    pub fee_sompi: u64,
}

/// One entry of a bulk presence reconciliation broadcast.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PresenceUpdate {
    pub public_key: String,
    pub is_online: bool,
    /// When absent, the receive time is used.
    pub last_seen_at_nanos: Option<u64>,
}

/// One multi-party spending policy.
///
/// The participant set is immutable after creation; changing membership
/// requires creating a new wallet.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SharedWallet {
    pub wallet_id: WalletId,
    pub network: NetworkId,
    /// Ordered, fixed-size set of participant public keys (size = N).
    pub participants: Vec<PublicKeyHex>,
    /// Signatures required to authorize a spend, 1 <= threshold <= N.
    pub threshold: u16,
    /// Last-known aggregated on-chain balance; advisory, never gates signing.
    pub balance_sompi: u64,
    pub created_at_nanos: u64,
    pub updated_at_nanos: u64,
}

/// Spend parameters carried through a signing session.
///
/// Opaque to this core beyond pass-through: transaction construction and fee
/// estimation live with external collaborators.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SpendProposal {
    pub recipient: String,
    pub amount_sompi: u64,
    pub fee_sompi: u64,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Relationship record: human-assigned metadata referencing an identity.
///
/// Once `identity_key` is set it is the only authoritative link; the legacy
/// fields are retained read-only for records that predate the registry and
/// are rewritten exactly once by the startup migration pass.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Contact {
    pub contact_id: ContactId,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Reference into the identity registry; `None` only for unmigrated
    /// legacy records.
    #[serde(default)]
    pub identity_key: Option<PublicKeyHex>,
    /// Embedded public key from the pre-registry schema, kept for the
    /// migration path and backward compatibility.
    #[serde(default)]
    pub legacy_public_key: Option<String>,
    #[serde(default)]
    pub legacy_nickname: Option<String>,
    pub created_at_nanos: u64,
    pub updated_at_nanos: u64,
}
