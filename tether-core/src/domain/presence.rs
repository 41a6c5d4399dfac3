//! Presence derivation.
//!
//! Presence is computed, never stored: deriving it fresh from `is_online` and
//! `last_seen_at_nanos` on every read eliminates the staleness bugs a cached
//! status field would invite.

use crate::domain::Identity;
use crate::foundation::RECENT_WINDOW_NANOS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse-grained reachability classification.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    RecentlyOnline,
    Offline,
    Unknown,
}

impl PresenceStatus {
    /// Whether a participant in this status counts as reachable for
    /// signature-collection purposes.
    pub fn is_reachable(self) -> bool {
        matches!(self, PresenceStatus::Online | PresenceStatus::RecentlyOnline)
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PresenceStatus::Online => "online",
            PresenceStatus::RecentlyOnline => "recently_online",
            PresenceStatus::Offline => "offline",
            PresenceStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Derive the presence status of an identity at `now_nanos`.
///
/// - `Unknown` if no identity record exists.
/// - `Online` if a direct connection is established, regardless of last_seen.
/// - `RecentlyOnline` if disconnected but seen strictly less than 5 minutes ago.
/// - `Offline` otherwise; exactly at the window boundary resolves to `Offline`.
pub fn presence_status(identity: Option<&Identity>, now_nanos: u64) -> PresenceStatus {
    let Some(identity) = identity else {
        return PresenceStatus::Unknown;
    };
    if identity.is_online {
        return PresenceStatus::Online;
    }
    if now_nanos.saturating_sub(identity.last_seen_at_nanos) < RECENT_WINDOW_NANOS {
        PresenceStatus::RecentlyOnline
    } else {
        PresenceStatus::Offline
    }
}
