//! System-wide constants for the Tether presence and signing core.

/// Nanoseconds per millisecond (10^6).
pub const NANOS_PER_MILLI: u64 = 1_000_000;

/// Nanoseconds per second (10^9).
pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Width of the "recently online" presence window (5 minutes, in milliseconds).
///
/// An identity whose direct connection dropped is still treated as reachable
/// while `now - last_seen_at` is strictly below this window. Exactly at the
/// boundary the identity is `Offline`.
pub const RECENT_WINDOW_MILLIS: u64 = 300_000;

/// The "recently online" window expressed in nanoseconds.
pub const RECENT_WINDOW_NANOS: u64 = RECENT_WINDOW_MILLIS * NANOS_PER_MILLI;

/// Default lifetime of a signing session (10 minutes).
pub const DEFAULT_SESSION_TIMEOUT_NS: u64 = 10 * 60 * NANOS_PER_SECOND;

/// Minimum session lifetime (10 seconds).
///
/// Shorter sessions would expire before participants can even be reached.
pub const MIN_SESSION_DURATION_NS: u64 = 10 * NANOS_PER_SECOND;

/// Maximum session lifetime (1 hour).
pub const MAX_SESSION_DURATION_NS: u64 = 60 * 60 * NANOS_PER_SECOND;

/// Maximum number of participants in a shared wallet.
pub const MAX_WALLET_PARTICIPANTS: usize = 100;

/// Minimum signing threshold.
pub const MIN_THRESHOLD: u16 = 1;

/// Schema version tag written to persistent storage.
///
/// Bumped when any stored record layout changes; `RocksStorage::open` refuses
/// to read a store written with a different version.
pub const STORAGE_SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the wall clock, for test determinism.
pub const TEST_NOW_NANOS_ENV_VAR: &str = "TETHER_TEST_NOW_NANOS";

/// Maximum length accepted for an entity-supplied nickname.
pub const MAX_NICKNAME_LENGTH: usize = 64;

/// Maximum number of multiaddrs retained per identity.
pub const MAX_MULTIADDRS_PER_IDENTITY: usize = 16;
