pub mod lifecycle;
pub mod migration;
pub mod registry;
pub mod views;
pub mod wallets;

pub use lifecycle::{CompositeObserver, LifecycleObserver, NoopObserver};
pub use migration::{migrate_legacy_contacts, MigrationReport};
pub use registry::{IdentityRegistry, PresenceReport};
pub use views::{ContactView, EmptyLedger, ParticipantView, SharedWalletView, SignerView, TransactionLedger, Views};
pub use wallets::{ProposedSpend, SharedWalletCoordinator, SweepReport};
