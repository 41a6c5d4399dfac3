use crate::application::registry::IdentityRegistry;
use crate::foundation::{now_nanos, ErrorContext, Result};
use crate::infrastructure::storage::Storage;
use log::{info, warn};
use std::sync::Arc;

/// Outcome of one migration pass over the contact store.
#[derive(Debug, Default, PartialEq)]
pub struct MigrationReport {
    /// Contacts whose legacy key was resolved and linked this pass.
    pub migrated: usize,
    /// Contacts already linked, or with no embedded key to migrate.
    pub skipped: usize,
    /// Contacts whose embedded key could not be parsed; left untouched.
    pub failed: Vec<(String, ErrorContext)>,
}

impl MigrationReport {
    fn record_failure(&mut self, contact_id: String, ctx: ErrorContext) {
        self.failed.push((contact_id, ctx));
    }
}

/// Upgrades pre-registry contacts to reference the identity registry.
///
/// Runs at startup. For every contact without an `identity_key`, the embedded
/// legacy public key is resolved through `find_or_create` and the reference
/// attached; legacy fields are retained read-only. Guarded by the presence
/// check on `identity_key`, so re-running is a no-op and never duplicates
/// identities or rewrites a reference twice. Per-contact failures are
/// recorded and do not abort the pass.
pub fn migrate_legacy_contacts(storage: &Arc<dyn Storage>, registry: &IdentityRegistry) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    for mut contact in storage.list_contacts()? {
        if contact.identity_key.is_some() {
            report.skipped += 1;
            continue;
        }
        let Some(legacy_key) = contact.legacy_public_key.clone() else {
            report.skipped += 1;
            continue;
        };
        match registry.find_or_create(&legacy_key) {
            Ok(identity) => {
                contact.identity_key = Some(identity.public_key);
                contact.updated_at_nanos = now_nanos();
                storage.upsert_contact(contact)?;
                report.migrated += 1;
            }
            Err(err) => {
                warn!("contact migration failed contact_id={} error={}", contact.contact_id, err);
                report.record_failure(contact.contact_id.to_string(), err.context());
            }
        }
    }
    info!(
        "legacy contact migration migrated={} skipped={} failed={}",
        report.migrated,
        report.skipped,
        report.failed.len()
    );
    Ok(report)
}
