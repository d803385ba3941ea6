//! Recipient resolution: who hears about a security alert.
//!
//! The audience is every privileged admin plus every designated
//! security-team member, with blank addresses dropped and duplicates
//! merged case-insensitively. Resolution is best-effort: a directory read
//! failure yields an empty audience rather than an error.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use sentinel_contracts::error::SentinelResult;
use sentinel_core::traits::AccountDirectory;

#[derive(Clone)]
pub struct RecipientResolver {
    directory: Arc<dyn AccountDirectory>,
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    /// The deduplicated set of notification addresses, lowercased.
    pub fn resolve_recipients(&self) -> BTreeSet<String> {
        match self.collect() {
            Ok(recipients) => {
                debug!(count = recipients.len(), "resolved alert recipients");
                recipients
            }
            Err(e) => {
                warn!(error = %e, "failed to resolve alert recipients");
                BTreeSet::new()
            }
        }
    }

    fn collect(&self) -> SentinelResult<BTreeSet<String>> {
        let admins = self.directory.privileged_admin_emails()?;
        let team = self.directory.security_team_emails()?;

        Ok(admins
            .into_iter()
            .chain(team)
            .flatten()
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty())
            .collect())
    }
}
