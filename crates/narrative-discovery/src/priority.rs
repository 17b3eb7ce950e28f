//! Source-priority merge of known profiles.
//!
//! Kept free of any crawling or subscription state so the merge rule can be
//! checked on its own.

use serde::Serialize;

use narrative_core::KnownProfile;

/// What [`merge_profile`] did with an incoming update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeOutcome {
    /// No profile was known for the DID.
    Inserted,
    /// Same or higher priority: the incoming profile replaced the entry.
    Replaced,
    /// Lower priority but newer: display fields refreshed, source kept.
    Refreshed,
    /// Lower priority and not newer: nothing changed.
    Ignored,
}

impl MergeOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Merge `incoming` over `existing`.
///
/// An incoming profile of greater-or-equal priority fully replaces the
/// entry. A lower-priority one only refreshes the display fields, and only
/// if its `last_updated` is strictly newer; the recorded source is never
/// downgraded.
pub fn merge_profile(
    existing: Option<&KnownProfile>,
    incoming: KnownProfile,
) -> (KnownProfile, MergeOutcome) {
    let Some(existing) = existing else {
        return (incoming, MergeOutcome::Inserted);
    };

    if incoming.discovery_source.priority() >= existing.discovery_source.priority() {
        return (incoming, MergeOutcome::Replaced);
    }

    if incoming.last_updated > existing.last_updated {
        let mut refreshed = existing.clone();
        refreshed.display_name = incoming.display_name;
        refreshed.avatar_url = incoming.avatar_url;
        refreshed.signature_status = incoming.signature_status;
        refreshed.last_updated = incoming.last_updated;
        return (refreshed, MergeOutcome::Refreshed);
    }

    (existing.clone(), MergeOutcome::Ignored)
}
