use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::attestation::TrustAttestation;
use crate::error::CoreError;
use crate::profile::Profile;

/// Schema version written into every new personal document.
pub const PERSONAL_DOCUMENT_VERSION: u32 = 1;

/// One identity's replicated personal document.
///
/// Owned by `did` but globally readable. `trust_given` is written only by
/// the owner; `trust_received` entries are appended by other identities as
/// a side effect of their own trust actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDocument {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub did: String,
    #[serde(default)]
    pub profile: Profile,
    /// trusteeDid -> attestation
    #[serde(default)]
    pub trust_given: BTreeMap<String, TrustAttestation>,
    /// trusterDid -> attestation
    #[serde(default)]
    pub trust_received: BTreeMap<String, TrustAttestation>,
}

impl PersonalDocument {
    /// Create a fresh document for the given owner.
    pub fn new(did: impl Into<String>, profile: Profile) -> Self {
        Self {
            version: PERSONAL_DOCUMENT_VERSION,
            did: did.into(),
            profile,
            trust_given: BTreeMap::new(),
            trust_received: BTreeMap::new(),
        }
    }

    /// A document is usable once its identity fields are populated. A
    /// document that resolves but is still syncing in from an empty state
    /// fails this check.
    pub fn is_ready(&self) -> bool {
        self.version >= PERSONAL_DOCUMENT_VERSION && !self.did.is_empty()
    }

    /// Readiness check over the raw replicated value, without a full decode.
    pub fn is_ready_value(value: &serde_json::Value) -> bool {
        let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
        let did = value.get("did").and_then(|v| v.as_str()).unwrap_or("");
        version >= u64::from(PERSONAL_DOCUMENT_VERSION) && !did.is_empty()
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CoreError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_is_ready() {
        let doc = PersonalDocument::new("did:key:zAlice", Profile::new(Some("Alice".into())));
        assert!(doc.is_ready());
        assert!(doc.trust_given.is_empty());
        assert!(doc.trust_received.is_empty());
    }

    #[test]
    fn test_empty_value_not_ready() {
        assert!(!PersonalDocument::is_ready_value(&serde_json::json!({})));
        assert!(!PersonalDocument::is_ready_value(
            &serde_json::json!({ "version": 1, "did": "" })
        ));
        assert!(!PersonalDocument::is_ready_value(
            &serde_json::json!({ "version": 0, "did": "did:key:zAlice" })
        ));
    }

    #[test]
    fn test_value_roundtrip_ready() {
        let doc = PersonalDocument::new("did:key:zAlice", Profile::default());
        let value = doc.to_value().unwrap();
        assert!(PersonalDocument::is_ready_value(&value));
        assert_eq!(value["trustGiven"], serde_json::json!({}));
        let back = PersonalDocument::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_partial_value_decodes_with_defaults() {
        let doc = PersonalDocument::from_value(serde_json::json!({
            "version": 1,
            "did": "did:key:zBob",
            "profile": { "updatedAt": "2026-01-01T00:00:00Z" }
        }))
        .unwrap();
        assert!(doc.is_ready());
        assert!(doc.trust_received.is_empty());
    }
}
