use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::PersonalDocument;

/// Where a known profile was discovered.
///
/// Priority, highest first: `SelfDoc` > trust (`TrustGiven`, `TrustReceived`,
/// `SecondDegree`) > `External` > `Workspace`. The three trust variants share
/// a priority; they differ only in provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoverySource {
    #[serde(rename = "self")]
    SelfDoc,
    TrustGiven,
    TrustReceived,
    #[serde(rename = "trust-2nd-degree")]
    SecondDegree,
    External,
    Workspace,
}

impl DiscoverySource {
    pub fn priority(self) -> u8 {
        match self {
            Self::SelfDoc => 4,
            Self::TrustGiven | Self::TrustReceived | Self::SecondDegree => 3,
            Self::External => 2,
            Self::Workspace => 1,
        }
    }

    /// First-degree trust: a direct attestation in the local document.
    pub fn is_first_degree(self) -> bool {
        matches!(self, Self::TrustGiven | Self::TrustReceived)
    }

    pub fn is_trust(self) -> bool {
        self.priority() == 3
    }
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfDoc => write!(f, "self"),
            Self::TrustGiven => write!(f, "trust-given"),
            Self::TrustReceived => write!(f, "trust-received"),
            Self::SecondDegree => write!(f, "trust-2nd-degree"),
            Self::External => write!(f, "external"),
            Self::Workspace => write!(f, "workspace"),
        }
    }
}

/// Outcome of checking a record's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureStatus {
    Valid,
    Invalid,
    /// No signature attached. Not an error.
    Missing,
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Invalid => write!(f, "invalid"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// A profile known through discovery. Derived state, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownProfile {
    pub did: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub user_doc_url: Option<String>,
    pub discovery_source: DiscoverySource,
    pub signature_status: SignatureStatus,
    pub last_updated: DateTime<Utc>,
}

/// Trust relationship flags for one DID, computed from the local document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustFlags {
    pub is_trust_given: bool,
    pub is_trust_received: bool,
    pub is_mutual_trust: bool,
}

impl TrustFlags {
    pub fn for_did(doc: &PersonalDocument, did: &str) -> Self {
        let is_trust_given = doc.trust_given.contains_key(did);
        let is_trust_received = doc.trust_received.contains_key(did);
        Self {
            is_trust_given,
            is_trust_received,
            is_mutual_trust: is_trust_given && is_trust_received,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::TrustAttestation;
    use crate::profile::Profile;

    #[test]
    fn test_priority_order() {
        assert!(DiscoverySource::SelfDoc.priority() > DiscoverySource::TrustGiven.priority());
        assert_eq!(
            DiscoverySource::TrustGiven.priority(),
            DiscoverySource::TrustReceived.priority()
        );
        assert_eq!(
            DiscoverySource::TrustGiven.priority(),
            DiscoverySource::SecondDegree.priority()
        );
        assert!(DiscoverySource::SecondDegree.priority() > DiscoverySource::External.priority());
        assert!(DiscoverySource::External.priority() > DiscoverySource::Workspace.priority());
    }

    #[test]
    fn test_first_degree() {
        assert!(DiscoverySource::TrustGiven.is_first_degree());
        assert!(DiscoverySource::TrustReceived.is_first_degree());
        assert!(!DiscoverySource::SecondDegree.is_first_degree());
        assert!(DiscoverySource::SecondDegree.is_trust());
        assert!(!DiscoverySource::External.is_trust());
    }

    #[test]
    fn test_source_wire_names() {
        assert_eq!(
            serde_json::to_string(&DiscoverySource::SelfDoc).unwrap(),
            "\"self\""
        );
        assert_eq!(
            serde_json::to_string(&DiscoverySource::SecondDegree).unwrap(),
            "\"trust-2nd-degree\""
        );
        assert_eq!(DiscoverySource::TrustGiven.to_string(), "trust-given");
    }

    #[test]
    fn test_trust_flags() {
        let mut doc = PersonalDocument::new("did:key:zMe", Profile::default());
        let flags = TrustFlags::for_did(&doc, "did:key:zBob");
        assert_eq!(flags, TrustFlags::default());

        doc.trust_given.insert(
            "did:key:zBob".into(),
            TrustAttestation::new("did:key:zMe", "did:key:zBob"),
        );
        let flags = TrustFlags::for_did(&doc, "did:key:zBob");
        assert!(flags.is_trust_given && !flags.is_mutual_trust);

        doc.trust_received.insert(
            "did:key:zBob".into(),
            TrustAttestation::new("did:key:zBob", "did:key:zMe"),
        );
        assert!(TrustFlags::for_did(&doc, "did:key:zBob").is_mutual_trust);
    }
}
