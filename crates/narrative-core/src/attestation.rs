use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::new_attestation_id;

/// Strength of a trust attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustLevel {
    /// The truster verified the trustee's identity directly.
    Verified,
    /// The truster vouches for the trustee without direct verification.
    Endorsed,
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => write!(f, "verified"),
            Self::Endorsed => write!(f, "endorsed"),
        }
    }
}

/// How the truster established the trustee's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationMethod {
    InPerson,
    VideoCall,
    Email,
    SocialMedia,
}

/// A signed statement "truster trusts trustee".
///
/// The signature covers every other field. `*_user_doc_url` are address
/// hints that let either party find the other's personal document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustAttestation {
    pub id: String,
    pub truster_did: String,
    pub trustee_did: String,
    pub level: TrustLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<VerificationMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truster_user_doc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trustee_user_doc_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl TrustAttestation {
    /// Create a new unsigned, in-person `verified` attestation.
    pub fn new(truster_did: impl Into<String>, trustee_did: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_attestation_id(),
            truster_did: truster_did.into(),
            trustee_did: trustee_did.into(),
            level: TrustLevel::Verified,
            verification_method: Some(VerificationMethod::InPerson),
            notes: None,
            created_at: now,
            updated_at: now,
            truster_user_doc_url: None,
            trustee_user_doc_url: None,
            signature: None,
        }
    }

    pub fn with_truster_doc(mut self, address: Option<String>) -> Self {
        self.truster_user_doc_url = address;
        self
    }

    pub fn with_trustee_doc(mut self, address: Option<String>) -> Self {
        self.trustee_user_doc_url = address;
        self
    }

    pub fn with_level(mut self, level: TrustLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Adopt the identity (`id`, `created_at`) of an earlier attestation for
    /// the same pair, so an update keeps a single stable record.
    pub fn continuing(mut self, previous: &TrustAttestation) -> Self {
        self.id = previous.id.clone();
        self.created_at = previous.created_at;
        self
    }

    /// Whether a signature is attached (valid or not).
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Whether the truster and trustee are the same identity.
    pub fn is_self_attestation(&self) -> bool {
        self.truster_did == self.trustee_did
    }
}
