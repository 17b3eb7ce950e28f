use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::CoreError;

/// Prefix shared by every DID this layer understands.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// A self-certifying `did:key` identifier.
///
/// Format: `did:key:z<base58btc multicodec public key>`. Only the shape is
/// checked here; decoding the embedded key happens in `narrative-crypto`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Did(String);

impl Did {
    /// Parse a DID from its full URI string.
    pub fn new(uri: impl Into<String>) -> Result<Self, CoreError> {
        let uri = uri.into();
        let identifier = uri.strip_prefix(DID_KEY_PREFIX).ok_or_else(|| {
            CoreError::InvalidDid(format!("DID must start with '{}', got: {}", DID_KEY_PREFIX, uri))
        })?;
        if identifier.len() < 2 || !identifier.starts_with('z') {
            return Err(CoreError::InvalidDid(format!(
                "DID identifier must be base58btc multibase ('z' prefix), got: {}",
                uri
            )));
        }
        Ok(Self(uri))
    }

    /// Build a DID from a multibase identifier (without the `did:key:` prefix).
    pub fn from_identifier(identifier: &str) -> Self {
        Self(format!("{}{}", DID_KEY_PREFIX, identifier))
    }

    /// Get the full DID URI.
    pub fn uri(&self) -> &str {
        &self.0
    }

    /// The multibase identifier following `did:key:`.
    pub fn identifier(&self) -> &str {
        &self.0[DID_KEY_PREFIX.len()..]
    }

    /// Short form for logs and listings (`did:key:z6Mk…wxyz`).
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.identifier().chars().collect();
        if chars.len() <= 12 {
            return self.0.clone();
        }
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}…{}", DID_KEY_PREFIX, head, tail)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A participant identity. The DID is derived from the public key and never
/// changes for the lifetime of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub did: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_base64: Option<String>,
}

/// Fresh, globally unique document address.
pub fn new_document_address() -> String {
    format!("doc:{}", bs58::encode(Uuid::now_v7().as_bytes()).into_string())
}

/// Fresh, globally unique attestation identifier.
pub fn new_attestation_id() -> String {
    format!("urn:uuid:{}", Uuid::now_v7())
}
