//! `did:key` encoding for Ed25519 public keys:
//! `did:key:z` + base58btc(0xed 0x01 || 32-byte public key).

use narrative_core::types::DID_KEY_PREFIX;
use narrative_core::{Did, Identity};

use crate::keys::{KeyPair, PublicKey};

/// Multicodec prefix for an Ed25519 public key (varint 0xed).
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// Derive the DID for a public key.
pub fn did_from_public_key(public_key: &PublicKey) -> Did {
    let mut bytes = Vec::with_capacity(34);
    bytes.extend_from_slice(&ED25519_MULTICODEC);
    bytes.extend_from_slice(public_key.as_bytes());
    Did::from_identifier(&format!("z{}", bs58::encode(bytes).into_string()))
}

/// Recover the verification key embedded in a DID.
///
/// Returns `None` for anything that is not a well-formed Ed25519 `did:key`;
/// callers treat that as an invalid signer rather than an error.
pub fn derive_verification_key(did: &str) -> Option<PublicKey> {
    let multibase = did.strip_prefix(DID_KEY_PREFIX)?;
    let encoded = multibase.strip_prefix('z')?;
    let bytes = bs58::decode(encoded).into_vec().ok()?;
    let key = bytes.strip_prefix(&ED25519_MULTICODEC[..])?;
    PublicKey::from_bytes(key).ok()
}

/// The public identity record of a key pair.
pub fn identity_for(keypair: &KeyPair, display_name: Option<String>) -> Identity {
    let public_key = keypair.public_key();
    Identity {
        did: did_from_public_key(&public_key).uri().to_string(),
        display_name,
        avatar_url: None,
        public_key_base64: Some(public_key.to_base64()),
    }
}
