//! Narrative cryptography.
//!
//! - Ed25519 key pairs and signatures
//! - `did:key` encoding of public keys
//! - Canonical JSON for signing payloads
//! - Record signature codec (sign / verify / status) for attestations and profiles

pub mod canonical;
pub mod codec;
pub mod did;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod signing;

pub use canonical::{canonical_bytes, canonical_json};
pub use codec::{
    profile_signature_status, sign_attestation, sign_profile, sign_record, signature_status,
    verify_attestation, verify_record, verify_record_by_did, LocalSigner, RecordSigner, Signable,
    VerificationResult,
};
pub use did::{derive_verification_key, did_from_public_key, identity_for};
pub use error::CryptoError;
pub use hashing::{fingerprint, hash, Hash};
pub use keys::{KeyPair, PublicKey};
pub use signing::{sign, verify, Signature};
