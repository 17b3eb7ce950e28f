//! Signature codec for replicated records.
//!
//! A record is signed over its canonical JSON with the `signature` member
//! excluded; the hex signature is then stored back into that member.
//! Verification never fails with an error: it always yields a
//! [`VerificationResult`].

use chrono::Utc;
use serde::Serialize;

use narrative_core::{Did, Profile, SignatureStatus, TrustAttestation};

use crate::canonical::canonical_bytes;
use crate::did::{derive_verification_key, did_from_public_key};
use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKey};
use crate::signing::{sign, verify, Signature};

/// A record carrying its own detached signature field.
pub trait Signable: Serialize {
    fn signature(&self) -> Option<&str>;
    fn set_signature(&mut self, signature: Option<String>);
}

impl Signable for TrustAttestation {
    fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    fn set_signature(&mut self, signature: Option<String>) {
        self.signature = signature;
    }
}

impl Signable for Profile {
    fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    fn set_signature(&mut self, signature: Option<String>) {
        self.signature = signature;
    }
}

/// Anything able to sign on behalf of one DID.
pub trait RecordSigner: Send + Sync {
    fn did(&self) -> &str;
    fn sign_bytes(&self, message: &[u8]) -> Result<Signature, CryptoError>;
}

/// Signer backed by an in-process key pair.
pub struct LocalSigner {
    keypair: KeyPair,
    did: Did,
}

impl LocalSigner {
    pub fn new(keypair: KeyPair) -> Self {
        let did = did_from_public_key(&keypair.public_key());
        Self { keypair, did }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }
}

impl RecordSigner for LocalSigner {
    fn did(&self) -> &str {
        self.did.uri()
    }

    fn sign_bytes(&self, message: &[u8]) -> Result<Signature, CryptoError> {
        Ok(sign(message, &self.keypair))
    }
}

/// Result of checking one signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub error: Option<String>,
}

impl VerificationResult {
    fn valid() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(reason.into()),
        }
    }
}

/// Compute the hex signature of a record's canonical payload.
pub fn sign_record<T: Signable>(record: &T, signer: &dyn RecordSigner) -> Result<String, CryptoError> {
    let payload = canonical_bytes(record)?;
    let signature = signer.sign_bytes(&payload)?;
    Ok(signature.to_string())
}

/// Check a record's signature against a known public key.
pub fn verify_record<T: Signable>(record: &T, public_key: &PublicKey) -> VerificationResult {
    let Some(sig_hex) = record.signature() else {
        return VerificationResult::invalid("missing signature");
    };
    let signature = match sig_hex.parse::<Signature>() {
        Ok(s) => s,
        Err(e) => return VerificationResult::invalid(e.to_string()),
    };
    let payload = match canonical_bytes(record) {
        Ok(p) => p,
        Err(e) => return VerificationResult::invalid(e.to_string()),
    };
    match verify(&payload, &signature, public_key) {
        Ok(()) => VerificationResult::valid(),
        Err(e) => VerificationResult::invalid(e.to_string()),
    }
}

/// Check a record's signature against the key embedded in `signer_did`.
pub fn verify_record_by_did<T: Signable>(record: &T, signer_did: &str) -> VerificationResult {
    match derive_verification_key(signer_did) {
        Some(key) => verify_record(record, &key),
        None => VerificationResult::invalid(format!("malformed DID: {}", signer_did)),
    }
}

/// Three-way status: `Missing` when unsigned, else `Valid` / `Invalid`.
pub fn signature_status<T: Signable>(record: &T, signer_did: &str) -> SignatureStatus {
    if record.signature().is_none() {
        return SignatureStatus::Missing;
    }
    if verify_record_by_did(record, signer_did).valid {
        SignatureStatus::Valid
    } else {
        SignatureStatus::Invalid
    }
}

/// Sign an attestation as its truster. Fails if `signer` is not the truster.
pub fn sign_attestation(
    mut attestation: TrustAttestation,
    signer: &dyn RecordSigner,
) -> Result<TrustAttestation, CryptoError> {
    if attestation.truster_did != signer.did() {
        return Err(CryptoError::SigningError(format!(
            "signer {} is not the truster {}",
            signer.did(),
            attestation.truster_did
        )));
    }
    attestation.signature = None;
    let signature = sign_record(&attestation, signer)?;
    attestation.signature = Some(signature);
    Ok(attestation)
}

/// Verify an attestation against its truster's DID.
pub fn verify_attestation(attestation: &TrustAttestation) -> VerificationResult {
    verify_record_by_did(attestation, &attestation.truster_did)
}

/// Refresh `updated_at` and sign a profile as its owner.
pub fn sign_profile(mut profile: Profile, signer: &dyn RecordSigner) -> Result<Profile, CryptoError> {
    profile.updated_at = Utc::now();
    profile.signature = None;
    let signature = sign_record(&profile, signer)?;
    profile.signature = Some(signature);
    Ok(profile)
}

pub fn profile_signature_status(profile: &Profile, owner_did: &str) -> SignatureStatus {
    signature_status(profile, owner_did)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSigner;

    impl RecordSigner for BrokenSigner {
        fn did(&self) -> &str {
            "did:key:zBroken"
        }

        fn sign_bytes(&self, _message: &[u8]) -> Result<Signature, CryptoError> {
            Err(CryptoError::SigningError("key unavailable".into()))
        }
    }

    fn signer(seed: u8) -> LocalSigner {
        LocalSigner::new(KeyPair::from_seed(&[seed; 32]))
    }

    #[test]
    fn test_attestation_sign_verify() {
        let alice = signer(1);
        let att = TrustAttestation::new(alice.did(), "did:key:zBob");
        let signed = sign_attestation(att, &alice).unwrap();
        assert!(signed.is_signed());
        assert!(verify_attestation(&signed).valid);
        assert_eq!(
            signature_status(&signed, alice.did()),
            SignatureStatus::Valid
        );
    }

    #[test]
    fn test_attestation_other_key_invalid() {
        let alice = signer(1);
        let mallory = signer(2);
        let signed = sign_attestation(TrustAttestation::new(alice.did(), "did:key:zBob"), &alice)
            .unwrap();
        let result = verify_record(&signed, &mallory.public_key());
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_attestation_tampered_field_invalid() {
        let alice = signer(1);
        let mut signed =
            sign_attestation(TrustAttestation::new(alice.did(), "did:key:zBob"), &alice).unwrap();
        signed.trustee_did = "did:key:zCarol".into();
        assert!(!verify_attestation(&signed).valid);
    }

    #[test]
    fn test_single_bit_flip_in_payload_invalid() {
        let alice = signer(1);
        let mut signed =
            sign_attestation(TrustAttestation::new(alice.did(), "did:key:zBob"), &alice).unwrap();
        let mut bytes = signed.id.clone().into_bytes();
        bytes[10] ^= 0x01;
        signed.id = String::from_utf8(bytes).unwrap();
        assert!(!verify_attestation(&signed).valid);
    }

    #[test]
    fn test_signer_must_be_truster() {
        let alice = signer(1);
        let bob = signer(2);
        let att = TrustAttestation::new(alice.did(), bob.did());
        assert!(matches!(
            sign_attestation(att, &bob),
            Err(CryptoError::SigningError(_))
        ));
    }

    #[test]
    fn test_signer_failure_propagates() {
        let att = TrustAttestation::new("did:key:zBroken", "did:key:zBob");
        assert!(sign_attestation(att, &BrokenSigner).is_err());
    }

    #[test]
    fn test_missing_vs_invalid_status() {
        let alice = signer(1);
        let mut profile = Profile::new(Some("Alice".into()));
        assert_eq!(
            profile_signature_status(&profile, alice.did()),
            SignatureStatus::Missing
        );
        profile.signature = Some("deadbeef".into());
        assert_eq!(
            profile_signature_status(&profile, alice.did()),
            SignatureStatus::Invalid
        );
    }

    #[test]
    fn test_profile_sign_verify() {
        let alice = signer(1);
        let profile = sign_profile(Profile::new(Some("Alice".into())), &alice).unwrap();
        assert_eq!(
            profile_signature_status(&profile, alice.did()),
            SignatureStatus::Valid
        );
        let mut renamed = profile.clone();
        renamed.display_name = Some("Eve".into());
        assert_eq!(
            profile_signature_status(&renamed, alice.did()),
            SignatureStatus::Invalid
        );
    }

    #[test]
    fn test_malformed_did_is_invalid_not_panic() {
        let alice = signer(1);
        let profile = sign_profile(Profile::default(), &alice).unwrap();
        let result = verify_record_by_did(&profile, "did:key:garbage");
        assert!(!result.valid);
        assert_eq!(
            profile_signature_status(&profile, "not-a-did"),
            SignatureStatus::Invalid
        );
    }

    #[test]
    fn test_signature_survives_json_roundtrip() {
        let alice = signer(1);
        let signed = sign_attestation(
            TrustAttestation::new(alice.did(), "did:key:zBob").with_notes("met at meetup"),
            &alice,
        )
        .unwrap();
        let json = serde_json::to_string(&signed).unwrap();
        let back: TrustAttestation = serde_json::from_str(&json).unwrap();
        assert!(verify_attestation(&back).valid);
    }
}
