//! Ed25519 signatures over canonical record payloads.
//!
//! Records carry a signature as exactly 128 lowercase hex characters;
//! [`Signature`] parses and prints that form.

use ed25519_dalek::{Signer, Verifier};
use std::fmt;
use std::str::FromStr;

use crate::error::CryptoError;
use crate::keys::{KeyPair, PublicKey};

const SIGNATURE_LEN: usize = ed25519_dalek::SIGNATURE_LENGTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    /// Check this signature over `message` against `public_key`.
    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> Result<(), CryptoError> {
        public_key
            .verifying_key()
            .verify(message, &self.0)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0.to_bytes()))
    }
}

impl FromStr for Signature {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != SIGNATURE_LEN * 2 {
            return Err(CryptoError::InvalidInput(format!(
                "signature must be {} hex characters, got {}",
                SIGNATURE_LEN * 2,
                s.len()
            )));
        }
        let mut bytes = [0u8; SIGNATURE_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| CryptoError::InvalidInput(format!("signature is not hex: {}", e)))?;
        Ok(Self(ed25519_dalek::Signature::from_bytes(&bytes)))
    }
}

/// Sign `message` with the keypair's secret key.
pub fn sign(message: &[u8], keypair: &KeyPair) -> Signature {
    Signature(keypair.signing_key().sign(message))
}

pub fn verify(message: &[u8], signature: &Signature, public_key: &PublicKey) -> Result<(), CryptoError> {
    signature.verify(message, public_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_form_parses_back() {
        let kp = KeyPair::from_seed(&[7u8; 32]);
        let sig = sign(b"{\"did\":\"did:key:z6Mk\"}", &kp);
        let wire = sig.to_string();
        assert_eq!(wire.len(), 128);
        assert!(wire.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        let parsed: Signature = wire.parse().unwrap();
        assert!(parsed.verify(b"{\"did\":\"did:key:z6Mk\"}", &kp.public_key()).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let kp = KeyPair::generate();
        let sig = sign(b"{\"level\":\"verified\"}", &kp);
        assert!(matches!(
            verify(b"{\"level\":\"endorsed\"}", &sig, &kp.public_key()),
            Err(CryptoError::SignatureVerificationFailed)
        ));
    }

    #[test]
    fn test_other_key_rejected() {
        let sig = sign(b"payload", &KeyPair::from_seed(&[1u8; 32]));
        let other = KeyPair::from_seed(&[2u8; 32]).public_key();
        assert!(sig.verify(b"payload", &other).is_err());
    }

    #[test]
    fn test_malformed_wire_forms() {
        assert!("deadbeef".parse::<Signature>().is_err());
        assert!("not-a-signature".parse::<Signature>().is_err());
        assert!("zz".repeat(64).parse::<Signature>().is_err());
        // right length, not a meaningful signature: parses but never verifies
        let blank: Signature = "ab".repeat(64).parse().unwrap();
        assert!(blank.verify(b"payload", &KeyPair::generate().public_key()).is_err());
    }

    #[test]
    fn test_same_key_same_signature() {
        let kp = KeyPair::from_seed(&[99u8; 32]);
        assert_eq!(sign(b"deterministic", &kp), sign(b"deterministic", &kp));
    }
}
