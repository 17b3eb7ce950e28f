/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("signing failed: {0}")]
    SigningError(String),

    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
