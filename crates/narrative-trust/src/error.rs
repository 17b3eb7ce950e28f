use narrative_core::CoreError;
use narrative_crypto::CryptoError;
use narrative_sync::SyncError;

/// Errors from trust actions and notification bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    /// The signer could not produce a signature. The action wrote nothing.
    #[error("signing failed: {0}")]
    Signing(#[source] CryptoError),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("cannot trust yourself: {0}")]
    SelfTrust(String),

    #[error("attestation signature is invalid: {0}")]
    InvalidSignature(String),

    #[error("unknown attestation: {0}")]
    UnknownAttestation(String),

    #[error("local document is not ready: {0}")]
    NotReady(String),

    #[error("seen-set storage error: {0}")]
    Storage(String),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
