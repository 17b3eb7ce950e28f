use serde::Serialize;

use crate::canonical::canonical_bytes_with;
use crate::error::CryptoError;

/// BLAKE3 hash (32 bytes).
pub type Hash = [u8; 32];

/// Hash arbitrary data using BLAKE3.
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Content fingerprint of a value: BLAKE3 over its canonical JSON form.
/// Two values with equal content always share a fingerprint, regardless of
/// map insertion order.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<Hash, CryptoError> {
    let bytes = canonical_bytes_with(value, &[])?;
    Ok(hash(&bytes))
}
