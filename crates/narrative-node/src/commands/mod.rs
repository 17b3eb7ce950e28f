//! Subcommands of the `narrative` binary.

pub mod accept;
pub mod decline;
pub mod discover;
pub mod export;
pub mod identity;
pub mod import;
pub mod init;
pub mod pending;
pub mod profile;
pub mod revoke;
pub mod trust;

use narrative_core::TrustAttestation;

/// One-line summary of an attestation for listings.
pub(crate) fn describe(attestation: &TrustAttestation) -> String {
    let signed = if attestation.is_signed() { "signed" } else { "unsigned" };
    format!(
        "{}  from {}  ({}, {}, {})",
        attestation.id,
        attestation.truster_did,
        attestation.level,
        signed,
        attestation.created_at.format("%Y-%m-%d %H:%M"),
    )
}
