use chrono::Utc;
use std::collections::BTreeMap;

use narrative_core::{PersonalDocument, TrustAttestation, TrustFlags};

/// Attestation operations on a personal document.
///
/// Each direction holds at most one attestation per counterparty:
/// `trust_given` is keyed by trustee DID and `trust_received` by truster DID.
/// Adding for a counterparty that already has an entry updates it in place.
pub trait AttestationStore {
    /// Insert or update the attestation for `attestation.trustee_did`.
    fn add_trust_given(&mut self, attestation: TrustAttestation) -> &TrustAttestation;

    /// Insert or update the attestation for `attestation.truster_did`.
    fn add_trust_received(&mut self, attestation: TrustAttestation) -> &TrustAttestation;

    /// Remove the entry for a trustee. Removing a missing entry is a no-op.
    fn remove_trust_given(&mut self, trustee_did: &str) -> Option<TrustAttestation>;

    /// Remove the entry for a truster. Removing a missing entry is a no-op.
    fn remove_trust_received(&mut self, truster_did: &str) -> Option<TrustAttestation>;

    fn is_trust_given(&self, did: &str) -> bool;
    fn is_trust_received(&self, did: &str) -> bool;

    fn is_mutual_trust(&self, did: &str) -> bool {
        self.is_trust_given(did) && self.is_trust_received(did)
    }

    fn trust_flags(&self, did: &str) -> TrustFlags;
}

/// Merge `incoming` into the slot for `key`.
///
/// A signed record is stored exactly as signed, since rewriting any field
/// would void the signature; signers continue the previous id beforehand.
/// An unsigned record takes over the existing id and creation time and gets
/// a fresh `updated_at`.
fn upsert(
    map: &mut BTreeMap<String, TrustAttestation>,
    key: String,
    mut incoming: TrustAttestation,
) -> &TrustAttestation {
    if let Some(existing) = map.get(&key) {
        if !incoming.is_signed() {
            incoming.id = existing.id.clone();
            incoming.created_at = existing.created_at;
            incoming.updated_at = Utc::now().max(existing.updated_at);
        }
        tracing::debug!(counterparty = %key, id = %incoming.id, "attestation updated in place");
    }
    map.insert(key.clone(), incoming);
    &map[&key]
}

impl AttestationStore for PersonalDocument {
    fn add_trust_given(&mut self, attestation: TrustAttestation) -> &TrustAttestation {
        let key = attestation.trustee_did.clone();
        upsert(&mut self.trust_given, key, attestation)
    }

    fn add_trust_received(&mut self, attestation: TrustAttestation) -> &TrustAttestation {
        let key = attestation.truster_did.clone();
        upsert(&mut self.trust_received, key, attestation)
    }

    fn remove_trust_given(&mut self, trustee_did: &str) -> Option<TrustAttestation> {
        self.trust_given.remove(trustee_did)
    }

    fn remove_trust_received(&mut self, truster_did: &str) -> Option<TrustAttestation> {
        self.trust_received.remove(truster_did)
    }

    fn is_trust_given(&self, did: &str) -> bool {
        self.trust_given.contains_key(did)
    }

    fn is_trust_received(&self, did: &str) -> bool {
        self.trust_received.contains_key(did)
    }

    fn trust_flags(&self, did: &str) -> TrustFlags {
        TrustFlags::for_did(self, did)
    }
}
