//! Incoming attestations awaiting a user decision.

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

use narrative_core::{PersonalDocument, SignatureStatus, TrustAttestation, TrustPolicy};
use narrative_crypto::signature_status;

use crate::error::TrustError;

/// Persisted "already seen" attestation ids, one set per context.
pub trait SeenStore: Send + Sync {
    fn seen(&self, context: &str) -> Result<HashSet<String>, TrustError>;
    fn mark_seen(&self, context: &str, ids: &[String]) -> Result<(), TrustError>;

    fn is_seen(&self, context: &str, id: &str) -> Result<bool, TrustError> {
        Ok(self.seen(context)?.contains(id))
    }
}

/// Seen-set kept in process memory.
#[derive(Default)]
pub struct MemorySeenStore {
    sets: DashMap<String, HashSet<String>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SeenStore for MemorySeenStore {
    fn seen(&self, context: &str) -> Result<HashSet<String>, TrustError> {
        Ok(self
            .sets
            .get(context)
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    fn mark_seen(&self, context: &str, ids: &[String]) -> Result<(), TrustError> {
        self.sets
            .entry(context.to_string())
            .or_default()
            .extend(ids.iter().cloned());
        Ok(())
    }
}

/// Derives the queue of incoming attestations still needing a decision.
pub struct NotificationFilter {
    store: Arc<dyn SeenStore>,
    context: String,
    policy: TrustPolicy,
}

impl NotificationFilter {
    pub fn new(store: Arc<dyn SeenStore>, context: impl Into<String>, policy: TrustPolicy) -> Self {
        Self {
            store,
            context: context.into(),
            policy,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Incoming attestations to prompt for, oldest first.
    ///
    /// Excludes seen ids, self-attestations and trusters already trusted
    /// back. An attestation with a present but invalid signature is dropped
    /// and marked seen so it never prompts again. Unsigned attestations are
    /// kept unless the policy requires signatures.
    pub fn pending_attestations(
        &self,
        doc: &PersonalDocument,
    ) -> Result<Vec<TrustAttestation>, TrustError> {
        let seen = self.store.seen(&self.context)?;
        let mut rejected = Vec::new();
        let mut pending = Vec::new();

        for (truster, attestation) in &doc.trust_received {
            if seen.contains(&attestation.id) {
                continue;
            }
            if attestation.is_self_attestation() || *truster == doc.did {
                continue;
            }
            if doc.trust_given.contains_key(truster) {
                continue;
            }
            match signature_status(attestation, &attestation.truster_did) {
                SignatureStatus::Valid => pending.push(attestation.clone()),
                SignatureStatus::Missing if !self.policy.require_signatures => {
                    tracing::warn!(
                        id = %attestation.id,
                        truster = %truster,
                        "accepting unsigned attestation"
                    );
                    pending.push(attestation.clone());
                }
                SignatureStatus::Missing => {
                    tracing::debug!(id = %attestation.id, "unsigned attestation held back");
                }
                SignatureStatus::Invalid => {
                    tracing::warn!(
                        id = %attestation.id,
                        truster = %truster,
                        "rejecting attestation with invalid signature"
                    );
                    rejected.push(attestation.id.clone());
                }
            }
        }

        if !rejected.is_empty() {
            self.store.mark_seen(&self.context, &rejected)?;
        }

        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(pending)
    }

    /// Dismiss one attestation without trusting back.
    pub fn decline(&self, id: &str) -> Result<(), TrustError> {
        tracing::info!(id = %id, context = %self.context, "attestation declined");
        self.store.mark_seen(&self.context, &[id.to_string()])
    }

    pub fn mark_seen(&self, ids: &[String]) -> Result<(), TrustError> {
        self.store.mark_seen(&self.context, ids)
    }
}
