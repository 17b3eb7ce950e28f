//! Trust actions across independently owned personal documents.
//!
//! The local half of every action (sign, then write into the caller's own
//! document) is synchronous and complete on return. Writing the copy into
//! the counterparty's document is a separate best-effort remote append
//! running on its own task, reporting through [`PropagationOutcome`].

use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use narrative_core::{Did, PersonalDocument, SignatureStatus, TrustAttestation};
use narrative_crypto::{sign_attestation, signature_status, RecordSigner};
use narrative_sync::{on_mutation, read_doc, update_doc, DocHandle, DocumentResolver, Subscription};

use crate::error::TrustError;
use crate::notifications::NotificationFilter;
use crate::store::AttestationStore;

/// Result of the remote append into a counterparty's document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum PropagationOutcome {
    Delivered {
        address: String,
    },
    /// The document could not be resolved or written.
    Unreachable {
        address: String,
        reason: String,
    },
    /// The document at the address belongs to someone else. Nothing written.
    DidMismatch {
        address: String,
        expected: String,
        found: String,
    },
}

/// What a trust action produced.
#[derive(Debug)]
pub struct TrustOutcome {
    /// The signed attestation as written to the local document.
    pub attestation: TrustAttestation,
    /// The remote append, when the counterparty's address was known.
    pub propagation: Option<JoinHandle<PropagationOutcome>>,
}

/// A trust relationship became mutual during this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutualTrust {
    pub did: String,
    /// The counterparty's attestation that completed the pair.
    pub attestation: TrustAttestation,
}

/// Tracks trust given this session and reports reciprocation once per DID.
#[derive(Debug, Default)]
pub struct MutualTrustDetector {
    given: HashSet<String>,
    known_received: Option<HashSet<String>>,
    signalled: HashSet<String>,
}

impl MutualTrustDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_given(&mut self, did: &str) {
        self.given.insert(did.to_string());
    }

    pub fn forget_given(&mut self, did: &str) {
        self.given.remove(did);
    }

    /// Feed the latest local document. Returns newly mutual relationships.
    ///
    /// The first observation only records which `trust_received` entries
    /// already exist; entries present then never count as gained.
    pub fn observe(&mut self, doc: &PersonalDocument) -> Vec<MutualTrust> {
        let current: HashSet<String> = doc.trust_received.keys().cloned().collect();
        let Some(known) = self.known_received.replace(current.clone()) else {
            return Vec::new();
        };

        let mut gained: Vec<&String> = current.difference(&known).collect();
        gained.sort();
        gained
            .into_iter()
            .filter(|did| self.given.contains(*did))
            .filter(|did| self.signalled.insert((*did).clone()))
            .filter_map(|did| {
                doc.trust_received.get(did).map(|attestation| MutualTrust {
                    did: did.clone(),
                    attestation: attestation.clone(),
                })
            })
            .collect()
    }
}

/// Trust actions on behalf of one local identity.
pub struct TrustProtocol {
    signer: Arc<dyn RecordSigner>,
    own: Arc<dyn DocHandle>,
    resolver: Arc<DocumentResolver>,
    detector: Arc<Mutex<MutualTrustDetector>>,
}

impl TrustProtocol {
    pub fn new(
        signer: Arc<dyn RecordSigner>,
        own: Arc<dyn DocHandle>,
        resolver: Arc<DocumentResolver>,
    ) -> Self {
        let mut detector = MutualTrustDetector::new();
        if let Ok(Some(doc)) = read_doc::<PersonalDocument>(own.as_ref()) {
            detector.observe(&doc);
        }
        Self {
            signer,
            own,
            resolver,
            detector: Arc::new(Mutex::new(detector)),
        }
    }

    pub fn did(&self) -> &str {
        self.signer.did()
    }

    pub fn own_document(&self) -> &Arc<dyn DocHandle> {
        &self.own
    }

    /// Current decoded local document.
    pub fn local_document(&self) -> Result<PersonalDocument, TrustError> {
        read_doc::<PersonalDocument>(self.own.as_ref())?
            .ok_or_else(|| TrustError::NotReady(self.own.address().to_string()))
    }

    /// Sign and record trust in `trustee_did`.
    ///
    /// Returns once the attestation is in the local document. When
    /// `trustee_doc` is given the remote append is spawned on the current
    /// tokio runtime; its failure never fails this call.
    pub fn trust_user(
        &self,
        trustee_did: &str,
        trustee_doc: Option<&str>,
    ) -> Result<TrustOutcome, TrustError> {
        let trustee = Did::new(trustee_did).map_err(|e| TrustError::InvalidDid(e.to_string()))?;
        if trustee.uri() == self.did() {
            return Err(TrustError::SelfTrust(trustee.to_string()));
        }

        let local = self.local_document()?;
        let mut attestation = TrustAttestation::new(self.did(), trustee.uri())
            .with_truster_doc(Some(self.own.address().to_string()))
            .with_trustee_doc(trustee_doc.map(str::to_string));
        if let Some(previous) = local.trust_given.get(trustee.uri()) {
            attestation = attestation.continuing(previous);
        }

        let signed = sign_attestation(attestation, self.signer.as_ref()).map_err(|e| {
            tracing::error!(trustee = %trustee, error = %e, "signing attestation failed");
            TrustError::Signing(e)
        })?;

        update_doc(self.own.as_ref(), |doc: &mut PersonalDocument| {
            doc.add_trust_given(signed.clone());
        })?;
        self.lock_detector().record_given(trustee.uri());

        tracing::info!(
            trustee = %trustee,
            id = %signed.id,
            "trust given"
        );

        let propagation = trustee_doc.map(|address| {
            let resolver = self.resolver.clone();
            let address = address.to_string();
            let attestation = signed.clone();
            tokio::spawn(async move { propagate(resolver, address, attestation).await })
        });

        Ok(TrustOutcome {
            attestation: signed,
            propagation,
        })
    }

    /// Respond to an incoming attestation from `truster_did` by trusting
    /// back, then mark the incoming attestation seen. An attestation whose
    /// signature does not verify is refused.
    pub fn trust_back(
        &self,
        truster_did: &str,
        notifications: &NotificationFilter,
    ) -> Result<TrustOutcome, TrustError> {
        let local = self.local_document()?;
        let incoming = local
            .trust_received
            .values()
            .find(|a| a.truster_did == truster_did)
            .cloned()
            .ok_or_else(|| TrustError::UnknownAttestation(truster_did.to_string()))?;
        if signature_status(&incoming, truster_did) == SignatureStatus::Invalid {
            tracing::warn!(truster = %truster_did, id = %incoming.id, "refusing to trust back a forged attestation");
            return Err(TrustError::InvalidSignature(incoming.id));
        }

        let outcome = self.trust_user(truster_did, incoming.truster_user_doc_url.as_deref())?;
        notifications.mark_seen(&[incoming.id])?;
        Ok(outcome)
    }

    /// Remove local trust in `trustee_did`.
    ///
    /// The counterparty's `trust_received` copy is left untouched and they
    /// are not notified.
    pub fn revoke_trust(&self, trustee_did: &str) -> Result<Option<TrustAttestation>, TrustError> {
        let removed = update_doc(self.own.as_ref(), |doc: &mut PersonalDocument| {
            doc.remove_trust_given(trustee_did)
        })?;
        self.lock_detector().forget_given(trustee_did);

        match &removed {
            Some(att) => tracing::info!(trustee = %trustee_did, id = %att.id, "trust revoked"),
            None => tracing::debug!(trustee = %trustee_did, "nothing to revoke"),
        }
        Ok(removed)
    }

    /// Subscribe to the local document and receive one signal per DID that
    /// reciprocates trust given in this session.
    pub fn watch_mutual(&self) -> (Subscription, mpsc::UnboundedReceiver<MutualTrust>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let detector = self.detector.clone();
        let subscription = on_mutation(self.own.clone(), move |value| {
            let doc: PersonalDocument = match serde_json::from_value(value) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(error = %e, "local document does not decode");
                    return;
                }
            };
            let events = detector
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .observe(&doc);
            for event in events {
                tracing::info!(did = %event.did, "mutual trust established");
                let _ = tx.send(event);
            }
        });
        (subscription, rx)
    }

    fn lock_detector(&self) -> std::sync::MutexGuard<'_, MutualTrustDetector> {
        self.detector.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolve the counterparty's document and append the attestation to its
/// `trust_received`.
async fn propagate(
    resolver: Arc<DocumentResolver>,
    address: String,
    attestation: TrustAttestation,
) -> PropagationOutcome {
    let handle = match resolver.resolve_personal(&address).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(address = %address, error = %e, "counterparty document unreachable");
            return PropagationOutcome::Unreachable {
                address,
                reason: e.to_string(),
            };
        }
    };

    let found = match read_doc::<PersonalDocument>(handle.as_ref()) {
        Ok(Some(doc)) => doc.did,
        Ok(None) => String::new(),
        Err(e) => {
            return PropagationOutcome::Unreachable {
                address,
                reason: e.to_string(),
            }
        }
    };
    if found != attestation.trustee_did {
        tracing::warn!(
            address = %address,
            expected = %attestation.trustee_did,
            found = %found,
            "counterparty document belongs to another DID"
        );
        return PropagationOutcome::DidMismatch {
            address,
            expected: attestation.trustee_did,
            found,
        };
    }

    match update_doc(handle.as_ref(), |doc: &mut PersonalDocument| {
        doc.add_trust_received(attestation.clone());
    }) {
        Ok(()) => {
            tracing::info!(address = %address, id = %attestation.id, "attestation delivered");
            PropagationOutcome::Delivered { address }
        }
        Err(e) => {
            tracing::warn!(address = %address, error = %e, "remote append failed");
            PropagationOutcome::Unreachable {
                address,
                reason: e.to_string(),
            }
        }
    }
}
