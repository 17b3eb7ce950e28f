//! Fixtures shared by the scenario tests: several identities on one
//! in-memory replication substrate.

use std::sync::Arc;

use narrative_core::{PersonalDocument, Profile, ResolverConfig, TrustPolicy};
use narrative_crypto::{sign_profile, KeyPair, LocalSigner, RecordSigner};
use narrative_discovery::DiscoveryEngine;
use narrative_sync::{read_doc, DocHandle, DocumentResolver, MemoryRepo, Repo};
use narrative_trust::{MemorySeenStore, NotificationFilter, TrustProtocol};

/// One identity with its own resolver, protocol and notification filter.
pub struct Party {
    pub signer: Arc<LocalSigner>,
    pub address: String,
    pub resolver: Arc<DocumentResolver>,
    pub protocol: TrustProtocol,
    pub notifications: NotificationFilter,
    pub seen: Arc<MemorySeenStore>,
}

impl Party {
    pub fn did(&self) -> &str {
        self.signer.did()
    }

    pub fn document(&self) -> PersonalDocument {
        self.protocol
            .local_document()
            .expect("local document readable")
    }

    /// `narrative://verify/...` for this party.
    pub fn exchange_uri(&self) -> String {
        let did = narrative_core::Did::new(self.did()).expect("valid did");
        narrative_core::TrustExchangeUri::new(did, Some(self.address.clone())).to_string()
    }

    pub fn discovery(&self) -> DiscoveryEngine {
        DiscoveryEngine::spawn(self.resolver.clone(), self.did(), &self.address, None)
    }
}

/// A shared substrate that parties join.
pub struct Network {
    pub repo: Arc<MemoryRepo>,
    config: ResolverConfig,
    policy: TrustPolicy,
}

impl Network {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::quick(), TrustPolicy::default())
    }

    pub fn with_config(config: ResolverConfig, policy: TrustPolicy) -> Self {
        Self {
            repo: Arc::new(MemoryRepo::new()),
            config,
            policy,
        }
    }

    /// Create an identity from a fixed seed with a signed profile.
    pub fn join(&self, seed: u8, name: &str) -> Party {
        let signer = Arc::new(LocalSigner::new(KeyPair::from_seed(&[seed; 32])));
        let profile =
            sign_profile(Profile::new(Some(name.to_string())), signer.as_ref()).expect("sign");
        let doc = PersonalDocument::new(signer.did(), profile);
        let own: Arc<dyn DocHandle> = self
            .repo
            .create(doc.to_value().expect("encode"))
            .expect("create");

        let resolver = Arc::new(DocumentResolver::new(self.repo.clone(), self.config.clone()));
        let protocol = TrustProtocol::new(signer.clone(), own.clone(), resolver.clone());
        let seen = Arc::new(MemorySeenStore::new());
        let notifications = NotificationFilter::new(
            seen.clone(),
            format!("ctx-{}", seed),
            self.policy.clone(),
        );

        Party {
            signer,
            address: own.address().to_string(),
            resolver,
            protocol,
            notifications,
            seen,
        }
    }

    /// Decode whatever document lives at `address`.
    pub fn document_at(&self, address: &str) -> Option<PersonalDocument> {
        let handle = self.repo.get(address)?;
        read_doc(handle.as_ref()).ok().flatten()
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
