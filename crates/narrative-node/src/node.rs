//! Narrative node: wires storage, the local replica, the resolver, and the
//! trust components for one local identity.

use anyhow::Result;
use std::sync::Arc;

use narrative_core::{PersonalDocument, Profile};
use narrative_crypto::sign_profile;
use narrative_discovery::DiscoveryEngine;
use narrative_sync::{update_doc, DocumentResolver};
use narrative_trust::{NotificationFilter, TrustProtocol};

use crate::config::NarrativeConfig;
use crate::identity::{self, LocalIdentity};
use crate::replica::StoredRepo;
use crate::seen::StoredSeenStore;
use crate::storage::Storage;

/// An opened narrative node.
pub struct NarrativeNode {
    repo: Arc<StoredRepo>,
    resolver: Arc<DocumentResolver>,
    identity: LocalIdentity,
    protocol: TrustProtocol,
    notifications: NotificationFilter,
}

impl NarrativeNode {
    /// Open the data directory, creating the identity on first use.
    pub async fn open(config: NarrativeConfig) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config.storage.data_dir)?);
        let repo = Arc::new(StoredRepo::new(storage.clone()));
        let resolver = Arc::new(DocumentResolver::new(
            repo.clone(),
            config.resolver.clone(),
        ));

        let identity =
            identity::load_or_create(&storage, &repo, config.identity.display_name.clone())
                .await?;
        let protocol = TrustProtocol::new(
            identity.signer.clone(),
            identity.document.clone(),
            resolver.clone(),
        );
        let notifications = NotificationFilter::new(
            Arc::new(StoredSeenStore::new(storage.clone())),
            config.identity.seen_context.clone(),
            config.trust.clone(),
        );

        tracing::info!(
            did = %identity.did(),
            data_dir = %config.storage.data_dir.display(),
            "narrative node opened"
        );

        Ok(Self {
            repo,
            resolver,
            identity,
            protocol,
            notifications,
        })
    }

    pub fn repo(&self) -> &Arc<StoredRepo> {
        &self.repo
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn protocol(&self) -> &TrustProtocol {
        &self.protocol
    }

    pub fn notifications(&self) -> &NotificationFilter {
        &self.notifications
    }

    pub fn local_document(&self) -> Result<PersonalDocument> {
        Ok(self.protocol.local_document()?)
    }

    /// Change the public profile and re-sign it. An empty string clears a
    /// field; `None` leaves it as is.
    pub fn update_profile(
        &self,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<Profile> {
        let mut profile = self.local_document()?.profile;
        if let Some(name) = display_name {
            profile.display_name = Some(name).filter(|n| !n.is_empty());
        }
        if let Some(url) = avatar_url {
            profile.avatar_url = Some(url).filter(|u| !u.is_empty());
        }

        let signed = sign_profile(profile, self.identity.signer.as_ref())?;
        update_doc(self.identity.document.as_ref(), |doc: &mut PersonalDocument| {
            doc.profile = signed.clone();
        })?;
        tracing::info!(did = %self.identity.did(), "profile updated");
        Ok(signed)
    }

    /// Start a discovery engine rooted at the local identity.
    pub fn discovery(&self) -> DiscoveryEngine {
        DiscoveryEngine::spawn(
            self.resolver.clone(),
            self.identity.did(),
            self.identity.address(),
            None,
        )
    }
}
